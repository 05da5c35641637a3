use nalgebra as na;

use crate::armor::Armor;

/// 3D pose of one armor face: position in the world frame and the yaw of
/// the face normal.
#[derive(Debug, Clone, Copy)]
pub struct ArmorPose {
    pub position: na::Vector3<f64>,
    pub yaw: f64,
}

/// Camera-to-world PnP collaborator. Assumes a valid gimbal-to-world
/// orientation has been set upstream before each frame.
pub trait Solve {
    fn solve(&self, armor: &Armor) -> ArmorPose;
}

impl<T: Solve + ?Sized> Solve for &T {
    fn solve(&self, armor: &Armor) -> ArmorPose {
        (**self).solve(armor)
    }
}
