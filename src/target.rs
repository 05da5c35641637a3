use nalgebra as na;

use crate::armor::{Armor, ArmorName, ArmorType};
use crate::ekf::Ekf;
use crate::geometry::wrap_rad;
use crate::solver::ArmorPose;

/// state layout: [x, vx, y, vy, z, vz, yaw, w, r1, r2, dz]
const STATE_DIM: usize = 11;

// white-acceleration process noise
const SIGMA2_ACC: f64 = 16.0; // (m/s^2)^2, translation
const SIGMA2_ROT: f64 = 400.0; // (rad/s^2)^2, yaw
const SIGMA2_GEOMETRY: f64 = 1e-4; // radius/height random walk, per second

// measurement noise for one solved face [x, y, z, yaw]
const R_DIAG: [f64; 4] = [4e-4, 4e-4, 4e-4, 1e-2];

// divergence bounds
const MIN_RADIUS: f64 = 0.05;
const MAX_RADIUS: f64 = 0.8;
const MAX_SPIN: f64 = 50.0; // rad/s
const MAX_SPEED: f64 = 15.0; // m/s

/// The one tracked enemy body. Owned by the tracker, survives across
/// frames until the state machine falls back to lost.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: ArmorName,
    pub armor_type: ArmorType,
    pub priority: i32,
    /// number of armor faces: 2 balance, 3 outpost/base, 4 default
    pub armor_num: usize,
    /// face index of the last fused observation
    pub last_face: usize,
    pub last_timestamp: f64,
    ekf: Ekf,
}

impl Target {
    pub fn new(
        armor: &Armor,
        pose: &ArmorPose,
        t: f64,
        radius: f64,
        armor_num: usize,
        p0_diag: [f64; STATE_DIM],
    ) -> Self {
        // body center sits behind the observed face along its yaw
        let x = pose.position.x + radius * pose.yaw.cos();
        let y = pose.position.y + radius * pose.yaw.sin();

        let x0 = na::DVector::from_row_slice(&[
            x,
            0.0,
            y,
            0.0,
            pose.position.z,
            0.0,
            pose.yaw,
            0.0,
            radius,
            radius,
            0.0,
        ]);

        Self {
            name: armor.name,
            armor_type: armor.kind,
            priority: armor.priority,
            armor_num,
            last_face: 0,
            last_timestamp: t,
            ekf: Ekf::new(x0, &p0_diag),
        }
    }

    /// Propagates the state to `t`. dt == 0 leaves the state unchanged.
    pub fn predict(&mut self, t: f64) {
        let dt = (t - self.last_timestamp).max(0.0);
        self.last_timestamp = t;

        let f = transition(dt);
        let q = process_noise(dt);
        self.ekf.predict(&f, &q);

        // keep the phase bounded so face arithmetic stays conditioned
        self.ekf.x[6] = wrap_rad(self.ekf.x[6]);
    }

    /// Fuses one solved face observation. The face is the predicted one
    /// nearest to the observation; ties break to the lowest index.
    pub fn update(&mut self, pose: &ArmorPose) -> bool {
        let mut face = 0;
        let mut best = f64::INFINITY;
        for i in 0..self.armor_num {
            let d = (self.face_position(i) - pose.position).norm_squared();
            if d < best {
                best = d;
                face = i;
            }
        }

        let x = &self.ekf.x;
        let phase = x[6] + face as f64 * std::f64::consts::TAU / self.armor_num as f64;
        let (r_col, r, dz_gain, dz) = if face % 2 == 0 {
            (8, x[8], 0.0, 0.0)
        } else {
            (9, x[9], 1.0, x[10])
        };

        let hx = na::DVector::from_row_slice(&[
            x[0] - r * phase.cos(),
            x[2] - r * phase.sin(),
            x[4] + dz,
            phase,
        ]);

        let mut h = na::DMatrix::zeros(4, STATE_DIM);
        h[(0, 0)] = 1.0;
        h[(0, 6)] = r * phase.sin();
        h[(0, r_col)] = -phase.cos();
        h[(1, 2)] = 1.0;
        h[(1, 6)] = -r * phase.cos();
        h[(1, r_col)] = -phase.sin();
        h[(2, 4)] = 1.0;
        h[(2, 10)] = dz_gain;
        h[(3, 6)] = 1.0;

        let z = na::DVector::from_row_slice(&[
            pose.position.x,
            pose.position.y,
            pose.position.z,
            pose.yaw,
        ]);
        let r_mat = na::DMatrix::from_diagonal(&na::DVector::from_row_slice(&R_DIAG));

        let ok = self.ekf.update(&z, &hx, &h, &r_mat, |z, hx| {
            let mut y = z - hx;
            y[3] = wrap_rad(y[3]);
            y
        });

        if ok {
            self.last_face = face;
        }

        ok
    }

    #[inline]
    pub fn state(&self) -> &na::DVector<f64> {
        &self.ekf.x
    }

    /// Body center position.
    #[inline]
    pub fn position(&self) -> na::Vector3<f64> {
        let x = &self.ekf.x;
        na::Vector3::new(x[0], x[2], x[4])
    }

    #[inline]
    pub fn velocity(&self) -> na::Vector3<f64> {
        let x = &self.ekf.x;
        na::Vector3::new(x[1], x[3], x[5])
    }

    #[inline]
    pub fn spin(&self) -> f64 {
        self.ekf.x[7]
    }

    /// World position of each armor face at the current state.
    pub fn armor_positions(&self) -> Vec<na::Vector3<f64>> {
        (0..self.armor_num).map(|i| self.face_position(i)).collect()
    }

    fn face_position(&self, i: usize) -> na::Vector3<f64> {
        let x = &self.ekf.x;
        let phase = x[6] + i as f64 * std::f64::consts::TAU / self.armor_num as f64;
        let (r, dz) = if i % 2 == 0 { (x[8], 0.0) } else { (x[9], x[10]) };

        na::Vector3::new(x[0] - r * phase.cos(), x[2] - r * phase.sin(), x[4] + dz)
    }

    /// Numeric blow-up / implausibility check. Thresholds: radii within
    /// [0.05, 0.8] m, |spin| < 50 rad/s, speed < 15 m/s.
    pub fn diverged(&self) -> bool {
        let x = &self.ekf.x;

        if x.iter().any(|v| !v.is_finite()) {
            return true;
        }

        for r in [x[8], x[9]] {
            if !(MIN_RADIUS..=MAX_RADIUS).contains(&r) {
                return true;
            }
        }

        x[7].abs() > MAX_SPIN || self.velocity().norm() > MAX_SPEED
    }
}

fn transition(dt: f64) -> na::DMatrix<f64> {
    let mut f = na::DMatrix::identity(STATE_DIM, STATE_DIM);
    for i in [0, 2, 4, 6] {
        f[(i, i + 1)] = dt;
    }

    f
}

fn process_noise(dt: f64) -> na::DMatrix<f64> {
    let mut q = na::DMatrix::zeros(STATE_DIM, STATE_DIM);

    let q4 = dt.powi(4) / 4.0;
    let q3 = dt.powi(3) / 2.0;
    let q2 = dt.powi(2);

    for (i, sigma2) in [(0, SIGMA2_ACC), (2, SIGMA2_ACC), (4, SIGMA2_ACC), (6, SIGMA2_ROT)] {
        q[(i, i)] = q4 * sigma2;
        q[(i, i + 1)] = q3 * sigma2;
        q[(i + 1, i)] = q3 * sigma2;
        q[(i + 1, i + 1)] = q2 * sigma2;
    }

    for i in 8..STATE_DIM {
        q[(i, i)] = SIGMA2_GEOMETRY * dt;
    }

    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RotatedRect;
    use crate::lightbar::Lightbar;

    const P0_NORMAL: [f64; STATE_DIM] = [1.0, 64.0, 1.0, 64.0, 1.0, 64.0, 0.4, 100.0, 1.0, 1.0, 1.0];

    fn armor() -> Armor {
        let left = Lightbar::new(
            &RotatedRect::new(na::Point2::new(100.0, 100.0), 5.6, 56.0, 0.0),
            0,
        );
        let right = Lightbar::new(
            &RotatedRect::new(na::Point2::new(240.0, 100.0), 5.6, 56.0, 0.0),
            1,
        );

        let mut armor = Armor::new(&left, &right);
        armor.name = ArmorName::Three;
        armor.confidence = 0.9;
        armor
    }

    fn pose(x: f64, y: f64, z: f64, yaw: f64) -> ArmorPose {
        ArmorPose {
            position: na::Vector3::new(x, y, z),
            yaw,
        }
    }

    fn target() -> Target {
        Target::new(&armor(), &pose(2.0, 0.0, 0.2, 0.0), 0.0, 0.2, 4, P0_NORMAL)
    }

    #[test]
    fn seeded_face_matches_observation() {
        let target = target();
        let faces = target.armor_positions();

        assert_eq!(faces.len(), 4);
        assert!((faces[0] - na::Vector3::new(2.0, 0.0, 0.2)).norm() < 1e-9);
        assert!((target.position().x - 2.2).abs() < 1e-9);
    }

    #[test]
    fn zero_dt_predict_is_identity() {
        let mut target = target();
        let before = target.state().clone();

        target.predict(0.0);

        assert!((target.state() - before).norm() < 1e-12);
    }

    #[test]
    fn update_pulls_face_toward_observation() {
        let mut target = target();

        target.predict(0.01);
        let observed = pose(2.05, 0.02, 0.2, 0.05);
        assert!(target.update(&observed));

        let face = target.armor_positions()[target.last_face];
        assert!((face - observed.position).norm() < 0.05);
        assert_eq!(target.last_face, 0);
    }

    #[test]
    fn association_picks_nearest_face() {
        let mut target = target();
        target.predict(0.01);

        // face 1 sits at phase pi/2: center - r * (cos, sin)
        let faces = target.armor_positions();
        let observed = pose(faces[1].x, faces[1].y, faces[1].z, std::f64::consts::FRAC_PI_2);
        assert!(target.update(&observed));
        assert_eq!(target.last_face, 1);
    }

    #[test]
    fn divergence_on_bad_radius() {
        let mut target = target();
        assert!(!target.diverged());

        target.ekf.x[8] = 5.0;
        assert!(target.diverged());
    }

    #[test]
    fn divergence_on_non_finite() {
        let mut target = target();
        target.ekf.x[0] = f64::NAN;
        assert!(target.diverged());
    }
}
