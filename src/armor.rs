use nalgebra as na;
use ndarray::Array3;

use crate::lightbar::{Color, Lightbar};

/// 0.5 * armor height / lightbar length = 0.5 * 126mm / 56mm
const LIGHTBAR_EXTEND: f32 = 1.125;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmorName {
    One,
    Two,
    Three,
    Four,
    Five,
    Sentry,
    Outpost,
    Base,
    NotArmor,
}

impl ArmorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmorName::One => "one",
            ArmorName::Two => "two",
            ArmorName::Three => "three",
            ArmorName::Four => "four",
            ArmorName::Five => "five",
            ArmorName::Sentry => "sentry",
            ArmorName::Outpost => "outpost",
            ArmorName::Base => "base",
            ArmorName::NotArmor => "not_armor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmorType {
    Small,
    Big,
}

impl ArmorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmorType::Small => "small",
            ArmorType::Big => "big",
        }
    }
}

/// A (left, right) lightbar pair facing the camera together. Geometry is
/// fixed at construction; only `duplicated` and `priority` mutate after.
#[derive(Debug, Clone)]
pub struct Armor {
    pub left: Lightbar,
    pub right: Lightbar,
    pub color: Color,
    pub center: na::Point2<f32>,
    /// corner points: tl, tr, br, bl
    pub points: [na::Point2<f32>; 4],
    pub ratio: f32,
    pub side_ratio: f32,
    /// worst lightbar-to-baseline deviation from a right angle, radians
    pub rectangular_error: f32,
    /// BGR crop of the plate pattern, filled by the detector
    pub pattern: Array3<u8>,
    pub name: ArmorName,
    pub confidence: f32,
    pub kind: ArmorType,
    /// pixel center divided by image dimensions
    pub center_norm: na::Point2<f32>,
    pub duplicated: bool,
    /// lower is more important; set by the decision layer
    pub priority: i32,
}

impl Armor {
    pub fn new(left: &Lightbar, right: &Lightbar) -> Self {
        assert_ne!(left.id, right.id, "armor from a single lightbar");

        let tl = left.center - left.top2bottom * LIGHTBAR_EXTEND;
        let bl = left.center + left.top2bottom * LIGHTBAR_EXTEND;
        let tr = right.center - right.top2bottom * LIGHTBAR_EXTEND;
        let br = right.center + right.top2bottom * LIGHTBAR_EXTEND;

        let width = na::distance(&left.center, &right.center);
        let mean_length = (left.length + right.length) / 2.0;
        let baseline = right.center - left.center;

        let e_left = (std::f32::consts::FRAC_PI_2 - left.top2bottom.angle(&baseline)).abs();
        let e_right = (std::f32::consts::FRAC_PI_2 - right.top2bottom.angle(&baseline)).abs();

        Self {
            left: left.clone(),
            right: right.clone(),
            color: left.color,
            center: na::center(&left.center, &right.center),
            points: [tl, tr, br, bl],
            ratio: width / mean_length,
            side_ratio: left.length.max(right.length) / left.length.min(right.length),
            rectangular_error: e_left.max(e_right),
            pattern: Array3::zeros((0, 0, 3)),
            name: ArmorName::NotArmor,
            confidence: 0.0,
            kind: ArmorType::Small,
            center_norm: na::Point2::new(0.0, 0.0),
            duplicated: false,
            priority: i32::MAX,
        }
    }
}
