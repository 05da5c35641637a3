use nalgebra as na;
use serde_derive::Deserialize;

use crate::geometry::RotatedRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
        }
    }
}

/// One bright bar, a side of an armor plate. Per-frame value: built from
/// a contour, dropped at the end of the frame.
#[derive(Debug, Clone)]
pub struct Lightbar {
    pub id: usize,
    pub color: Color,
    pub center: na::Point2<f32>,
    pub top: na::Point2<f32>,
    pub bottom: na::Point2<f32>,
    /// full top-to-bottom vector, |top2bottom| == length
    pub top2bottom: na::Vector2<f32>,
    pub length: f32,
    pub width: f32,
    pub ratio: f32,
    /// deviation of the bar axis from image-vertical, radians
    pub angle_error: f32,
}

impl Lightbar {
    pub fn new(rect: &RotatedRect, id: usize) -> Self {
        // the longer rect dimension is the bar axis
        let (length, width, axis_angle) = if rect.width >= rect.height {
            (rect.width, rect.height, rect.angle)
        } else {
            (rect.height, rect.width, rect.angle + std::f32::consts::FRAC_PI_2)
        };

        let mut axis = na::Vector2::new(axis_angle.cos(), axis_angle.sin());
        if axis.y < 0.0 {
            axis = -axis; // image y grows downward
        }

        let half = axis * (length / 2.0);
        let ratio = if length > 0.0 { width / length } else { 0.0 };

        Self {
            id,
            color: Color::Red, // reassigned from contour pixels
            center: rect.center,
            top: rect.center - half,
            bottom: rect.center + half,
            top2bottom: axis * length,
            length,
            width,
            ratio,
            angle_error: axis.angle(&na::Vector2::y()),
        }
    }
}
