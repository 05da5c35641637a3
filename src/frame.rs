use nalgebra as na;
use ndarray::Array3;

/// Contour of one bright blob, in pixel coordinates. Produced by the
/// external vision stage (threshold + findContours equivalent).
pub type Contour = Vec<na::Point2<f32>>;

pub struct Frame {
    /// BGR image, shape (height, width, 3)
    pub image: Array3<u8>,
    pub timestamp: f64, // in seconds
}

impl Frame {
    pub fn new(image: Array3<u8>, timestamp: f64) -> Self {
        Self { image, timestamp }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.image.shape()[0]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.image.shape()[1]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }
}
