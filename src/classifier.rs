use ndarray::ArrayView3;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::armor::ArmorName;
use crate::error::Error;

/// Pattern classifier boundary. The real network lives outside the core;
/// tests inject deterministic stubs.
pub trait Classify {
    /// Returns the plate identity and a confidence in [0, 1].
    fn classify(&self, pattern: ArrayView3<'_, u8>) -> (ArmorName, f32);
}

impl<T: Classify + ?Sized> Classify for &T {
    fn classify(&self, pattern: ArrayView3<'_, u8>) -> (ArmorName, f32) {
        (**self).classify(pattern)
    }
}

/// Persists a pattern crop as binary PPM for classifier retraining.
/// File name carries the classified name and a timestamp.
pub fn save_pattern(dir: &Path, name: ArmorName, pattern: ArrayView3<'_, u8>) -> Result<(), Error> {
    std::fs::create_dir_all(dir)?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_micros());
    let path = dir.join(format!("{}_{}.ppm", name.as_str(), stamp));

    let (h, w) = (pattern.shape()[0], pattern.shape()[1]);
    let mut data = Vec::with_capacity(32 + h * w * 3);
    data.extend_from_slice(format!("P6\n{} {}\n255\n", w, h).as_bytes());

    for row in 0..h {
        for col in 0..w {
            // stored BGR, PPM wants RGB
            data.push(pattern[[row, col, 2]]);
            data.push(pattern[[row, col, 1]]);
            data.push(pattern[[row, col, 0]]);
        }
    }

    std::fs::write(path, data)?;
    Ok(())
}
