use serde_derive::Deserialize;
use std::path::Path;

use crate::error::Error;
use crate::lightbar::Color;

/// Operating mode of the decision layer, selects the priority table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Standard,
    Sentry,
}

/// Flat threshold set, loaded once at startup. Angular bounds are given
/// in degrees and converted to radians by the consumers.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// binarization threshold, carried for the external vision stage
    pub threshold: f64,

    pub max_angle_error: f32, // degrees
    pub min_lightbar_ratio: f32,
    pub max_lightbar_ratio: f32,
    pub min_lightbar_length: f32,

    pub min_armor_ratio: f32,
    pub max_armor_ratio: f32,
    pub max_side_ratio: f32,
    pub max_rectangular_error: f32, // degrees
    pub min_confidence: f32,

    pub enemy_color: Color,
    pub min_detect_count: u32,
    pub max_temp_lost_count: u32,
    pub outpost_max_temp_lost_count: u32,

    /// frame gaps above this many seconds reset the tracker (camera stall)
    #[serde(default = "default_max_frame_gap")]
    pub max_frame_gap: f64,

    #[serde(default)]
    pub mode: Mode,
}

fn default_max_frame_gap() -> f64 {
    0.1
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&text)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_sample_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/autoaim.yaml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.enemy_color, Color::Blue);
        assert!(config.min_lightbar_ratio < config.max_lightbar_ratio);
        assert!(config.min_armor_ratio < config.max_armor_ratio);
        assert!(config.min_detect_count > 0);
        assert_eq!(config.max_frame_gap, 0.1);
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(Config::load("no/such/config.yaml").is_err());
    }

    #[test]
    fn malformed_config_is_fatal() {
        let err = serde_yaml::from_str::<Config>("threshold: [oops]");
        assert!(err.is_err());
    }
}
