pub mod armor;
pub mod classifier;
pub mod config;
pub mod decider;
pub mod detector;
pub mod ekf;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod lightbar;
pub mod solver;
pub mod target;
pub mod tracker;

pub use armor::{Armor, ArmorName, ArmorType};
pub use classifier::Classify;
pub use config::{Config, Mode};
pub use decider::Decider;
pub use detector::Detector;
pub use error::Error;
pub use frame::{Contour, Frame};
pub use lightbar::{Color, Lightbar};
pub use solver::{ArmorPose, Solve};
pub use target::Target;
pub use tracker::{Tracker, TrackerState};
