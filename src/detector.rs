use nalgebra as na;
use ndarray::{s, Array3};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::armor::{Armor, ArmorName, ArmorType};
use crate::classifier::{save_pattern, Classify};
use crate::config::Config;
use crate::frame::{Contour, Frame};
use crate::geometry::min_area_rect;
use crate::lightbar::{Color, Lightbar};

const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

pub struct Detector<C> {
    classifier: C,

    max_angle_error: f32, // rad
    min_lightbar_ratio: f32,
    max_lightbar_ratio: f32,
    min_lightbar_length: f32,

    min_armor_ratio: f32,
    max_armor_ratio: f32,
    max_side_ratio: f32,
    max_rectangular_error: f32, // rad
    min_confidence: f32,

    /// near-miss patterns land here for classifier retraining
    save_path: Option<PathBuf>,
}

impl<C: Classify> Detector<C> {
    pub fn new(config: &Config, classifier: C) -> Self {
        Self {
            classifier,
            max_angle_error: config.max_angle_error * DEG_TO_RAD,
            min_lightbar_ratio: config.min_lightbar_ratio,
            max_lightbar_ratio: config.max_lightbar_ratio,
            min_lightbar_length: config.min_lightbar_length,
            min_armor_ratio: config.min_armor_ratio,
            max_armor_ratio: config.max_armor_ratio,
            max_side_ratio: config.max_side_ratio,
            max_rectangular_error: config.max_rectangular_error * DEG_TO_RAD,
            min_confidence: config.min_confidence,
            save_path: None,
        }
    }

    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    /// Per-frame pipeline: contours from the external vision stage in,
    /// clean non-overlapping armor hypotheses out.
    pub fn detect(&self, frame: &Frame, contours: &[Contour]) -> Vec<Armor> {
        if frame.is_empty() {
            return Vec::new();
        }

        let mut lightbars = Vec::new();
        for contour in contours {
            let rect = match min_area_rect(contour) {
                Some(rect) => rect,
                None => continue,
            };

            let mut lightbar = Lightbar::new(&rect, lightbars.len());
            if !self.check_lightbar(&lightbar) {
                continue;
            }

            lightbar.color = get_color(frame, contour);
            lightbars.push(lightbar);
        }

        // left-to-right order for the pairing scan
        lightbars.sort_by(|a, b| a.center.x.partial_cmp(&b.center.x).unwrap());

        let mut armors = Vec::new();
        for (i, left) in lightbars.iter().enumerate() {
            for right in &lightbars[i + 1..] {
                if left.color != right.color {
                    continue;
                }

                let mut armor = Armor::new(left, right);
                if !self.check_armor(&armor) {
                    continue;
                }

                armor.pattern = match get_pattern(frame, &armor) {
                    Some(pattern) => pattern,
                    None => continue,
                };

                let (name, confidence) = self.classifier.classify(armor.pattern.view());
                armor.name = name;
                armor.confidence = confidence;
                if !self.check_name(&armor) {
                    continue;
                }

                armor.kind = get_type(&armor);
                if !self.check_type(&armor) {
                    continue;
                }

                armor.center_norm = get_center_norm(frame, armor.center);
                armors.push(armor);
            }
        }

        deduplicate(&mut armors);
        armors
    }

    fn check_lightbar(&self, lightbar: &Lightbar) -> bool {
        let angle_ok = lightbar.angle_error < self.max_angle_error;
        let ratio_ok =
            lightbar.ratio > self.min_lightbar_ratio && lightbar.ratio < self.max_lightbar_ratio;
        let length_ok = lightbar.length > self.min_lightbar_length;

        angle_ok && ratio_ok && length_ok
    }

    fn check_armor(&self, armor: &Armor) -> bool {
        let ratio_ok = armor.ratio > self.min_armor_ratio && armor.ratio < self.max_armor_ratio;
        let side_ratio_ok = armor.side_ratio < self.max_side_ratio;
        let rectangular_ok = armor.rectangular_error < self.max_rectangular_error;

        ratio_ok && side_ratio_ok && rectangular_ok
    }

    fn check_name(&self, armor: &Armor) -> bool {
        let name_ok = armor.name != ArmorName::NotArmor;
        let confidence_ok = armor.confidence > self.min_confidence;

        // uncertain patterns feed the next classifier iteration
        if name_ok && !confidence_ok {
            self.save(armor);
        }

        name_ok && confidence_ok
    }

    fn check_type(&self, armor: &Armor) -> bool {
        let name_ok = match armor.kind {
            ArmorType::Small => armor.name != ArmorName::One && armor.name != ArmorName::Base,
            ArmorType::Big => armor.name == ArmorName::One || armor.name == ArmorName::Base,
        };

        if !name_ok {
            debug!(
                "strange armor: {} {}",
                armor.kind.as_str(),
                armor.name.as_str()
            );
            self.save(armor);
        }

        name_ok
    }

    fn save(&self, armor: &Armor) {
        if let Some(dir) = &self.save_path {
            if let Err(err) = save_pattern(dir, armor.name, armor.pattern.view()) {
                warn!("failed to save pattern: {}", err);
            }
        }
    }
}

/// Marks conflicting armors pairwise, then filters. Marks never drop an
/// armor mid-scan so every pair is compared against the full set.
pub fn deduplicate(armors: &mut Vec<Armor>) {
    for i in 0..armors.len() {
        for j in i + 1..armors.len() {
            let (a, b) = (&armors[i], &armors[j]);

            let shared = a.left.id == b.left.id
                || a.left.id == b.right.id
                || a.right.id == b.left.id
                || a.right.id == b.right.id;
            if !shared {
                continue;
            }

            // true overlap: keep the tighter (smaller) pattern crop
            if a.left.id == b.left.id || a.right.id == b.right.id {
                let area_a = a.pattern.shape()[0] * a.pattern.shape()[1];
                let area_b = b.pattern.shape()[0] * b.pattern.shape()[1];

                if area_a < area_b {
                    armors[j].duplicated = true;
                } else {
                    armors[i].duplicated = true;
                }
            }

            let (a, b) = (&armors[i], &armors[j]);

            // adjacent plates sharing a lightbar: keep the confident one
            if a.left.id == b.right.id || a.right.id == b.left.id {
                if a.confidence < b.confidence {
                    armors[i].duplicated = true;
                } else {
                    armors[j].duplicated = true;
                }
            }
        }
    }

    armors.retain(|a| !a.duplicated);
}

fn get_color(frame: &Frame, contour: &Contour) -> Color {
    let (h, w) = (frame.height() as isize, frame.width() as isize);
    let mut red_sum = 0u32;
    let mut blue_sum = 0u32;

    for point in contour {
        let col = (point.x as isize).clamp(0, w - 1) as usize;
        let row = (point.y as isize).clamp(0, h - 1) as usize;

        blue_sum += frame.image[[row, col, 0]] as u32;
        red_sum += frame.image[[row, col, 2]] as u32;
    }

    if blue_sum > red_sum {
        Color::Blue
    } else {
        Color::Red
    }
}

fn get_pattern(frame: &Frame, armor: &Armor) -> Option<Array3<u8>> {
    let [tl, tr, br, bl] = armor.points;

    let left = (tl.x.min(bl.x).max(0.0)) as usize;
    let top = (tl.y.min(tr.y).max(0.0)) as usize;
    let right = ((tr.x.max(br.x)) as usize).min(frame.width());
    let bottom = ((bl.y.max(br.y)) as usize).min(frame.height());

    if right <= left || bottom <= top {
        return None;
    }

    Some(frame.image.slice(s![top..bottom, left..right, ..]).to_owned())
}

fn get_type(armor: &Armor) -> ArmorType {
    if armor.ratio > 3.0 {
        return ArmorType::Big;
    }

    if armor.ratio < 2.5 {
        return ArmorType::Small;
    }

    debug!("armor type by name: {}", armor.name.as_str());

    // hero and base plates only come in big
    if armor.name == ArmorName::One || armor.name == ArmorName::Base {
        return ArmorType::Big;
    }

    ArmorType::Small
}

fn get_center_norm(frame: &Frame, center: na::Point2<f32>) -> na::Point2<f32> {
    na::Point2::new(
        center.x / frame.width() as f32,
        center.y / frame.height() as f32,
    )
}
