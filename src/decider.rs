use std::collections::HashMap;

use crate::armor::{Armor, ArmorName};
use crate::config::{Config, Mode};
use crate::lightbar::Color;

const DEFAULT_PRIORITY: i32 = 100;

/// Decision layer: assigns per-identity priorities (lower = more
/// important) before tracking and filters friendly armors.
pub struct Decider {
    enemy_color: Color,
    priority: HashMap<ArmorName, i32>,
}

impl Decider {
    pub fn new(config: &Config) -> Self {
        let priority = match config.mode {
            Mode::Standard => standard_priority(),
            Mode::Sentry => sentry_priority(),
        };

        Self {
            enemy_color: config.enemy_color,
            priority,
        }
    }

    pub fn set_priority(&self, armors: &mut [Armor]) {
        for armor in armors {
            armor.priority = self
                .priority
                .get(&armor.name)
                .copied()
                .unwrap_or(DEFAULT_PRIORITY);
        }
    }

    /// Drops friendly-colored armors; returns true when none remain.
    pub fn armor_filter(&self, armors: &mut Vec<Armor>) -> bool {
        armors.retain(|a| a.color == self.enemy_color);
        armors.is_empty()
    }
}

fn standard_priority() -> HashMap<ArmorName, i32> {
    HashMap::from([
        (ArmorName::One, 1),
        (ArmorName::Three, 2),
        (ArmorName::Four, 2),
        (ArmorName::Five, 2),
        (ArmorName::Sentry, 3),
        (ArmorName::Two, 4),
        (ArmorName::Outpost, 5),
        (ArmorName::Base, 6),
    ])
}

fn sentry_priority() -> HashMap<ArmorName, i32> {
    HashMap::from([
        (ArmorName::Three, 1),
        (ArmorName::Four, 1),
        (ArmorName::Five, 1),
        (ArmorName::One, 2),
        (ArmorName::Two, 3),
        (ArmorName::Sentry, 4),
        (ArmorName::Outpost, 5),
        (ArmorName::Base, 6),
    ])
}
