use nalgebra as na;
use tracing::{debug, warn};

use crate::armor::{Armor, ArmorName, ArmorType};
use crate::config::Config;
use crate::lightbar::Color;
use crate::solver::Solve;
use crate::target::Target;

// covariance diagonal priors by body type
const P0_NORMAL: [f64; 11] = [1.0, 64.0, 1.0, 64.0, 1.0, 64.0, 0.4, 100.0, 1.0, 1.0, 1.0];
const P0_FIXED_GEOMETRY: [f64; 11] = [1.0, 64.0, 1.0, 64.0, 1.0, 64.0, 0.4, 100.0, 1e-4, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Lost,
    Detecting,
    Tracking,
    TempLost,
}

/// Lock acquisition, confirmation and loss tolerance around the EKF.
/// Single owner of the cross-frame `Target`.
pub struct Tracker<S> {
    solver: S,
    enemy_color: Color,
    min_detect_count: u32,
    max_temp_lost_count: u32,
    outpost_max_temp_lost_count: u32,
    max_frame_gap: f64,

    state: TrackerState,
    detect_count: u32,
    temp_lost_count: u32,
    target: Option<Target>,
    last_timestamp: Option<f64>,
}

impl<S: Solve> Tracker<S> {
    pub fn new(config: &Config, solver: S) -> Self {
        Self {
            solver,
            enemy_color: config.enemy_color,
            min_detect_count: config.min_detect_count,
            max_temp_lost_count: config.max_temp_lost_count,
            outpost_max_temp_lost_count: config.outpost_max_temp_lost_count,
            max_frame_gap: config.max_frame_gap,
            state: TrackerState::Lost,
            detect_count: 0,
            temp_lost_count: 0,
            target: None,
            last_timestamp: None,
        }
    }

    #[inline]
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// One frame step. Returns the current target, or nothing while lost.
    pub fn track(
        &mut self,
        mut armors: Vec<Armor>,
        t: f64,
        use_enemy_color: bool,
    ) -> Option<&Target> {
        let dt = self.last_timestamp.map_or(0.0, |last| t - last);
        self.last_timestamp = Some(t);

        // a long gap means the camera probably went away
        if self.state != TrackerState::Lost && dt > self.max_frame_gap {
            warn!("large frame gap: {:.3}s", dt);
            self.state = TrackerState::Lost;
        }

        if use_enemy_color {
            let enemy = self.enemy_color;
            armors.retain(|a| a.color == enemy);
        }

        // most centered candidate first
        let img_center = na::Point2::new(0.5f32, 0.5);
        armors.sort_by(|a, b| {
            let d1 = na::distance(&a.center_norm, &img_center);
            let d2 = na::distance(&b.center_norm, &img_center);
            d1.partial_cmp(&d2).unwrap()
        });

        let switch = match (armors.first(), self.target.as_ref()) {
            (Some(armor), Some(target)) => armor.priority < target.priority,
            _ => false,
        };

        let found = if self.state == TrackerState::Lost {
            self.set_target(&armors, t)
        } else if switch {
            debug!("switch target to {}", armors[0].name.as_str());
            self.set_target(&armors, t)
        } else {
            self.update_target(&armors, t)
        };

        self.state_machine(found);

        if self.state != TrackerState::Lost && self.target.as_ref().map_or(false, Target::diverged)
        {
            debug!("target diverged");
            self.state = TrackerState::Lost;
        }

        if self.state == TrackerState::Lost {
            self.target = None;
            return None;
        }

        self.target.as_ref()
    }

    fn state_machine(&mut self, found: bool) {
        match self.state {
            TrackerState::Lost => {
                if found {
                    // with min_detect_count == 1 the first hit confirms
                    // immediately instead of spending a frame in Detecting
                    self.state = TrackerState::Detecting;
                    self.detect_count = 1;
                    if self.detect_count >= self.min_detect_count {
                        self.state = TrackerState::Tracking;
                    }
                }
            }

            TrackerState::Detecting => {
                if found {
                    self.detect_count += 1;
                    if self.detect_count >= self.min_detect_count {
                        self.state = TrackerState::Tracking;
                    }
                } else {
                    self.detect_count = 0;
                    self.state = TrackerState::Lost;
                }
            }

            TrackerState::Tracking => {
                if !found {
                    self.temp_lost_count = 1;
                    self.state = TrackerState::TempLost;
                }
            }

            TrackerState::TempLost => {
                if found {
                    self.state = TrackerState::Tracking;
                } else {
                    self.temp_lost_count += 1;

                    // the outpost moves slowly, give it a longer grace
                    let allowance = match self.target.as_ref() {
                        Some(target) if target.name == ArmorName::Outpost => {
                            self.outpost_max_temp_lost_count
                        }
                        _ => self.max_temp_lost_count,
                    };

                    if self.temp_lost_count > allowance {
                        self.state = TrackerState::Lost;
                    }
                }
            }
        }
    }

    /// Fresh lock: seed a new target from the most centered candidate,
    /// with geometry and covariance priors keyed on the body type.
    fn set_target(&mut self, armors: &[Armor], t: f64) -> bool {
        let armor = match armors.first() {
            Some(armor) => armor,
            None => return false,
        };

        let pose = self.solver.solve(armor);

        let is_balance = armor.kind == ArmorType::Big
            && matches!(
                armor.name,
                ArmorName::Three | ArmorName::Four | ArmorName::Five
            );

        let (radius, armor_num, p0) = if is_balance {
            (0.2, 2, P0_NORMAL)
        } else if armor.name == ArmorName::Outpost {
            (0.2765, 3, P0_FIXED_GEOMETRY)
        } else if armor.name == ArmorName::Base {
            (0.3205, 3, P0_FIXED_GEOMETRY)
        } else {
            (0.2, 4, P0_NORMAL)
        };

        self.target = Some(Target::new(armor, &pose, t, radius, armor_num, p0));
        true
    }

    /// Predict-then-associate update against the current target identity.
    fn update_target(&mut self, armors: &[Armor], t: f64) -> bool {
        let (name, kind) = match self.target.as_mut() {
            Some(target) => {
                target.predict(t);
                (target.name, target.armor_type)
            }
            None => return false,
        };

        let matched: Vec<&Armor> = armors
            .iter()
            .filter(|a| a.name == name && a.kind == kind)
            .collect();

        // a third simultaneous face is physically impossible; the frame
        // is unreliable, better to coast than to guess
        if matched.len() > 2 {
            warn!("{} armors match the target, ignoring frame", matched.len());
            return false;
        }
        if matched.is_empty() {
            return false;
        }

        let poses: Vec<_> = matched.iter().map(|a| self.solver.solve(a)).collect();

        let mut updated = false;
        if let Some(target) = self.target.as_mut() {
            for pose in &poses {
                updated |= target.update(pose);
            }
        }

        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RotatedRect;
    use crate::lightbar::Lightbar;
    use crate::solver::ArmorPose;

    struct FixedSolver(ArmorPose);

    impl Solve for FixedSolver {
        fn solve(&self, _armor: &Armor) -> ArmorPose {
            self.0
        }
    }

    fn config() -> Config {
        let mut config =
            Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/configs/autoaim.yaml")).unwrap();
        config.min_detect_count = 3;
        config.max_temp_lost_count = 2;
        config
    }

    fn armor(name: ArmorName) -> Armor {
        let left = Lightbar::new(
            &RotatedRect::new(na::Point2::new(100.0, 100.0), 5.6, 56.0, 0.0),
            0,
        );
        let right = Lightbar::new(
            &RotatedRect::new(na::Point2::new(240.0, 100.0), 5.6, 56.0, 0.0),
            1,
        );

        let mut armor = Armor::new(&left, &right);
        armor.name = name;
        armor.confidence = 0.9;
        armor.center_norm = na::Point2::new(0.5, 0.5);
        armor.priority = 10;
        armor
    }

    fn pose() -> ArmorPose {
        ArmorPose {
            position: na::Vector3::new(2.0, 0.0, 0.2),
            yaw: 0.0,
        }
    }

    fn tracker() -> Tracker<FixedSolver> {
        Tracker::new(&config(), FixedSolver(pose()))
    }

    #[test]
    fn lock_confirmation_sequence() {
        let mut tracker = tracker();
        assert_eq!(tracker.state(), TrackerState::Lost);

        let mut t = 0.0;
        for frame in 0..3 {
            let found = tracker.track(vec![armor(ArmorName::Three)], t, false).is_some();
            t += 0.01;

            assert!(found);
            if frame < 2 {
                assert_eq!(tracker.state(), TrackerState::Detecting);
            } else {
                assert_eq!(tracker.state(), TrackerState::Tracking);
            }
        }
    }

    #[test]
    fn temp_lost_exhaustion() {
        let mut tracker = tracker();

        let mut t = 0.0;
        for _ in 0..3 {
            tracker.track(vec![armor(ArmorName::Three)], t, false);
            t += 0.01;
        }
        assert_eq!(tracker.state(), TrackerState::Tracking);

        // max_temp_lost_count = 2: two missed frames stay temp_lost
        tracker.track(Vec::new(), t, false);
        t += 0.01;
        assert_eq!(tracker.state(), TrackerState::TempLost);

        tracker.track(Vec::new(), t, false);
        t += 0.01;
        assert_eq!(tracker.state(), TrackerState::TempLost);

        let found = tracker.track(Vec::new(), t, false).is_some();
        assert!(!found);
        assert_eq!(tracker.state(), TrackerState::Lost);
    }

    #[test]
    fn temp_lost_recovers() {
        let mut tracker = tracker();

        let mut t = 0.0;
        for _ in 0..3 {
            tracker.track(vec![armor(ArmorName::Three)], t, false);
            t += 0.01;
        }

        tracker.track(Vec::new(), t, false);
        t += 0.01;
        assert_eq!(tracker.state(), TrackerState::TempLost);

        tracker.track(vec![armor(ArmorName::Three)], t, false);
        assert_eq!(tracker.state(), TrackerState::Tracking);
    }

    #[test]
    fn frame_gap_resets_to_lost() {
        let mut tracker = tracker();

        let mut t = 0.0;
        for _ in 0..3 {
            tracker.track(vec![armor(ArmorName::Three)], t, false);
            t += 0.01;
        }
        assert_eq!(tracker.state(), TrackerState::Tracking);

        // camera stall: well past max_frame_gap
        let found = tracker
            .track(vec![armor(ArmorName::Three)], t + 1.0, false)
            .is_some();
        assert!(found);
        assert_eq!(tracker.state(), TrackerState::Detecting);
    }

    #[test]
    fn divergence_resets_to_lost() {
        // holds still while the lock confirms, then jumps hundreds of
        // meters in one frame, blowing the velocity state well past any
        // plausible speed
        #[derive(Default)]
        struct TeleportSolver {
            calls: std::cell::Cell<usize>,
        }

        impl Solve for TeleportSolver {
            fn solve(&self, _armor: &Armor) -> ArmorPose {
                let n = self.calls.get();
                self.calls.set(n + 1);
                let x = if n < 3 { 2.0 } else { 500.0 };
                ArmorPose {
                    position: na::Vector3::new(x, 0.0, 0.2),
                    yaw: 0.0,
                }
            }
        }

        let mut tracker = Tracker::new(&config(), TeleportSolver::default());

        let mut t = 0.0;
        for _ in 0..3 {
            tracker.track(vec![armor(ArmorName::Three)], t, false);
            t += 0.01;
        }
        assert_eq!(tracker.state(), TrackerState::Tracking);

        let found = tracker.track(vec![armor(ArmorName::Three)], t, false).is_some();
        assert!(!found);
        assert_eq!(tracker.state(), TrackerState::Lost);
    }

    #[test]
    fn enemy_color_filter() {
        let mut tracker = tracker();

        // armors are red, enemy is blue: nothing to lock on
        let out = tracker.track(vec![armor(ArmorName::Three)], 0.0, true);
        assert!(out.is_none());
        assert_eq!(tracker.state(), TrackerState::Lost);
    }

    #[test]
    fn too_many_matches_fail_update() {
        let mut tracker = tracker();

        let mut t = 0.0;
        for _ in 0..3 {
            tracker.track(vec![armor(ArmorName::Three)], t, false);
            t += 0.01;
        }
        assert_eq!(tracker.state(), TrackerState::Tracking);

        let many = vec![
            armor(ArmorName::Three),
            armor(ArmorName::Three),
            armor(ArmorName::Three),
        ];
        tracker.track(many, t, false);
        assert_eq!(tracker.state(), TrackerState::TempLost);
    }

    #[test]
    fn priority_switch_mid_track() {
        let mut tracker = tracker();

        let mut t = 0.0;
        for _ in 0..3 {
            tracker.track(vec![armor(ArmorName::Three)], t, false);
            t += 0.01;
        }
        assert_eq!(tracker.state(), TrackerState::Tracking);

        let mut hero = armor(ArmorName::One);
        hero.kind = ArmorType::Big;
        hero.priority = 1;

        let out = tracker.track(vec![hero], t, false).cloned();
        assert_eq!(out.unwrap().name, ArmorName::One);
    }

    #[test]
    fn outpost_gets_longer_grace() {
        let mut config = config();
        config.outpost_max_temp_lost_count = 10;
        let mut tracker = Tracker::new(&config, FixedSolver(pose()));

        let mut outpost = armor(ArmorName::Outpost);
        outpost.kind = ArmorType::Small;

        let mut t = 0.0;
        for _ in 0..3 {
            tracker.track(vec![outpost.clone()], t, false);
            t += 0.01;
        }
        assert_eq!(tracker.state(), TrackerState::Tracking);

        // would be lost after 3 misses for a normal target
        for _ in 0..5 {
            tracker.track(Vec::new(), t, false);
            t += 0.01;
        }
        assert_eq!(tracker.state(), TrackerState::TempLost);
    }
}
