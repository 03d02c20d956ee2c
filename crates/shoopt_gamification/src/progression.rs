//! Level curve and achievement transition rules.
//!
//! ## XP Curve
//!
//! Threshold for level L (L >= 1): floor(100 * L^1.5)
//! - Level 1: 100
//! - Level 2: 282
//! - Level 3: 519
//! - Level 10: 3162
//!
//! Level 1 is held from 0 XP, so its floor is 0 rather than its threshold.
//! Every higher level is reached once total XP meets its threshold.
//!
//! Progress percentages divide by the distance between level floors. Level 1
//! therefore spans 282 XP (0 to 282), not the 182 that subtracting the raw
//! thresholds of levels 1 and 2 would give.
//!
//! Everything here is pure: no I/O, no clock.

use crate::models::Achievement;
use serde::{Deserialize, Serialize};

const BASE_XP: f64 = 100.0;

/// Titles for levels 1-10
pub const LEVEL_TITLES: &[&str] = &[
    "Shopper Novice",
    "Price Hunter",
    "Smart Buyer",
    "Shopping Expert",
    "Deal Master",
    "Bargain Legend",
    "Shopping Guru",
    "Price Oracle",
    "Shopping Champion",
    "Ultimate Shopper",
];

/// floor(100 * level^1.5). Level 0 is treated as level 1.
pub fn xp_required_for_level(level: u32) -> u64 {
    let l = level.max(1) as f64;
    // l * sqrt(l) stays exact on perfect squares, powf(1.5) does not always
    (BASE_XP * l * l.sqrt()).floor() as u64
}

/// Total XP at which `level` starts.
pub fn level_floor(level: u32) -> u64 {
    if level <= 1 {
        0
    } else {
        xp_required_for_level(level)
    }
}

/// Level held at `total_xp`, and the XP earned inside that level.
pub fn level_for_total_xp(total_xp: u64) -> (u32, u64) {
    // Closed-form estimate, then settle on the exact bracket
    let estimate = (total_xp as f64 / BASE_XP).powf(2.0 / 3.0).floor();
    let mut level = (estimate as u32).max(1);
    while level > 1 && level_floor(level) > total_xp {
        level -= 1;
    }
    while level < u32::MAX && level_floor(level + 1) <= total_xp {
        level += 1;
    }
    (level, total_xp - level_floor(level))
}

/// Progress toward the next level, 0.0 - 100.0. The range is
/// `level_floor(level + 1) - level_floor(level)`.
pub fn progress_percentage(level: u32, xp_in_level: u64) -> f64 {
    let level = level.max(1);
    let range = level_floor(level.saturating_add(1)) as f64 - level_floor(level) as f64;
    if range <= 0.0 {
        return 100.0;
    }
    (xp_in_level as f64 / range * 100.0).clamp(0.0, 100.0)
}

/// XP still needed to reach the next level.
pub fn xp_to_next_level(total_xp: u64) -> u64 {
    let (level, _) = level_for_total_xp(total_xp);
    level_floor(level.saturating_add(1)).saturating_sub(total_xp)
}

pub fn level_title(level: u32) -> String {
    match level {
        1..=10 => LEVEL_TITLES[(level - 1) as usize].to_string(),
        _ => format!("Shopping God (Lvl {})", level),
    }
}

/// Clamp a raw progress value into `[0, required_count]`.
pub fn clamp_progress(achievement: &Achievement, value: u64) -> u32 {
    value.min(achievement.target() as u64) as u32
}

/// Whether adding `delta` to `current` reaches the achievement's target.
pub fn completes(achievement: &Achievement, current: u32, delta: u64) -> bool {
    (current as u64).saturating_add(delta) >= achievement.target() as u64
}

/// Display bundle derived from total XP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub total_xp: u64,
    pub level: u32,
    pub xp_in_level: u64,
    pub xp_to_next: u64,
    pub progress_percent: f64,
    pub title: String,
}

impl LevelSnapshot {
    pub fn from_total_xp(total_xp: u64) -> Self {
        let (level, xp_in_level) = level_for_total_xp(total_xp);
        Self {
            total_xp,
            level,
            xp_in_level,
            xp_to_next: xp_to_next_level(total_xp),
            progress_percent: progress_percentage(level, xp_in_level),
            title: level_title(level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AchievementCategory;

    #[test]
    fn test_known_thresholds() {
        assert_eq!(xp_required_for_level(1), 100);
        assert_eq!(xp_required_for_level(2), 282);
        assert_eq!(xp_required_for_level(3), 519);
        assert_eq!(xp_required_for_level(4), 800);
        assert_eq!(xp_required_for_level(9), 2700);
        assert_eq!(xp_required_for_level(10), 3162);
    }

    #[test]
    fn test_thresholds_strictly_increase() {
        for level in 1..500 {
            assert!(
                xp_required_for_level(level + 1) > xp_required_for_level(level),
                "threshold did not increase at level {}",
                level
            );
        }
    }

    #[test]
    fn test_level_for_total_xp_boundaries() {
        assert_eq!(level_for_total_xp(0), (1, 0));
        assert_eq!(level_for_total_xp(99), (1, 99));
        assert_eq!(level_for_total_xp(100), (1, 100));
        assert_eq!(level_for_total_xp(281), (1, 281));
        assert_eq!(level_for_total_xp(282), (2, 0));
        assert_eq!(level_for_total_xp(300), (2, 18));
        assert_eq!(level_for_total_xp(519), (3, 0));
    }

    #[test]
    fn test_level_brackets_hold_for_range() {
        for total in (0..20_000u64).step_by(7) {
            let (level, xp_in_level) = level_for_total_xp(total);
            assert!(level_floor(level) <= total);
            assert!(level_floor(level + 1) > total);
            assert_eq!(level_floor(level) + xp_in_level, total);
        }
    }

    #[test]
    fn test_progress_percentage_edges() {
        assert_eq!(progress_percentage(1, 0), 0.0);
        let full = level_floor(2) - level_floor(1);
        assert_eq!(progress_percentage(1, full), 100.0);
        assert_eq!(progress_percentage(1, full * 3), 100.0);
        // Level 1 spans the full 0..282 floor range
        assert_eq!(full, 282);
        assert!(progress_percentage(1, 182) < 100.0);

        let range = xp_required_for_level(3) - xp_required_for_level(2);
        let half = progress_percentage(2, range / 2);
        assert!((half - 50.0).abs() < 1.0, "got {}", half);
    }

    #[test]
    fn test_level_titles() {
        assert_eq!(level_title(1), "Shopper Novice");
        assert_eq!(level_title(5), "Deal Master");
        assert_eq!(level_title(10), "Ultimate Shopper");
        assert_eq!(level_title(11), "Shopping God (Lvl 11)");
        assert_eq!(level_title(0), "Shopping God (Lvl 0)");
    }

    #[test]
    fn test_completion_rule() {
        let ach = Achievement::new("products_5", AchievementCategory::Products, 150, 5);
        assert!(!completes(&ach, 0, 4));
        assert!(completes(&ach, 4, 1));
        assert!(completes(&ach, 2, 100));
        assert_eq!(clamp_progress(&ach, 100), 5);
        assert_eq!(clamp_progress(&ach, 3), 3);
    }

    #[test]
    fn test_snapshot() {
        let snap = LevelSnapshot::from_total_xp(300);
        assert_eq!(snap.level, 2);
        assert_eq!(snap.xp_in_level, 18);
        assert_eq!(snap.xp_to_next, 519 - 300);
        assert_eq!(snap.title, "Price Hunter");
    }
}
