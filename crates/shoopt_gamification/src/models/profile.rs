//! Per-user progression profile.

use crate::models::AchievementCategory;
use crate::progression::{self, LevelSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters that `ProfileStore::increment_counter` can bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileCounter {
    ProductsAdded,
    ShoppingSessions,
    AchievementsCompleted,
}

impl ProfileCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileCounter::ProductsAdded => "products_added",
            ProfileCounter::ShoppingSessions => "shopping_sessions",
            ProfileCounter::AchievementsCompleted => "achievements_completed",
        }
    }
}

impl fmt::Display for ProfileCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// XP, level and activity counters for one user.
///
/// `current_level` and `xp_in_current_level` are derived from `total_xp`;
/// every write path goes through [`UserProfile::set_total_xp`] to keep them
/// consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub total_xp: u64,
    pub current_level: u32,
    pub xp_in_current_level: u64,
    pub achievements_completed: u32,
    pub products_added: u32,
    pub shopping_sessions: u32,
    pub streak_days: u32,
    pub last_activity: DateTime<Utc>,
    pub profile_created_at: DateTime<Utc>,
    pub favorite_achievement_category: Option<AchievementCategory>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            total_xp: 0,
            current_level: 1,
            xp_in_current_level: 0,
            achievements_completed: 0,
            products_added: 0,
            shopping_sessions: 0,
            streak_days: 0,
            last_activity: now,
            profile_created_at: now,
            favorite_achievement_category: None,
        }
    }

    /// Replace total XP and recompute the derived level fields.
    pub fn set_total_xp(&mut self, total_xp: u64) {
        let (level, xp_in_level) = progression::level_for_total_xp(total_xp);
        self.total_xp = total_xp;
        self.current_level = level;
        self.xp_in_current_level = xp_in_level;
    }

    pub fn add_xp(&mut self, amount: u64) {
        self.set_total_xp(self.total_xp.saturating_add(amount));
    }

    pub fn increment(&mut self, counter: ProfileCounter) {
        let slot = match counter {
            ProfileCounter::ProductsAdded => &mut self.products_added,
            ProfileCounter::ShoppingSessions => &mut self.shopping_sessions,
            ProfileCounter::AchievementsCompleted => &mut self.achievements_completed,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn counter(&self, counter: ProfileCounter) -> u32 {
        match counter {
            ProfileCounter::ProductsAdded => self.products_added,
            ProfileCounter::ShoppingSessions => self.shopping_sessions,
            ProfileCounter::AchievementsCompleted => self.achievements_completed,
        }
    }

    /// Record activity at `now` and advance the daily streak.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let days_diff = (now.date_naive() - self.last_activity.date_naive()).num_days();

        if self.streak_days == 0 {
            self.streak_days = 1;
        } else if days_diff == 1 {
            self.streak_days += 1;
        } else if days_diff > 1 {
            self.streak_days = 1;
        }
        // Same day (or clock went backwards) = no change

        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Whether the derived level fields agree with `total_xp`.
    pub fn is_consistent(&self) -> bool {
        progression::level_for_total_xp(self.total_xp)
            == (self.current_level, self.xp_in_current_level)
    }

    pub fn progress_percentage(&self) -> f64 {
        progression::progress_percentage(self.current_level, self.xp_in_current_level)
    }

    pub fn level_title(&self) -> String {
        progression::level_title(self.current_level)
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot::from_total_xp(self.total_xp)
    }
}
