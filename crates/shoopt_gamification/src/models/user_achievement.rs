//! Per-user progress against one catalog achievement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievement {
    /// Composite key, `"{user_id}_{achievement_id}"`
    pub id: String,
    pub achievement_id: String,
    pub user_id: String,
    pub current_progress: u32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    /// Number of completion events; only exceeds 1 for repeatable achievements
    #[serde(default)]
    pub times_completed: u32,
}

impl UserAchievement {
    pub fn composite_id(user_id: &str, achievement_id: &str) -> String {
        format!("{}_{}", user_id, achievement_id)
    }

    pub fn new(user_id: &str, achievement_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::composite_id(user_id, achievement_id),
            achievement_id: achievement_id.to_string(),
            user_id: user_id.to_string(),
            current_progress: 0,
            is_completed: false,
            completed_at: None,
            last_updated: now,
            times_completed: 0,
        }
    }

    /// Completed at least once, including repeatables that were reset.
    pub fn ever_completed(&self) -> bool {
        self.is_completed || self.times_completed > 0
    }
}
