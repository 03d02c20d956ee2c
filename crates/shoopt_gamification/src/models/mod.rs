//! Records persisted by the storage layer.

pub mod achievement;
pub mod profile;
pub mod user_achievement;

pub use achievement::{Achievement, AchievementCategory, AchievementDifficulty};
pub use profile::{ProfileCounter, UserProfile};
pub use user_achievement::UserAchievement;
