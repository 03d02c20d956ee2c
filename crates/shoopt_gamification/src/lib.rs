//! Shoopt gamification core.
//!
//! Experience points and achievements for Shoopt users. Build a
//! [`GamificationService`] over a [`storage::GamificationStorage`] backend and
//! feed it [`GamificationEvent`]s; level math lives in [`progression`] and has
//! no I/O.

pub mod catalog;
pub mod config;
pub mod defaults;
pub mod error;
pub mod locks;
pub mod models;
pub mod profile_store;
pub mod progression;
pub mod service;
pub mod storage;
pub mod tracker;

pub use catalog::AchievementCatalog;
pub use config::{GamificationConfig, NoticeConfig, RewardConfig, StorageBackend, StorageConfig};
pub use error::{GamificationError, Result, StorageError};
pub use locks::{UserGuard, UserLocks};
pub use models::{
    Achievement, AchievementCategory, AchievementDifficulty, ProfileCounter, UserAchievement,
    UserProfile,
};
pub use profile_store::{ProfileStore, XpAward};
pub use progression::LevelSnapshot;
pub use service::{EventOutcome, GamificationEvent, GamificationNotice, GamificationService};
pub use storage::{DbLocation, GamificationStorage, MemoryStorage, SqliteStorage};
pub use tracker::{AchievementTracker, ProgressOutcome};
