//! Storage collaborator abstraction.
//!
//! The core only ever talks to storage through [`GamificationStorage`], so
//! production code can use [`SqliteStorage`] and tests can use
//! [`MemoryStorage`] without touching the disk.
//!
//! Backends are plain CRUD. Read-modify-write atomicity (XP credits, counter
//! bumps, progress updates) is provided above this layer by
//! [`crate::locks::UserLocks`].

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::{DbLocation, SqliteStorage};

use crate::error::StorageError;
use crate::models::{Achievement, UserAchievement, UserProfile};
use async_trait::async_trait;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait GamificationStorage: Send + Sync {
    // Profiles
    async fn get_profile(&self, user_id: &str) -> StorageResult<Option<UserProfile>>;
    async fn upsert_profile(&self, profile: &UserProfile) -> StorageResult<()>;
    async fn delete_profile(&self, user_id: &str) -> StorageResult<()>;

    // Catalog
    async fn get_achievement(&self, id: &str) -> StorageResult<Option<Achievement>>;
    /// All achievements, active or not, ordered by id
    async fn list_achievements(&self) -> StorageResult<Vec<Achievement>>;
    async fn upsert_achievements(&self, achievements: &[Achievement]) -> StorageResult<()>;

    // Progress
    async fn get_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> StorageResult<Option<UserAchievement>>;
    async fn list_user_achievements(&self, user_id: &str) -> StorageResult<Vec<UserAchievement>>;
    async fn upsert_user_achievement(&self, record: &UserAchievement) -> StorageResult<()>;
    async fn delete_user_achievements(&self, user_id: &str) -> StorageResult<()>;

    /// Persist a completed progress row together with the credited profile.
    /// Either both writes land or neither does.
    async fn apply_completion(
        &self,
        record: &UserAchievement,
        profile: &UserProfile,
    ) -> StorageResult<()>;
}
