//! In-memory storage backend.

use super::{GamificationStorage, StorageResult};
use crate::models::{Achievement, UserAchievement, UserProfile};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, UserProfile>,
    achievements: BTreeMap<String, Achievement>,
    /// Keyed by (user_id, achievement_id)
    user_achievements: BTreeMap<(String, String), UserAchievement>,
}

/// HashMap-backed storage. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl GamificationStorage for MemoryStorage {
    async fn get_profile(&self, user_id: &str) -> StorageResult<Option<UserProfile>> {
        Ok(self.read().profiles.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> StorageResult<()> {
        self.write()
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> StorageResult<()> {
        self.write().profiles.remove(user_id);
        Ok(())
    }

    async fn get_achievement(&self, id: &str) -> StorageResult<Option<Achievement>> {
        Ok(self.read().achievements.get(id).cloned())
    }

    async fn list_achievements(&self) -> StorageResult<Vec<Achievement>> {
        Ok(self.read().achievements.values().cloned().collect())
    }

    async fn upsert_achievements(&self, achievements: &[Achievement]) -> StorageResult<()> {
        let mut tables = self.write();
        for achievement in achievements {
            tables
                .achievements
                .insert(achievement.id.clone(), achievement.clone());
        }
        Ok(())
    }

    async fn get_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> StorageResult<Option<UserAchievement>> {
        let key = (user_id.to_string(), achievement_id.to_string());
        Ok(self.read().user_achievements.get(&key).cloned())
    }

    async fn list_user_achievements(&self, user_id: &str) -> StorageResult<Vec<UserAchievement>> {
        Ok(self
            .read()
            .user_achievements
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_user_achievement(&self, record: &UserAchievement) -> StorageResult<()> {
        let key = (record.user_id.clone(), record.achievement_id.clone());
        self.write().user_achievements.insert(key, record.clone());
        Ok(())
    }

    async fn delete_user_achievements(&self, user_id: &str) -> StorageResult<()> {
        self.write()
            .user_achievements
            .retain(|_, r| r.user_id != user_id);
        Ok(())
    }

    async fn apply_completion(
        &self,
        record: &UserAchievement,
        profile: &UserProfile,
    ) -> StorageResult<()> {
        let mut tables = self.write();
        tables.user_achievements.insert(
            (record.user_id.clone(), record.achievement_id.clone()),
            record.clone(),
        );
        tables
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}
