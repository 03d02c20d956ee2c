//! Profile persistence with serialized per-user updates.

use crate::error::{GamificationError, Result};
use crate::locks::{UserGuard, UserLocks};
use crate::models::{ProfileCounter, UserProfile};
use crate::storage::GamificationStorage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of an XP credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpAward {
    pub profile: UserProfile,
    pub previous_level: u32,
    pub xp_added: u64,
}

impl XpAward {
    pub fn leveled_up(&self) -> bool {
        self.profile.current_level > self.previous_level
    }
}

pub struct ProfileStore {
    storage: Arc<dyn GamificationStorage>,
    locks: Arc<UserLocks>,
}

impl ProfileStore {
    pub fn new(storage: Arc<dyn GamificationStorage>, locks: Arc<UserLocks>) -> Self {
        Self { storage, locks }
    }

    pub fn locks(&self) -> &Arc<UserLocks> {
        &self.locks
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.storage.get_profile(user_id).await?)
    }

    /// Read-only access that treats a missing profile as an error.
    pub async fn require_profile(&self, user_id: &str) -> Result<UserProfile> {
        self.get_profile(user_id)
            .await?
            .ok_or_else(|| GamificationError::NotFound(format!("profile '{}'", user_id)))
    }

    pub async fn ensure_profile(&self, user_id: &str) -> Result<UserProfile> {
        if let Some(profile) = self.storage.get_profile(user_id).await? {
            return Ok(profile);
        }
        let guard = self.locks.lock(user_id).await;
        self.ensure_locked(&guard).await
    }

    /// Credit `amount` XP. Negative amounts are rejected before any write.
    pub async fn add_xp(&self, user_id: &str, amount: i64) -> Result<XpAward> {
        let amount = validate_xp(amount)?;
        let guard = self.locks.lock(user_id).await;
        self.add_xp_locked(&guard, amount).await
    }

    pub async fn increment_counter(
        &self,
        user_id: &str,
        counter: ProfileCounter,
    ) -> Result<UserProfile> {
        let guard = self.locks.lock(user_id).await;
        self.increment_counter_locked(&guard, counter).await
    }

    /// Raise `products_added` to `actual` when the real product count is
    /// higher. Never lowers the counter.
    pub async fn sync_products_added(&self, user_id: &str, actual: u32) -> Result<UserProfile> {
        let guard = self.locks.lock(user_id).await;
        let mut profile = self.ensure_locked(&guard).await?;
        if actual <= profile.products_added {
            return Ok(profile);
        }
        debug!(
            "Synchronizing products for {}: {} -> {}",
            user_id, profile.products_added, actual
        );
        profile.products_added = actual;
        profile.touch(Utc::now());
        self.storage.upsert_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn delete_profile(&self, user_id: &str) -> Result<()> {
        let _guard = self.locks.lock(user_id).await;
        self.storage.delete_profile(user_id).await?;
        info!("Deleted profile for {}", user_id);
        Ok(())
    }

    // Callers below already hold the user's lock.

    pub(crate) async fn ensure_locked(&self, guard: &UserGuard) -> Result<UserProfile> {
        let user_id = guard.user_id();
        if let Some(profile) = self.storage.get_profile(user_id).await? {
            return Ok(profile);
        }
        let profile = UserProfile::new(user_id, Utc::now());
        self.storage.upsert_profile(&profile).await?;
        info!("Created gamification profile for {}", user_id);
        Ok(profile)
    }

    async fn add_xp_locked(&self, guard: &UserGuard, amount: u64) -> Result<XpAward> {
        let mut profile = self.ensure_locked(guard).await?;
        let previous_level = profile.current_level;

        profile.add_xp(amount);
        profile.touch(Utc::now());
        self.storage.upsert_profile(&profile).await?;

        let award = XpAward {
            profile,
            previous_level,
            xp_added: amount,
        };
        if award.leveled_up() {
            info!(
                "{} leveled up: {} -> {}",
                guard.user_id(),
                previous_level,
                award.profile.current_level
            );
        } else {
            debug!("{} +{} XP (total {})", guard.user_id(), amount, award.profile.total_xp);
        }
        Ok(award)
    }

    async fn increment_counter_locked(
        &self,
        guard: &UserGuard,
        counter: ProfileCounter,
    ) -> Result<UserProfile> {
        let mut profile = self.ensure_locked(guard).await?;
        profile.increment(counter);
        profile.touch(Utc::now());
        self.storage.upsert_profile(&profile).await?;
        debug!("{} {} -> {}", guard.user_id(), counter, profile.counter(counter));
        Ok(profile)
    }
}

fn validate_xp(amount: i64) -> Result<u64> {
    u64::try_from(amount).map_err(|_| {
        GamificationError::InvalidArgument(format!("XP amount must not be negative, got {}", amount))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> ProfileStore {
        ProfileStore::new(Arc::new(MemoryStorage::new()), Arc::new(UserLocks::new()))
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_once() {
        let store = store();
        assert!(store.get_profile("u").await.unwrap().is_none());

        let created = store.ensure_profile("u").await.unwrap();
        assert_eq!(created.current_level, 1);

        let again = store.ensure_profile("u").await.unwrap();
        assert_eq!(again.profile_created_at, created.profile_created_at);
    }

    #[tokio::test]
    async fn test_require_profile_not_found() {
        let store = store();
        let err = store.require_profile("ghost").await.unwrap_err();
        assert!(matches!(err, GamificationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_xp_negative_rejected_without_write() {
        let store = store();
        store.add_xp("u", 40).await.unwrap();
        let before = store.get_profile("u").await.unwrap().unwrap();

        let err = store.add_xp("u", -5).await.unwrap_err();
        assert!(matches!(err, GamificationError::InvalidArgument(_)));

        let after = store.get_profile("u").await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_add_xp_levels_up() {
        let store = store();
        let award = store.add_xp("u", 250).await.unwrap();
        assert!(!award.leveled_up());

        let award = store.add_xp("u", 40).await.unwrap();
        assert!(award.leveled_up());
        assert_eq!(award.previous_level, 1);
        assert_eq!(award.profile.current_level, 2);
        assert_eq!(award.profile.xp_in_current_level, 290 - 282);
        assert!(award.profile.is_consistent());
    }

    #[tokio::test]
    async fn test_add_zero_xp_touches_only() {
        let store = store();
        let award = store.add_xp("u", 0).await.unwrap();
        assert_eq!(award.profile.total_xp, 0);
        assert_eq!(award.profile.streak_days, 1);
    }

    #[tokio::test]
    async fn test_increment_counters() {
        let store = store();
        store
            .increment_counter("u", ProfileCounter::ProductsAdded)
            .await
            .unwrap();
        let profile = store
            .increment_counter("u", ProfileCounter::ProductsAdded)
            .await
            .unwrap();
        assert_eq!(profile.products_added, 2);
        assert_eq!(profile.shopping_sessions, 0);
    }

    #[tokio::test]
    async fn test_sync_products_never_lowers() {
        let store = store();
        let profile = store.sync_products_added("u", 7).await.unwrap();
        assert_eq!(profile.products_added, 7);
        let profile = store.sync_products_added("u", 3).await.unwrap();
        assert_eq!(profile.products_added, 7);
    }

    #[tokio::test]
    async fn test_concurrent_xp_credits_are_not_lost() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.add_xp("busy", 10).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let profile = store.get_profile("busy").await.unwrap().unwrap();
        assert_eq!(profile.total_xp, 500);
        assert!(profile.is_consistent());
    }

    #[tokio::test]
    async fn test_lock_registry_empties_after_updates() {
        let store = store();
        for user in ["a", "b", "c"] {
            store.add_xp(user, 5).await.unwrap();
            store
                .increment_counter(user, ProfileCounter::ShoppingSessions)
                .await
                .unwrap();
        }
        store.sync_products_added("a", 4).await.unwrap();
        assert!(store.locks().is_empty());
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let store = store();
        store.ensure_profile("u").await.unwrap();
        store.delete_profile("u").await.unwrap();
        assert!(store.get_profile("u").await.unwrap().is_none());
    }
}
