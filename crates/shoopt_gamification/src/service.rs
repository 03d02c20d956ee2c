//! Event-driven entry point and composition root.
//!
//! ```text
//! client event
//!     │
//!     └─► GamificationService::handle_event
//!              ├─► ProfileStore        (event XP, counters)
//!              ├─► AchievementTracker  (threshold + one-shot achievements)
//!              └─► broadcast           (GamificationNotice subscribers)
//! ```

use crate::catalog::AchievementCatalog;
use crate::config::{GamificationConfig, RewardConfig};
use crate::defaults::{default_achievements, seed_catalog};
use crate::error::{GamificationError, Result};
use crate::locks::UserLocks;
use crate::models::{Achievement, AchievementCategory, ProfileCounter, UserProfile};
use crate::profile_store::{ProfileStore, XpAward};
use crate::progression::LevelSnapshot;
use crate::storage::GamificationStorage;
use crate::tracker::{AchievementTracker, ProgressOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Client actions that feed the gamification core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamificationEvent {
    FirstProductAdded,
    ProductAdded,
    ShoppingSessionCompleted,
    BarcodeScanned,
    PriceCompared,
}

impl GamificationEvent {
    pub const ALL: [GamificationEvent; 5] = [
        GamificationEvent::FirstProductAdded,
        GamificationEvent::ProductAdded,
        GamificationEvent::ShoppingSessionCompleted,
        GamificationEvent::BarcodeScanned,
        GamificationEvent::PriceCompared,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GamificationEvent::FirstProductAdded => "first_product_added",
            GamificationEvent::ProductAdded => "product_added",
            GamificationEvent::ShoppingSessionCompleted => "shopping_session_completed",
            GamificationEvent::BarcodeScanned => "barcode_scanned",
            GamificationEvent::PriceCompared => "price_compared",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL.into_iter().find(|e| e.as_str() == raw)
    }

    /// XP credited for the event itself
    pub fn reward(&self, rewards: &RewardConfig) -> u64 {
        match self {
            GamificationEvent::FirstProductAdded => rewards.first_product,
            GamificationEvent::ProductAdded => rewards.product_added,
            GamificationEvent::ShoppingSessionCompleted => rewards.shopping_session,
            GamificationEvent::BarcodeScanned => rewards.barcode_scan,
            GamificationEvent::PriceCompared => rewards.price_comparison,
        }
    }
}

impl fmt::Display for GamificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message sent to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GamificationNotice {
    AchievementUnlocked {
        user_id: String,
        achievement: Achievement,
    },
    LevelUp {
        user_id: String,
        previous_level: u32,
        new_level: u32,
    },
}

impl GamificationNotice {
    pub fn user_id(&self) -> &str {
        match self {
            GamificationNotice::AchievementUnlocked { user_id, .. }
            | GamificationNotice::LevelUp { user_id, .. } => user_id,
        }
    }
}

/// Summary of one handled event
#[derive(Debug, Clone, Serialize)]
pub struct EventOutcome {
    pub event: GamificationEvent,
    pub profile: UserProfile,
    /// Event XP plus achievement rewards
    pub xp_awarded: u64,
    pub unlocked: Vec<Achievement>,
    pub notices: Vec<GamificationNotice>,
}

pub struct GamificationService {
    storage: Arc<dyn GamificationStorage>,
    profiles: Arc<ProfileStore>,
    catalog: Arc<AchievementCatalog>,
    tracker: Arc<AchievementTracker>,
    rewards: RewardConfig,
    notices: broadcast::Sender<GamificationNotice>,
}

impl GamificationService {
    pub fn new(storage: Arc<dyn GamificationStorage>, config: &GamificationConfig) -> Self {
        let locks = Arc::new(UserLocks::new());
        let profiles = Arc::new(ProfileStore::new(Arc::clone(&storage), locks));
        let catalog = Arc::new(AchievementCatalog::new(Arc::clone(&storage)));
        let tracker = Arc::new(AchievementTracker::new(
            Arc::clone(&storage),
            Arc::clone(&catalog),
            Arc::clone(&profiles),
        ));
        let (notices, _) = broadcast::channel(config.notices.channel_capacity.max(1));

        Self {
            storage,
            profiles,
            catalog,
            tracker,
            rewards: config.rewards.clone(),
            notices,
        }
    }

    /// Open the configured storage and seed the default catalog into an
    /// empty one.
    pub async fn open(config: &GamificationConfig) -> anyhow::Result<Self> {
        let storage = config.storage.open().await?;
        if storage.list_achievements().await?.is_empty() {
            seed_catalog(storage.as_ref(), &default_achievements()).await?;
        }
        Ok(Self::new(storage, config))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GamificationNotice> {
        self.notices.subscribe()
    }

    pub fn storage(&self) -> &Arc<dyn GamificationStorage> {
        &self.storage
    }

    pub fn profiles(&self) -> &Arc<ProfileStore> {
        &self.profiles
    }

    pub fn catalog(&self) -> &Arc<AchievementCatalog> {
        &self.catalog
    }

    pub fn tracker(&self) -> &Arc<AchievementTracker> {
        &self.tracker
    }

    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }

    pub async fn handle_event(&self, user_id: &str, event: GamificationEvent) -> Result<EventOutcome> {
        if user_id.trim().is_empty() {
            return Err(GamificationError::InvalidArgument(
                "user id must not be empty".to_string(),
            ));
        }
        debug!("Handling {} for {}", event, user_id);

        let mut run = EventRun::default();

        match event {
            GamificationEvent::FirstProductAdded | GamificationEvent::ProductAdded => {
                let profile = self
                    .profiles
                    .increment_counter(user_id, ProfileCounter::ProductsAdded)
                    .await?;
                self.credit(user_id, event.reward(&self.rewards), &mut run).await?;
                self.sync_category(user_id, AchievementCategory::Products, profile.products_added, &mut run)
                    .await?;
            }
            GamificationEvent::ShoppingSessionCompleted => {
                let profile = self
                    .profiles
                    .increment_counter(user_id, ProfileCounter::ShoppingSessions)
                    .await?;
                self.credit(user_id, event.reward(&self.rewards), &mut run).await?;
                self.sync_category(
                    user_id,
                    AchievementCategory::Shopping,
                    profile.shopping_sessions,
                    &mut run,
                )
                .await?;
            }
            GamificationEvent::BarcodeScanned => {
                self.credit(user_id, event.reward(&self.rewards), &mut run).await?;
                self.one_shot(user_id, "first_barcode_scan", &mut run).await?;
            }
            GamificationEvent::PriceCompared => {
                self.credit(user_id, event.reward(&self.rewards), &mut run).await?;
                self.one_shot(user_id, "price_comparison", &mut run).await?;
            }
        }

        let profile = self.profiles.require_profile(user_id).await?;
        self.sync_category(
            user_id,
            AchievementCategory::Consistency,
            profile.streak_days,
            &mut run,
        )
        .await?;

        let profile = self.profiles.require_profile(user_id).await?;
        self.publish(&run.notices);

        Ok(EventOutcome {
            event,
            profile,
            xp_awarded: run.xp_awarded,
            unlocked: run.unlocked,
            notices: run.notices,
        })
    }

    /// Align `products_added` with the real product count and unlock any
    /// product thresholds it reaches.
    pub async fn sync_product_count(&self, user_id: &str, actual: u32) -> Result<Vec<GamificationNotice>> {
        let profile = self.profiles.sync_products_added(user_id, actual).await?;
        let mut run = EventRun::default();
        self.sync_category(user_id, AchievementCategory::Products, profile.products_added, &mut run)
            .await?;
        self.publish(&run.notices);
        Ok(run.notices)
    }

    /// Add progress on one achievement and publish the resulting notices.
    pub async fn record_progress(
        &self,
        user_id: &str,
        achievement_id: &str,
        delta: i64,
    ) -> Result<ProgressOutcome> {
        let outcome = self
            .tracker
            .record_progress_detailed(user_id, achievement_id, delta)
            .await?;
        let mut run = EventRun::default();
        run.absorb(user_id, &outcome);
        self.publish(&run.notices);
        Ok(outcome)
    }

    /// Level view for a user; a user without a profile is at level 1.
    pub async fn level_snapshot(&self, user_id: &str) -> Result<LevelSnapshot> {
        let total_xp = self
            .profiles
            .get_profile(user_id)
            .await?
            .map(|p| p.total_xp)
            .unwrap_or(0);
        Ok(LevelSnapshot::from_total_xp(total_xp))
    }

    pub async fn delete_user_data(&self, user_id: &str) -> Result<()> {
        self.tracker.delete_for_user(user_id).await?;
        self.profiles.delete_profile(user_id).await?;
        info!("Removed gamification data for {}", user_id);
        Ok(())
    }

    async fn credit(&self, user_id: &str, amount: u64, run: &mut EventRun) -> Result<()> {
        let amount = i64::try_from(amount).map_err(|_| {
            GamificationError::InvalidArgument(format!("reward {} out of range", amount))
        })?;
        let award = self.profiles.add_xp(user_id, amount).await?;
        run.credit(user_id, &award);
        Ok(())
    }

    async fn sync_category(
        &self,
        user_id: &str,
        category: AchievementCategory,
        value: u32,
        run: &mut EventRun,
    ) -> Result<()> {
        for achievement in self.catalog.get_by_category(category).await? {
            let outcome = self
                .tracker
                .sync_progress(user_id, &achievement.id, value)
                .await?;
            run.absorb(user_id, &outcome);
        }
        Ok(())
    }

    /// Progress an achievement that completes on first occurrence. Missing or
    /// disabled entries are skipped.
    async fn one_shot(&self, user_id: &str, achievement_id: &str, run: &mut EventRun) -> Result<()> {
        match self
            .tracker
            .record_progress_detailed(user_id, achievement_id, 1)
            .await
        {
            Ok(outcome) => {
                run.absorb(user_id, &outcome);
                Ok(())
            }
            Err(GamificationError::NotFound(reason)) => {
                debug!("Skipping {}: {}", achievement_id, reason);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn publish(&self, notices: &[GamificationNotice]) {
        for notice in notices {
            if self.notices.send(notice.clone()).is_err() {
                debug!("No notice subscribers for {}", notice.user_id());
            }
        }
    }
}

#[derive(Default)]
struct EventRun {
    xp_awarded: u64,
    unlocked: Vec<Achievement>,
    notices: Vec<GamificationNotice>,
}

impl EventRun {
    fn credit(&mut self, user_id: &str, award: &XpAward) {
        self.xp_awarded = self.xp_awarded.saturating_add(award.xp_added);
        if award.leveled_up() {
            self.notices.push(GamificationNotice::LevelUp {
                user_id: user_id.to_string(),
                previous_level: award.previous_level,
                new_level: award.profile.current_level,
            });
        }
    }

    fn absorb(&mut self, user_id: &str, outcome: &ProgressOutcome) {
        if !outcome.completed {
            return;
        }
        self.unlocked.push(outcome.achievement.clone());
        self.notices.push(GamificationNotice::AchievementUnlocked {
            user_id: user_id.to_string(),
            achievement: outcome.achievement.clone(),
        });
        if let Some(award) = &outcome.award {
            self.credit(user_id, award);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    async fn service() -> GamificationService {
        let storage: Arc<dyn GamificationStorage> = Arc::new(MemoryStorage::new());
        seed_catalog(storage.as_ref(), &default_achievements())
            .await
            .unwrap();
        GamificationService::new(storage, &GamificationConfig::default())
    }

    #[test]
    fn test_event_parse() {
        for event in GamificationEvent::ALL {
            assert_eq!(GamificationEvent::parse(event.as_str()), Some(event));
        }
        assert_eq!(
            GamificationEvent::parse("Barcode-Scanned"),
            Some(GamificationEvent::BarcodeScanned)
        );
        assert_eq!(GamificationEvent::parse("unknown"), None);
    }

    #[tokio::test]
    async fn test_first_product_unlocks_and_credits() {
        let service = service().await;
        let outcome = service
            .handle_event("u", GamificationEvent::FirstProductAdded)
            .await
            .unwrap();

        // 100 event XP + 100 from first_product
        assert_eq!(outcome.xp_awarded, 200);
        assert_eq!(outcome.profile.total_xp, 200);
        assert_eq!(outcome.profile.products_added, 1);
        assert_eq!(outcome.profile.achievements_completed, 1);
        assert_eq!(outcome.unlocked.len(), 1);
        assert_eq!(outcome.unlocked[0].id, "first_product");
    }

    #[tokio::test]
    async fn test_product_thresholds_unlock_once() {
        let service = service().await;
        service
            .handle_event("u", GamificationEvent::FirstProductAdded)
            .await
            .unwrap();
        let mut unlocked = Vec::new();
        for _ in 0..4 {
            let outcome = service
                .handle_event("u", GamificationEvent::ProductAdded)
                .await
                .unwrap();
            unlocked.extend(outcome.unlocked.into_iter().map(|a| a.id));
        }
        assert_eq!(unlocked, vec!["products_5".to_string()]);

        let outcome = service
            .handle_event("u", GamificationEvent::ProductAdded)
            .await
            .unwrap();
        assert!(outcome.unlocked.is_empty());

        let profile = service.profiles().require_profile("u").await.unwrap();
        // event XP for 1 first + 5 regular, then first_product and products_5
        assert_eq!(profile.total_xp, 100 + 5 * 25 + 100 + 150);
        assert_eq!(profile.achievements_completed, 2);
    }

    #[tokio::test]
    async fn test_one_shot_events() {
        let service = service().await;
        let first = service
            .handle_event("u", GamificationEvent::BarcodeScanned)
            .await
            .unwrap();
        assert_eq!(first.xp_awarded, 10 + 50);

        let second = service
            .handle_event("u", GamificationEvent::BarcodeScanned)
            .await
            .unwrap();
        assert_eq!(second.xp_awarded, 10);
        assert!(second.unlocked.is_empty());

        let compared = service
            .handle_event("u", GamificationEvent::PriceCompared)
            .await
            .unwrap();
        assert_eq!(compared.xp_awarded, 15 + 100);
    }

    #[tokio::test]
    async fn test_notices_broadcast() {
        let service = service().await;
        let mut rx = service.subscribe();

        service
            .handle_event("u", GamificationEvent::ShoppingSessionCompleted)
            .await
            .unwrap();

        // 50 event XP + 75 first session: no level up yet
        let notice = rx.try_recv().unwrap();
        match notice {
            GamificationNotice::AchievementUnlocked { user_id, achievement } => {
                assert_eq!(user_id, "u");
                assert_eq!(achievement.id, "first_shopping_session");
            }
            other => panic!("unexpected notice {:?}", other),
        }
        assert!(rx.try_recv().is_err());

        // 100 event XP + 100 first product crosses 282
        service
            .handle_event("u", GamificationEvent::FirstProductAdded)
            .await
            .unwrap();
        let notices: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(notices.contains(&GamificationNotice::LevelUp {
            user_id: "u".to_string(),
            previous_level: 1,
            new_level: 2,
        }));
    }

    #[tokio::test]
    async fn test_no_subscribers_is_fine() {
        let service = service().await;
        let outcome = service
            .handle_event("u", GamificationEvent::FirstProductAdded)
            .await
            .unwrap();
        assert!(!outcome.notices.is_empty());
    }

    #[tokio::test]
    async fn test_sync_product_count() {
        let service = service().await;
        let notices = service.sync_product_count("u", 12).await.unwrap();
        let ids: Vec<_> = notices
            .iter()
            .filter_map(|n| match n {
                GamificationNotice::AchievementUnlocked { achievement, .. } => {
                    Some(achievement.id.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["first_product", "products_10", "products_5"]);

        let profile = service.profiles().require_profile("u").await.unwrap();
        assert_eq!(profile.products_added, 12);
        assert_eq!(profile.total_xp, 100 + 250 + 150);
    }

    #[tokio::test]
    async fn test_empty_user_rejected() {
        let service = service().await;
        let err = service
            .handle_event("  ", GamificationEvent::ProductAdded)
            .await
            .unwrap_err();
        assert!(matches!(err, GamificationError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_delete_user_data() {
        let service = service().await;
        service
            .handle_event("u", GamificationEvent::FirstProductAdded)
            .await
            .unwrap();
        service.delete_user_data("u").await.unwrap();

        assert!(service.profiles().get_profile("u").await.unwrap().is_none());
        assert!(service.tracker().list_for_user("u").await.unwrap().is_empty());
        assert_eq!(service.level_snapshot("u").await.unwrap().level, 1);
    }
}
