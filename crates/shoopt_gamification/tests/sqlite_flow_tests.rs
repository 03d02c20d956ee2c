//! End-to-end flows against a SQLite database file.

use shoopt_gamification::defaults::{default_achievements, seed_catalog};
use shoopt_gamification::{
    Achievement, AchievementCategory, DbLocation, GamificationConfig, GamificationError,
    GamificationEvent, GamificationNotice, GamificationService, GamificationStorage,
    SqliteStorage, StorageBackend,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> Arc<dyn GamificationStorage> {
    let storage = SqliteStorage::open(DbLocation::Custom(dir.path().join("g.db")))
        .await
        .unwrap();
    Arc::new(storage)
}

#[tokio::test]
async fn test_progress_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let storage = open(&dir).await;
        seed_catalog(storage.as_ref(), &default_achievements())
            .await
            .unwrap();
        let service = GamificationService::new(storage, &GamificationConfig::default());
        service
            .handle_event("alice", GamificationEvent::FirstProductAdded)
            .await
            .unwrap();
        service
            .handle_event("alice", GamificationEvent::ProductAdded)
            .await
            .unwrap();
    }

    let service = GamificationService::new(open(&dir).await, &GamificationConfig::default());
    let profile = service.profiles().require_profile("alice").await.unwrap();
    assert_eq!(profile.products_added, 2);
    assert_eq!(profile.total_xp, 100 + 100 + 25);
    assert_eq!(profile.current_level, 1);
    assert!(profile.is_consistent());

    let first = service
        .tracker()
        .get("alice", "first_product")
        .await
        .unwrap()
        .unwrap();
    assert!(first.is_completed);
    let five = service
        .tracker()
        .get("alice", "products_5")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(five.current_progress, 2);
    assert!(!five.is_completed);
}

#[tokio::test]
async fn test_open_from_config_seeds_catalog() {
    let dir = TempDir::new().unwrap();
    let mut config = GamificationConfig::default();
    config.storage.backend = StorageBackend::Sqlite;
    config.storage.path = Some(dir.path().join("data").join("g.db"));

    let service = GamificationService::open(&config).await.unwrap();
    let active = service.catalog().get_active().await.unwrap();
    assert_eq!(active.len(), default_achievements().len() - 1);

    // Reopening does not duplicate or overwrite
    drop(service);
    let service = GamificationService::open(&config).await.unwrap();
    assert_eq!(
        service.storage().list_achievements().await.unwrap().len(),
        default_achievements().len()
    );
}

#[tokio::test]
async fn test_repeatable_achievement_on_disk() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir).await;
    storage
        .upsert_achievements(&[
            Achievement::new("daily_scan", AchievementCategory::Exploration, 30, 2).repeatable()
        ])
        .await
        .unwrap();
    let service = GamificationService::new(storage, &GamificationConfig::default());
    let mut rx = service.subscribe();

    for _ in 0..4 {
        service.record_progress("bob", "daily_scan", 1).await.unwrap();
    }

    let record = service
        .tracker()
        .get("bob", "daily_scan")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.times_completed, 2);
    assert_eq!(record.current_progress, 0);
    assert!(!record.is_completed);
    assert!(record.completed_at.is_some());

    let profile = service.profiles().require_profile("bob").await.unwrap();
    assert_eq!(profile.total_xp, 60);
    assert_eq!(profile.achievements_completed, 2);
    assert_eq!(
        profile.favorite_achievement_category,
        Some(AchievementCategory::Exploration)
    );

    let unlocked = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|n| matches!(n, GamificationNotice::AchievementUnlocked { .. }))
        .count();
    assert_eq!(unlocked, 2);
}

#[tokio::test]
async fn test_errors_leave_state_untouched() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir).await;
    seed_catalog(storage.as_ref(), &default_achievements())
        .await
        .unwrap();
    let service = GamificationService::new(storage, &GamificationConfig::default());

    let err = service
        .record_progress("carol", "first_share", 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");

    let err = service
        .record_progress("carol", "first_product", -1)
        .await
        .unwrap_err();
    assert!(matches!(err, GamificationError::InvalidArgument(_)));

    let err = service.profiles().add_xp("carol", -5).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");

    assert!(service.profiles().get_profile("carol").await.unwrap().is_none());
    assert!(service.tracker().list_for_user("carol").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_users_are_isolated() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir).await;
    seed_catalog(storage.as_ref(), &default_achievements())
        .await
        .unwrap();
    let service = Arc::new(GamificationService::new(
        storage,
        &GamificationConfig::default(),
    ));

    let mut handles = Vec::new();
    for user in ["u1", "u2", "u3"] {
        for _ in 0..5 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .handle_event(user, GamificationEvent::ProductAdded)
                    .await
                    .unwrap();
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for user in ["u1", "u2", "u3"] {
        let profile = service.profiles().require_profile(user).await.unwrap();
        assert_eq!(profile.products_added, 5);
        // 5 * 25 event XP, first_product 100, products_5 150
        assert_eq!(profile.total_xp, 125 + 100 + 150);
        assert_eq!(profile.achievements_completed, 2);
    }
}
