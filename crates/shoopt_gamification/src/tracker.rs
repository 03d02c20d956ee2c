//! Per-user achievement progress.
//!
//! A progress write, the completion it may trigger, the XP credit and the
//! `achievements_completed` bump all happen while the user's lock is held.
//! The completed row and the credited profile go to storage in one
//! `apply_completion` call, so each completion is credited exactly once.

use crate::catalog::AchievementCatalog;
use crate::error::{GamificationError, Result};
use crate::locks::UserGuard;
use crate::models::{Achievement, AchievementCategory, ProfileCounter, UserAchievement};
use crate::profile_store::{ProfileStore, XpAward};
use crate::progression;
use crate::storage::GamificationStorage;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// What a single progress update did.
#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    pub record: UserAchievement,
    pub achievement: Achievement,
    /// A completion happened during this call
    pub completed: bool,
    /// XP credit for that completion
    pub award: Option<XpAward>,
}

pub struct AchievementTracker {
    storage: Arc<dyn GamificationStorage>,
    catalog: Arc<AchievementCatalog>,
    profiles: Arc<ProfileStore>,
}

impl AchievementTracker {
    pub fn new(
        storage: Arc<dyn GamificationStorage>,
        catalog: Arc<AchievementCatalog>,
        profiles: Arc<ProfileStore>,
    ) -> Self {
        Self {
            storage,
            catalog,
            profiles,
        }
    }

    /// Add `delta` to the user's progress on `achievement_id`.
    pub async fn record_progress(
        &self,
        user_id: &str,
        achievement_id: &str,
        delta: i64,
    ) -> Result<UserAchievement> {
        Ok(self
            .record_progress_detailed(user_id, achievement_id, delta)
            .await?
            .record)
    }

    pub async fn record_progress_detailed(
        &self,
        user_id: &str,
        achievement_id: &str,
        delta: i64,
    ) -> Result<ProgressOutcome> {
        if delta <= 0 {
            return Err(GamificationError::InvalidArgument(format!(
                "progress delta must be positive, got {}",
                delta
            )));
        }
        let achievement = self.resolve(achievement_id).await?;
        let guard = self.profiles.locks().lock(user_id).await;
        self.apply_locked(&guard, achievement, delta as u64).await
    }

    /// Raise progress to `absolute` (clamped to the target) when it is ahead
    /// of the stored value. Used for achievements that mirror a profile
    /// counter. Repeatable achievements receive the positive difference as a
    /// regular delta.
    pub async fn sync_progress(
        &self,
        user_id: &str,
        achievement_id: &str,
        absolute: u32,
    ) -> Result<ProgressOutcome> {
        let achievement = self.resolve(achievement_id).await?;
        let guard = self.profiles.locks().lock(user_id).await;
        let record = self.load_or_new(&guard, &achievement).await?;

        let target = progression::clamp_progress(&achievement, absolute as u64);
        let ahead = target > record.current_progress;
        if !ahead || (record.is_completed && !achievement.is_repeatable) {
            return Ok(ProgressOutcome {
                record,
                achievement,
                completed: false,
                award: None,
            });
        }
        let delta = (target - record.current_progress) as u64;
        self.apply_locked(&guard, achievement, delta).await
    }

    pub async fn get(&self, user_id: &str, achievement_id: &str) -> Result<Option<UserAchievement>> {
        Ok(self
            .storage
            .get_user_achievement(user_id, achievement_id)
            .await?)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserAchievement>> {
        Ok(self.storage.list_user_achievements(user_id).await?)
    }

    /// Records completed at least once (repeatables included after reset)
    pub async fn completed_for_user(&self, user_id: &str) -> Result<Vec<UserAchievement>> {
        Ok(self
            .list_for_user(user_id)
            .await?
            .into_iter()
            .filter(UserAchievement::ever_completed)
            .collect())
    }

    pub async fn in_progress_for_user(&self, user_id: &str) -> Result<Vec<UserAchievement>> {
        Ok(self
            .list_for_user(user_id)
            .await?
            .into_iter()
            .filter(|r| !r.is_completed)
            .collect())
    }

    /// Share of active achievements completed, 0.0 - 100.0
    pub async fn completion_percentage(&self, user_id: &str) -> Result<f64> {
        let active = self.catalog.get_active().await?;
        if active.is_empty() {
            return Ok(0.0);
        }
        let completed = self.completed_for_user(user_id).await?;
        let done = active
            .iter()
            .filter(|a| completed.iter().any(|r| r.achievement_id == a.id))
            .count();
        Ok(done as f64 / active.len() as f64 * 100.0)
    }

    pub async fn delete_for_user(&self, user_id: &str) -> Result<()> {
        let _guard = self.profiles.locks().lock(user_id).await;
        self.storage.delete_user_achievements(user_id).await?;
        Ok(())
    }

    async fn resolve(&self, achievement_id: &str) -> Result<Achievement> {
        match self.catalog.get_by_id(achievement_id).await? {
            Some(a) if a.is_active => Ok(a),
            Some(_) => Err(GamificationError::NotFound(format!(
                "achievement '{}' is not active",
                achievement_id
            ))),
            None => Err(GamificationError::NotFound(format!(
                "achievement '{}'",
                achievement_id
            ))),
        }
    }

    async fn load_or_new(
        &self,
        guard: &UserGuard,
        achievement: &Achievement,
    ) -> Result<UserAchievement> {
        Ok(self
            .storage
            .get_user_achievement(guard.user_id(), &achievement.id)
            .await?
            .unwrap_or_else(|| UserAchievement::new(guard.user_id(), &achievement.id, Utc::now())))
    }

    async fn apply_locked(
        &self,
        guard: &UserGuard,
        achievement: Achievement,
        delta: u64,
    ) -> Result<ProgressOutcome> {
        let user_id = guard.user_id();
        let mut record = self.load_or_new(guard, &achievement).await?;

        if record.is_completed && !achievement.is_repeatable {
            debug!("{} already completed {}, ignoring progress", user_id, achievement.id);
            return Ok(ProgressOutcome {
                record,
                achievement,
                completed: false,
                award: None,
            });
        }

        let now = Utc::now();
        let completes = progression::completes(&achievement, record.current_progress, delta);
        record.current_progress = progression::clamp_progress(
            &achievement,
            (record.current_progress as u64).saturating_add(delta),
        );
        record.last_updated = now;

        if !completes {
            self.storage.upsert_user_achievement(&record).await?;
            debug!(
                "{} progress on {}: {}/{}",
                user_id,
                achievement.id,
                record.current_progress,
                achievement.target()
            );
            return Ok(ProgressOutcome {
                record,
                achievement,
                completed: false,
                award: None,
            });
        }

        record.is_completed = true;
        record.completed_at = Some(now);
        record.times_completed = record.times_completed.saturating_add(1);
        if achievement.is_repeatable {
            record.current_progress = 0;
            record.is_completed = false;
        }
        let mut profile = self.profiles.ensure_locked(guard).await?;
        let previous_level = profile.current_level;
        profile.add_xp(achievement.xp_reward);
        profile.increment(ProfileCounter::AchievementsCompleted);
        profile.touch(now);
        if let Some(favorite) = self
            .favorite_category(&record, profile.favorite_achievement_category)
            .await?
        {
            profile.favorite_achievement_category = Some(favorite);
        }

        // Row and reward land together; a failed write leaves the row
        // incomplete so a retry completes and credits again.
        self.storage.apply_completion(&record, &profile).await?;

        let award = XpAward {
            profile,
            previous_level,
            xp_added: achievement.xp_reward,
        };
        if award.leveled_up() {
            info!(
                "{} leveled up: {} -> {}",
                user_id, previous_level, award.profile.current_level
            );
        }
        info!(
            "{} completed achievement {} (+{} XP, completion #{})",
            user_id, achievement.id, achievement.xp_reward, record.times_completed
        );

        Ok(ProgressOutcome {
            record,
            achievement,
            completed: true,
            award: Some(award),
        })
    }

    /// Favorite category once `pending` is counted in place of its stored row.
    async fn favorite_category(
        &self,
        pending: &UserAchievement,
        current: Option<AchievementCategory>,
    ) -> Result<Option<AchievementCategory>> {
        let records = self.storage.list_user_achievements(&pending.user_id).await?;
        let catalog = self.storage.list_achievements().await?;
        let categories: HashMap<&str, AchievementCategory> = catalog
            .iter()
            .map(|a| (a.id.as_str(), a.category))
            .collect();
        let completed = records
            .iter()
            .filter(|r| r.achievement_id != pending.achievement_id)
            .chain(std::iter::once(pending))
            .filter(|r| r.ever_completed())
            .filter_map(|r| categories.get(r.achievement_id.as_str()).copied());
        Ok(pick_favorite(completed, current))
    }
}

/// Category with the most completions. Ties keep `current`.
pub fn pick_favorite(
    completed: impl IntoIterator<Item = AchievementCategory>,
    current: Option<AchievementCategory>,
) -> Option<AchievementCategory> {
    let mut counts: HashMap<AchievementCategory, usize> = HashMap::new();
    for category in completed {
        *counts.entry(category).or_insert(0) += 1;
    }
    let best = counts.values().copied().max()?;

    if let Some(current) = current {
        if counts.get(&current).copied() == Some(best) {
            return Some(current);
        }
    }
    // Deterministic among equal counts: catalog declaration order
    AchievementCategory::ALL
        .into_iter()
        .find(|c| counts.get(c).copied() == Some(best))
}
