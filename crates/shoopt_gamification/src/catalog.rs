//! Read-only view over the achievement catalog.

use crate::error::Result;
use crate::models::{Achievement, AchievementCategory};
use crate::storage::GamificationStorage;
use std::sync::Arc;

pub struct AchievementCatalog {
    storage: Arc<dyn GamificationStorage>,
}

impl AchievementCatalog {
    pub fn new(storage: Arc<dyn GamificationStorage>) -> Self {
        Self { storage }
    }

    /// Active achievements, ordered by id
    pub async fn get_active(&self) -> Result<Vec<Achievement>> {
        Ok(self
            .storage
            .list_achievements()
            .await?
            .into_iter()
            .filter(|a| a.is_active)
            .collect())
    }

    /// Active achievements in `category`
    pub async fn get_by_category(&self, category: AchievementCategory) -> Result<Vec<Achievement>> {
        Ok(self
            .get_active()
            .await?
            .into_iter()
            .filter(|a| a.category == category)
            .collect())
    }

    /// Lookup regardless of the active flag
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Achievement>> {
        Ok(self.storage.get_achievement(id).await?)
    }
}
