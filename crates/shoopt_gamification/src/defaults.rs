//! Default achievement catalog and the seeding helper.

use crate::error::Result;
use crate::models::{Achievement, AchievementCategory as C, AchievementDifficulty as D};
use crate::storage::GamificationStorage;
use tracing::info;

pub fn default_achievements() -> Vec<Achievement> {
    vec![
        // Products
        Achievement::new("first_product", C::Products, 100, 1)
            .with_text("First Step", "Add your first product")
            .with_icon("ic_first_product"),
        Achievement::new("products_5", C::Products, 150, 5)
            .with_text("Collector", "Add 5 products")
            .with_icon("ic_collection"),
        Achievement::new("products_10", C::Products, 250, 10)
            .with_text("Price Hunter", "Add 10 products")
            .with_icon("ic_price_hunter")
            .with_difficulty(D::Medium),
        Achievement::new("products_25", C::Products, 400, 25)
            .with_text("Shopping Expert", "Add 25 products")
            .with_icon("ic_expert")
            .with_difficulty(D::Medium),
        Achievement::new("products_50", C::Products, 600, 50)
            .with_text("Bargain Master", "Add 50 products")
            .with_icon("ic_master")
            .with_difficulty(D::Hard),
        Achievement::new("products_100", C::Products, 1000, 100)
            .with_text("Shopping Legend", "Add 100 products")
            .with_icon("ic_legend")
            .with_difficulty(D::Epic),
        // Shopping
        Achievement::new("first_shopping_session", C::Shopping, 75, 1)
            .with_text("First Trip", "Finish your first shopping session")
            .with_icon("ic_shopping_cart"),
        Achievement::new("shopping_sessions_5", C::Shopping, 200, 5)
            .with_text("Regular Shopper", "Finish 5 shopping sessions")
            .with_icon("ic_shopping_regular")
            .with_difficulty(D::Medium),
        // Exploration
        Achievement::new("first_barcode_scan", C::Exploration, 50, 1)
            .with_text("Scanner Novice", "Scan your first barcode")
            .with_icon("ic_barcode"),
        Achievement::new("price_comparison", C::Exploration, 100, 1)
            .with_text("Comparer", "Compare prices across products")
            .with_icon("ic_compare"),
        // Consistency
        Achievement::new("weekly_user", C::Consistency, 300, 7)
            .with_text("Regular User", "Use the app 7 days in a row")
            .with_icon("ic_calendar")
            .with_difficulty(D::Medium),
        // Social, not live yet
        Achievement::new("first_share", C::Social, 75, 1)
            .with_text("Sharer", "Share your first find")
            .with_icon("ic_share")
            .inactive(),
    ]
}

/// Write `achievements` into the catalog, replacing entries with the same id.
pub async fn seed_catalog(
    storage: &dyn GamificationStorage,
    achievements: &[Achievement],
) -> Result<usize> {
    storage.upsert_achievements(achievements).await?;
    info!("Seeded {} achievements", achievements.len());
    Ok(achievements.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_ids_unique() {
        let defaults = default_achievements();
        let ids: HashSet<_> = defaults.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), defaults.len());
    }

    #[test]
    fn test_defaults_are_well_formed() {
        for achievement in default_achievements() {
            assert!(achievement.xp_reward > 0, "{}", achievement.id);
            assert!(achievement.required_count >= 1, "{}", achievement.id);
            assert!(!achievement.title.is_empty(), "{}", achievement.id);
            assert!(!achievement.is_repeatable, "{}", achievement.id);
        }
    }
}
