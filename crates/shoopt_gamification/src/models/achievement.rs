//! Achievement catalog entries.
//!
//! Category and difficulty are persisted as upper-case text. Values this build
//! does not recognize decode to `General` / `Easy` instead of failing.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

/// Grouping used by the catalog and by event routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementCategory {
    General,
    Products,
    Shopping,
    Social,
    Exploration,
    Consistency,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 6] = [
        AchievementCategory::General,
        AchievementCategory::Products,
        AchievementCategory::Shopping,
        AchievementCategory::Social,
        AchievementCategory::Exploration,
        AchievementCategory::Consistency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementCategory::General => "GENERAL",
            AchievementCategory::Products => "PRODUCTS",
            AchievementCategory::Shopping => "SHOPPING",
            AchievementCategory::Social => "SOCIAL",
            AchievementCategory::Exploration => "EXPLORATION",
            AchievementCategory::Consistency => "CONSISTENCY",
        }
    }

    /// Strict parse, case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    /// Decode a stored value, falling back to `General` for anything unknown.
    pub fn from_stored(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|| {
            warn!("Unknown achievement category '{}', using GENERAL", raw);
            AchievementCategory::General
        })
    }
}

impl Default for AchievementCategory {
    fn default() -> Self {
        AchievementCategory::General
    }
}

impl fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AchievementCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_stored(&raw))
    }
}

/// Difficulty band. Loosely tracks the XP reward:
/// EASY 50-100, MEDIUM 150-300, HARD 400-600, EPIC 700+ (not enforced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementDifficulty {
    Easy,
    Medium,
    Hard,
    Epic,
}

impl AchievementDifficulty {
    pub const ALL: [AchievementDifficulty; 4] = [
        AchievementDifficulty::Easy,
        AchievementDifficulty::Medium,
        AchievementDifficulty::Hard,
        AchievementDifficulty::Epic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementDifficulty::Easy => "EASY",
            AchievementDifficulty::Medium => "MEDIUM",
            AchievementDifficulty::Hard => "HARD",
            AchievementDifficulty::Epic => "EPIC",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    /// Decode a stored value, falling back to `Easy` for anything unknown.
    pub fn from_stored(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|| {
            warn!("Unknown achievement difficulty '{}', using EASY", raw);
            AchievementDifficulty::Easy
        })
    }
}

impl Default for AchievementDifficulty {
    fn default() -> Self {
        AchievementDifficulty::Easy
    }
}

impl fmt::Display for AchievementDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AchievementDifficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_stored(&raw))
    }
}

fn default_required_count() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

/// Catalog definition of an achievement. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Icon name or URL, display only
    pub icon: String,
    #[serde(default)]
    pub category: AchievementCategory,
    pub xp_reward: u64,
    #[serde(default = "default_required_count")]
    pub required_count: u32,
    #[serde(default)]
    pub is_repeatable: bool,
    /// Opaque precondition, interpreted by callers
    #[serde(default)]
    pub unlock_condition: Option<String>,
    #[serde(default)]
    pub difficulty: AchievementDifficulty,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Achievement {
    pub fn new(
        id: impl Into<String>,
        category: AchievementCategory,
        xp_reward: u64,
        required_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            icon: "ic_achievement_default".to_string(),
            category,
            xp_reward,
            required_count: required_count.max(1),
            is_repeatable: false,
            unlock_condition: None,
            difficulty: AchievementDifficulty::Easy,
            is_active: true,
        }
    }

    pub fn with_text(mut self, title: impl Into<String>, description: impl Into<String>) -> Self {
        self.title = title.into();
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: AchievementDifficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.is_repeatable = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_unlock_condition(mut self, condition: impl Into<String>) -> Self {
        self.unlock_condition = Some(condition.into());
        self
    }

    /// Progress target, never below one.
    pub fn target(&self) -> u32 {
        self.required_count.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        for category in AchievementCategory::ALL {
            assert_eq!(AchievementCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(AchievementCategory::parse("products"), Some(AchievementCategory::Products));
    }

    #[test]
    fn test_unknown_category_falls_back_to_general() {
        assert_eq!(AchievementCategory::from_stored("SEASONAL"), AchievementCategory::General);
        assert_eq!(AchievementCategory::from_stored(""), AchievementCategory::General);
    }

    #[test]
    fn test_unknown_difficulty_falls_back_to_easy() {
        assert_eq!(AchievementDifficulty::from_stored("LEGENDARY"), AchievementDifficulty::Easy);
        assert_eq!(AchievementDifficulty::from_stored("hard"), AchievementDifficulty::Hard);
    }

    #[test]
    fn test_json_decode_with_legacy_values() {
        let json = r#"{
            "id": "mystery",
            "title": "Mystery",
            "description": "From a newer catalog",
            "icon": "ic_mystery",
            "category": "SEASONAL",
            "xp_reward": 120,
            "difficulty": "MYTHIC"
        }"#;
        let achievement: Achievement = serde_json::from_str(json).unwrap();
        assert_eq!(achievement.category, AchievementCategory::General);
        assert_eq!(achievement.difficulty, AchievementDifficulty::Easy);
        assert_eq!(achievement.required_count, 1);
        assert!(achievement.is_active);
        assert!(!achievement.is_repeatable);
    }

    #[test]
    fn test_serializes_upper_case() {
        let achievement = Achievement::new("a", AchievementCategory::Exploration, 50, 1)
            .with_difficulty(AchievementDifficulty::Epic);
        let json = serde_json::to_string(&achievement).unwrap();
        assert!(json.contains("\"EXPLORATION\""));
        assert!(json.contains("\"EPIC\""));
    }

    #[test]
    fn test_required_count_never_zero() {
        let achievement = Achievement::new("zero", AchievementCategory::General, 10, 0);
        assert_eq!(achievement.target(), 1);
    }
}
