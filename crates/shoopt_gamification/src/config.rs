//! Gamification configuration
//!
//! Config file: $XDG_CONFIG_HOME/shoopt/gamification.toml or
//! ~/.config/shoopt/gamification.toml

use crate::storage::{DbLocation, GamificationStorage, MemoryStorage, SqliteStorage};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database file; the user data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn location(&self) -> DbLocation {
        match (&self.backend, &self.path) {
            (StorageBackend::Memory, _) => DbLocation::InMemory,
            (StorageBackend::Sqlite, Some(path)) => DbLocation::Custom(path.clone()),
            (StorageBackend::Sqlite, None) => DbLocation::User,
        }
    }

    pub async fn open(&self) -> Result<Arc<dyn GamificationStorage>> {
        match self.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageBackend::Sqlite => {
                let location = self.location();
                let storage = SqliteStorage::open(location.clone())
                    .await
                    .with_context(|| format!("Failed to open database {:?}", location.path()))?;
                Ok(Arc::new(storage))
            }
        }
    }
}

/// XP credited per client event, on top of any achievement rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_first_product")]
    pub first_product: u64,
    #[serde(default = "default_product_added")]
    pub product_added: u64,
    #[serde(default = "default_shopping_session")]
    pub shopping_session: u64,
    #[serde(default = "default_barcode_scan")]
    pub barcode_scan: u64,
    #[serde(default = "default_price_comparison")]
    pub price_comparison: u64,
}

fn default_first_product() -> u64 {
    100
}
fn default_product_added() -> u64 {
    25
}
fn default_shopping_session() -> u64 {
    50
}
fn default_barcode_scan() -> u64 {
    10
}
fn default_price_comparison() -> u64 {
    15
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            first_product: default_first_product(),
            product_added: default_product_added(),
            shopping_session: default_shopping_session(),
            barcode_scan: default_barcode_scan(),
            price_comparison: default_price_comparison(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamificationConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub notices: NoticeConfig,
}

impl GamificationConfig {
    /// Default user config path
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg)
        } else {
            let home = std::env::var("HOME").context("Cannot determine home directory")?;
            Path::new(&home).join(".config")
        };
        Ok(config_dir.join("shoopt").join("gamification.toml"))
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. `explicit`, which must exist
    /// 2. User config
    /// 3. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: GamificationConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if config.notices.channel_capacity == 0 {
            anyhow::bail!(
                "{}: notices.channel_capacity must be at least 1",
                path.display()
            );
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
