//! Command-line argument parsing
//!
//! Parsing only; execution lives in `commands`.

use clap::{Parser, Subcommand};
use shoopt_gamification::{AchievementCategory, GamificationEvent};
use std::path::PathBuf;

/// Upper bound for `levels --max`
pub const MAX_LEVELS: u32 = 1000;

/// Shoopt gamification control
#[derive(Parser, Debug)]
#[command(name = "shooptctl")]
#[command(about = "Inspect and drive Shoopt XP, levels and achievements", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides ~/.config/shoopt/gamification.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output JSON only
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a client event for a user
    Event {
        user: String,
        /// first_product_added, product_added, shopping_session_completed,
        /// barcode_scanned or price_compared
        #[arg(value_parser = parse_event)]
        event: GamificationEvent,
    },

    /// Show a user's profile and level
    Profile { user: String },

    /// List the catalog, or a user's progress against it
    Achievements {
        /// Show progress for this user
        #[arg(long)]
        user: Option<String>,

        /// Only this category
        #[arg(long, value_parser = parse_category)]
        category: Option<AchievementCategory>,
    },

    /// Add progress to one achievement
    Progress {
        user: String,
        achievement: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },

    /// Raise the product counter to the real product count
    SyncProducts { user: String, count: u32 },

    /// Write the default catalog into storage
    Seed,

    /// Print the level table
    Levels {
        #[arg(
            long,
            default_value_t = 10,
            value_parser = clap::value_parser!(u32).range(1..=MAX_LEVELS as i64)
        )]
        max: u32,
    },

    /// Remove all gamification data for a user
    DeleteUser { user: String },
}

fn parse_event(raw: &str) -> Result<GamificationEvent, String> {
    GamificationEvent::parse(raw).ok_or_else(|| {
        let known: Vec<_> = GamificationEvent::ALL.iter().map(|e| e.as_str()).collect();
        format!("unknown event '{}', expected one of: {}", raw, known.join(", "))
    })
}

fn parse_category(raw: &str) -> Result<AchievementCategory, String> {
    AchievementCategory::parse(raw).ok_or_else(|| {
        let known: Vec<_> = AchievementCategory::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown category '{}', expected one of: {}", raw, known.join(", "))
    })
}
