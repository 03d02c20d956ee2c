//! Subcommand execution
//!
//! Handlers return the rendered text so `main` owns stdout.

use crate::cli::{Cli, Commands, MAX_LEVELS};
use crate::output;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use shoopt_gamification::defaults::{default_achievements, seed_catalog};
use shoopt_gamification::progression::{level_floor, level_title};
use shoopt_gamification::{GamificationConfig, GamificationService};
use tracing::debug;

/// Load config and run `cli.command`. Storage is opened only for commands
/// that read or write user data.
pub async fn execute(cli: &Cli) -> Result<String> {
    if let Commands::Levels { max } = &cli.command {
        return levels(*max, cli.json);
    }
    let config =
        GamificationConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    debug!("Storage location: {:?}", config.storage.location());
    let service = GamificationService::open(&config).await?;
    run(&cli.command, &service, cli.json).await
}

pub async fn run(command: &Commands, service: &GamificationService, as_json: bool) -> Result<String> {
    match command {
        Commands::Event { user, event } => {
            let outcome = service.handle_event(user, *event).await?;
            render(as_json, &outcome, || output::render_event(&outcome))
        }

        Commands::Profile { user } => {
            let profile = service.profiles().require_profile(user).await?;
            if as_json {
                return to_json(&json!({
                    "profile": profile,
                    "level": profile.snapshot(),
                }));
            }
            Ok(output::render_profile(&profile))
        }

        Commands::Achievements { user, category } => {
            let achievements = match category {
                Some(c) => service.catalog().get_by_category(*c).await?,
                None => service.storage().list_achievements().await?,
            };
            match user {
                None => render(as_json, &achievements, || {
                    output::render_catalog(&achievements)
                }),
                Some(user) => {
                    let active: Vec<_> = achievements.into_iter().filter(|a| a.is_active).collect();
                    let records = service.tracker().list_for_user(user).await?;
                    let completion = service.tracker().completion_percentage(user).await?;
                    if as_json {
                        return to_json(&json!({
                            "user_id": user,
                            "achievements": active,
                            "progress": records,
                            "completion_percentage": completion,
                        }));
                    }
                    Ok(output::render_user_achievements(&active, &records, completion))
                }
            }
        }

        Commands::Progress {
            user,
            achievement,
            delta,
        } => {
            let outcome = service.record_progress(user, achievement, *delta).await?;
            if as_json {
                return to_json(&json!({
                    "record": outcome.record,
                    "completed": outcome.completed,
                    "award": outcome.award,
                }));
            }
            Ok(output::render_progress(&outcome))
        }

        Commands::SyncProducts { user, count } => {
            let notices = service.sync_product_count(user, *count).await?;
            let profile = service.profiles().require_profile(user).await?;
            if as_json {
                return to_json(&json!({ "profile": profile, "notices": notices }));
            }
            let mut out = format!("{}: {} products\n", user, profile.products_added);
            for notice in &notices {
                out.push_str("  ");
                out.push_str(&output::render_notice(notice));
                out.push('\n');
            }
            Ok(out)
        }

        Commands::Seed => {
            let count = seed_catalog(service.storage().as_ref(), &default_achievements()).await?;
            if as_json {
                return to_json(&json!({ "seeded": count }));
            }
            Ok(format!("Seeded {} achievements\n", count))
        }

        Commands::Levels { max } => levels(*max, as_json),

        Commands::DeleteUser { user } => {
            service.delete_user_data(user).await?;
            if as_json {
                return to_json(&json!({ "deleted": user }));
            }
            Ok(format!("Deleted gamification data for {}\n", user))
        }
    }
}

/// Level table; needs no storage
pub fn levels(max: u32, as_json: bool) -> Result<String> {
    let max = max.clamp(1, MAX_LEVELS);
    if as_json {
        let levels: Vec<_> = (1..=max)
            .map(|level| {
                json!({
                    "level": level,
                    "from_xp": level_floor(level),
                    "title": level_title(level),
                })
            })
            .collect();
        return to_json(&levels);
    }
    Ok(output::render_levels(max))
}

fn render<T, F>(as_json: bool, value: &T, text: F) -> Result<String>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    if as_json {
        to_json(value)
    } else {
        Ok(text())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}
