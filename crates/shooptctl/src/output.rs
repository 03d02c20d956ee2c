//! Terminal rendering, ASCII only

use crate::cli::MAX_LEVELS;
use owo_colors::OwoColorize;
use shoopt_gamification::progression::{level_floor, level_title};
use shoopt_gamification::{
    Achievement, EventOutcome, GamificationNotice, ProgressOutcome, UserAchievement, UserProfile,
};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn render_profile(profile: &UserProfile) -> String {
    let snapshot = profile.snapshot();
    let mut out = String::new();
    let _ = writeln!(out, "{}", profile.user_id.bold());
    let _ = writeln!(
        out,
        "  Level {} - {}",
        snapshot.level.to_string().bright_green(),
        snapshot.title.cyan()
    );
    let _ = writeln!(
        out,
        "  {} {:.1}%  ({} XP to next)",
        progress_bar(snapshot.progress_percent),
        snapshot.progress_percent,
        snapshot.xp_to_next
    );
    let _ = writeln!(out, "  Total XP:      {}", profile.total_xp);
    let _ = writeln!(out, "  Achievements:  {}", profile.achievements_completed);
    let _ = writeln!(out, "  Products:      {}", profile.products_added);
    let _ = writeln!(out, "  Sessions:      {}", profile.shopping_sessions);
    let _ = writeln!(out, "  Streak:        {} day(s)", profile.streak_days);
    if let Some(category) = profile.favorite_achievement_category {
        let _ = writeln!(out, "  Favorite:      {}", category);
    }
    out
}

pub fn render_catalog(achievements: &[Achievement]) -> String {
    let mut out = String::new();
    for a in achievements {
        let state = if a.is_active {
            String::new()
        } else {
            format!(" {}", "(inactive)".dimmed())
        };
        let _ = writeln!(
            out,
            "  {:<24} {:<12} {:<7} {:>5} XP  x{}{}",
            a.id,
            a.category.as_str(),
            a.difficulty.as_str(),
            a.xp_reward,
            a.target(),
            state
        );
    }
    out
}

pub fn render_user_achievements(
    achievements: &[Achievement],
    records: &[UserAchievement],
    completion: f64,
) -> String {
    let mut out = String::new();
    for a in achievements {
        let record = records.iter().find(|r| r.achievement_id == a.id);
        let progress = record.map(|r| r.current_progress).unwrap_or(0);
        let times = record.map(|r| r.times_completed).unwrap_or(0);
        let marker = if times > 0 {
            "[DONE]".bright_green().to_string()
        } else if progress > 0 {
            "[....]".yellow().to_string()
        } else {
            "[    ]".to_string()
        };
        let repeat = if a.is_repeatable && times > 0 {
            format!(" x{}", times)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "  {} {:<24} {}/{}{}",
            marker,
            a.id,
            progress,
            a.target(),
            repeat
        );
    }
    let _ = writeln!(out, "  Completion: {:.1}%", completion);
    out
}

pub fn render_notice(notice: &GamificationNotice) -> String {
    match notice {
        GamificationNotice::AchievementUnlocked { achievement, .. } => format!(
            "{} {} (+{} XP)",
            "[UNLOCKED]".bright_green(),
            achievement.title,
            achievement.xp_reward
        ),
        GamificationNotice::LevelUp {
            previous_level,
            new_level,
            ..
        } => format!(
            "{} {} -> {} ({})",
            "[LEVEL UP]".bright_yellow(),
            previous_level,
            new_level,
            level_title(*new_level)
        ),
    }
}

pub fn render_event(outcome: &EventOutcome) -> String {
    let mut out = format!(
        "{} for {}: +{} XP, total {}\n",
        outcome.event,
        outcome.profile.user_id,
        outcome.xp_awarded,
        outcome.profile.total_xp
    );
    for notice in &outcome.notices {
        let _ = writeln!(out, "  {}", render_notice(notice));
    }
    out
}

pub fn render_progress(outcome: &ProgressOutcome) -> String {
    let record = &outcome.record;
    let mut out = format!(
        "{} {}/{}",
        record.achievement_id,
        record.current_progress,
        outcome.achievement.target()
    );
    if outcome.completed {
        let _ = write!(out, " {}", "[UNLOCKED]".bright_green());
    } else if record.is_completed {
        let _ = write!(out, " {}", "(already completed)".dimmed());
    }
    out.push('\n');
    if let Some(award) = &outcome.award {
        let _ = writeln!(
            out,
            "  +{} XP, level {} ({})",
            award.xp_added,
            award.profile.current_level,
            award.profile.level_title()
        );
    }
    out
}

pub fn render_levels(max: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {:>5}  {:>9}  Title", "Level", "From XP");
    for level in 1..=max.clamp(1, MAX_LEVELS) {
        let _ = writeln!(
            out,
            "  {:>5}  {:>9}  {}",
            level,
            level_floor(level),
            level_title(level)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(progress_bar(0.0), format!("[{}]", "-".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(100.0), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(250.0), progress_bar(100.0));
        assert_eq!(progress_bar(50.0).matches('#').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn test_levels_table() {
        let table = render_levels(3);
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("Shopper Novice"));
        assert!(table.contains("282"));
        assert!(table.contains("Smart Buyer"));
    }
}
