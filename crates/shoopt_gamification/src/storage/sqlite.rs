// SQLite storage backend
//
// Single connection behind a mutex; every statement runs on the blocking pool.

use super::{GamificationStorage, StorageResult};
use crate::error::StorageError;
use crate::models::{
    Achievement, AchievementCategory, AchievementDifficulty, UserAchievement, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Database location
#[derive(Debug, Clone)]
pub enum DbLocation {
    /// $XDG_DATA_HOME/shoopt/gamification.db or ~/.local/share/shoopt/gamification.db
    User,
    /// Explicit path
    Custom(PathBuf),
    /// Private in-memory database
    InMemory,
}

impl DbLocation {
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            DbLocation::User => {
                let base_dir = if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
                    PathBuf::from(xdg_data)
                } else if let Ok(home) = std::env::var("HOME") {
                    PathBuf::from(home).join(".local/share")
                } else {
                    PathBuf::from(".")
                };
                Some(base_dir.join("shoopt").join("gamification.db"))
            }
            DbLocation::Custom(path) => Some(path.clone()),
            DbLocation::InMemory => None,
        }
    }
}

pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    location: DbLocation,
}

impl SqliteStorage {
    /// Open or create the database and make sure the schema exists.
    pub async fn open(location: DbLocation) -> StorageResult<Self> {
        let db_path = location.path();

        if let Some(parent) = db_path.as_ref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = tokio::task::spawn_blocking(move || -> StorageResult<Connection> {
            let conn = match &db_path {
                Some(path) => {
                    info!("Opening gamification database at: {}", path.display());
                    let conn = Connection::open(path)?;
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                    conn
                }
                None => {
                    debug!("Opening in-memory gamification database");
                    Connection::open_in_memory()?
                }
            };
            Ok(conn)
        })
        .await??;

        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
            location,
        };
        storage.initialize_schema().await?;
        Ok(storage)
    }

    pub async fn open_in_memory() -> StorageResult<Self> {
        Self::open(DbLocation::InMemory).await
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }

    async fn initialize_schema(&self) -> StorageResult<()> {
        self.execute(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS achievements (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    icon TEXT NOT NULL,
                    category TEXT NOT NULL,
                    xp_reward INTEGER NOT NULL,
                    required_count INTEGER NOT NULL DEFAULT 1,
                    is_repeatable INTEGER NOT NULL DEFAULT 0,
                    unlock_condition TEXT,
                    difficulty TEXT NOT NULL DEFAULT 'EASY',
                    is_active INTEGER NOT NULL DEFAULT 1
                );
                CREATE INDEX IF NOT EXISTS idx_achievements_category
                    ON achievements(category, is_active);

                CREATE TABLE IF NOT EXISTS user_achievements (
                    id TEXT NOT NULL,
                    achievement_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    current_progress INTEGER NOT NULL DEFAULT 0,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    completed_at TEXT,
                    last_updated TEXT NOT NULL,
                    times_completed INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (user_id, achievement_id)
                );

                CREATE TABLE IF NOT EXISTS user_profile (
                    user_id TEXT PRIMARY KEY,
                    total_xp INTEGER NOT NULL DEFAULT 0,
                    current_level INTEGER NOT NULL DEFAULT 1,
                    xp_in_current_level INTEGER NOT NULL DEFAULT 0,
                    achievements_completed INTEGER NOT NULL DEFAULT 0,
                    products_added INTEGER NOT NULL DEFAULT 0,
                    shopping_sessions INTEGER NOT NULL DEFAULT 0,
                    streak_days INTEGER NOT NULL DEFAULT 0,
                    last_activity TEXT NOT NULL,
                    profile_created_at TEXT NOT NULL,
                    favorite_achievement_category TEXT
                );",
            )?;
            Ok(())
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    pub async fn execute<F, R>(&self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&Connection) -> StorageResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await?
    }
}

fn parse_ts(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

fn to_u32(value: i64, column: &str) -> StorageResult<u32> {
    u32::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("{} out of range: {}", column, value)))
}

fn to_u64(value: i64, column: &str) -> StorageResult<u64> {
    u64::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("{} out of range: {}", column, value)))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

const ACHIEVEMENT_COLUMNS: &str = "id, title, description, icon, category, xp_reward,
    required_count, is_repeatable, unlock_condition, difficulty, is_active";

/// Raw column values, converted outside the rusqlite row callback so range
/// and timestamp problems surface as `StorageError::Corrupt`.
struct AchievementRow {
    id: String,
    title: String,
    description: String,
    icon: String,
    category: String,
    xp_reward: i64,
    required_count: i64,
    is_repeatable: bool,
    unlock_condition: Option<String>,
    difficulty: String,
    is_active: bool,
}

impl AchievementRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            icon: row.get(3)?,
            category: row.get(4)?,
            xp_reward: row.get(5)?,
            required_count: row.get(6)?,
            is_repeatable: row.get(7)?,
            unlock_condition: row.get(8)?,
            difficulty: row.get(9)?,
            is_active: row.get(10)?,
        })
    }

    fn into_model(self) -> StorageResult<Achievement> {
        Ok(Achievement {
            id: self.id,
            title: self.title,
            description: self.description,
            icon: self.icon,
            category: AchievementCategory::from_stored(&self.category),
            xp_reward: to_u64(self.xp_reward, "xp_reward")?,
            required_count: to_u32(self.required_count, "required_count")?.max(1),
            is_repeatable: self.is_repeatable,
            unlock_condition: self.unlock_condition,
            difficulty: AchievementDifficulty::from_stored(&self.difficulty),
            is_active: self.is_active,
        })
    }
}

const USER_ACHIEVEMENT_COLUMNS: &str = "id, achievement_id, user_id, current_progress,
    is_completed, completed_at, last_updated, times_completed";

struct UserAchievementRow {
    id: String,
    achievement_id: String,
    user_id: String,
    current_progress: i64,
    is_completed: bool,
    completed_at: Option<String>,
    last_updated: String,
    times_completed: i64,
}

impl UserAchievementRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            achievement_id: row.get(1)?,
            user_id: row.get(2)?,
            current_progress: row.get(3)?,
            is_completed: row.get(4)?,
            completed_at: row.get(5)?,
            last_updated: row.get(6)?,
            times_completed: row.get(7)?,
        })
    }

    fn into_model(self) -> StorageResult<UserAchievement> {
        Ok(UserAchievement {
            id: self.id,
            achievement_id: self.achievement_id,
            user_id: self.user_id,
            current_progress: to_u32(self.current_progress, "current_progress")?,
            is_completed: self.is_completed,
            completed_at: self.completed_at.as_deref().map(parse_ts).transpose()?,
            last_updated: parse_ts(&self.last_updated)?,
            times_completed: to_u32(self.times_completed, "times_completed")?,
        })
    }
}

const PROFILE_COLUMNS: &str = "user_id, total_xp, current_level, xp_in_current_level,
    achievements_completed, products_added, shopping_sessions, streak_days,
    last_activity, profile_created_at, favorite_achievement_category";

struct ProfileRow {
    user_id: String,
    total_xp: i64,
    current_level: i64,
    xp_in_current_level: i64,
    achievements_completed: i64,
    products_added: i64,
    shopping_sessions: i64,
    streak_days: i64,
    last_activity: String,
    profile_created_at: String,
    favorite_achievement_category: Option<String>,
}

impl ProfileRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            total_xp: row.get(1)?,
            current_level: row.get(2)?,
            xp_in_current_level: row.get(3)?,
            achievements_completed: row.get(4)?,
            products_added: row.get(5)?,
            shopping_sessions: row.get(6)?,
            streak_days: row.get(7)?,
            last_activity: row.get(8)?,
            profile_created_at: row.get(9)?,
            favorite_achievement_category: row.get(10)?,
        })
    }

    fn into_model(self) -> StorageResult<UserProfile> {
        Ok(UserProfile {
            user_id: self.user_id,
            total_xp: to_u64(self.total_xp, "total_xp")?,
            current_level: to_u32(self.current_level, "current_level")?,
            xp_in_current_level: to_u64(self.xp_in_current_level, "xp_in_current_level")?,
            achievements_completed: to_u32(self.achievements_completed, "achievements_completed")?,
            products_added: to_u32(self.products_added, "products_added")?,
            shopping_sessions: to_u32(self.shopping_sessions, "shopping_sessions")?,
            streak_days: to_u32(self.streak_days, "streak_days")?,
            last_activity: parse_ts(&self.last_activity)?,
            profile_created_at: parse_ts(&self.profile_created_at)?,
            favorite_achievement_category: self
                .favorite_achievement_category
                .as_deref()
                .map(AchievementCategory::from_stored),
        })
    }
}

fn write_profile(conn: &Connection, p: &UserProfile) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO user_profile (
            user_id, total_xp, current_level, xp_in_current_level,
            achievements_completed, products_added, shopping_sessions, streak_days,
            last_activity, profile_created_at, favorite_achievement_category
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            p.user_id,
            to_i64(p.total_xp),
            p.current_level,
            to_i64(p.xp_in_current_level),
            p.achievements_completed,
            p.products_added,
            p.shopping_sessions,
            p.streak_days,
            p.last_activity.to_rfc3339(),
            p.profile_created_at.to_rfc3339(),
            p.favorite_achievement_category.map(|c| c.as_str()),
        ],
    )?;
    Ok(())
}

fn write_user_achievement(conn: &Connection, r: &UserAchievement) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO user_achievements (
            id, achievement_id, user_id, current_progress, is_completed,
            completed_at, last_updated, times_completed
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            r.id,
            r.achievement_id,
            r.user_id,
            r.current_progress,
            r.is_completed,
            r.completed_at.map(|ts| ts.to_rfc3339()),
            r.last_updated.to_rfc3339(),
            r.times_completed,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl GamificationStorage for SqliteStorage {
    async fn get_profile(&self, user_id: &str) -> StorageResult<Option<UserProfile>> {
        let user_id = user_id.to_string();
        let row = self
            .execute(move |conn| {
                let sql = format!("SELECT {} FROM user_profile WHERE user_id = ?1", PROFILE_COLUMNS);
                Ok(conn
                    .query_row(&sql, params![user_id], ProfileRow::read)
                    .optional()?)
            })
            .await?;
        row.map(ProfileRow::into_model).transpose()
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> StorageResult<()> {
        let p = profile.clone();
        self.execute(move |conn| write_profile(conn, &p)).await
    }

    async fn delete_profile(&self, user_id: &str) -> StorageResult<()> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM user_profile WHERE user_id = ?1", params![user_id])?;
            Ok(())
        })
        .await
    }

    async fn get_achievement(&self, id: &str) -> StorageResult<Option<Achievement>> {
        let id = id.to_string();
        let row = self
            .execute(move |conn| {
                let sql = format!("SELECT {} FROM achievements WHERE id = ?1", ACHIEVEMENT_COLUMNS);
                Ok(conn
                    .query_row(&sql, params![id], AchievementRow::read)
                    .optional()?)
            })
            .await?;
        row.map(AchievementRow::into_model).transpose()
    }

    async fn list_achievements(&self) -> StorageResult<Vec<Achievement>> {
        let rows = self
            .execute(|conn| {
                let sql = format!("SELECT {} FROM achievements ORDER BY id", ACHIEVEMENT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], AchievementRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(AchievementRow::into_model).collect()
    }

    async fn upsert_achievements(&self, achievements: &[Achievement]) -> StorageResult<()> {
        let achievements = achievements.to_vec();
        self.execute(move |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO achievements (
                        id, title, description, icon, category, xp_reward,
                        required_count, is_repeatable, unlock_condition, difficulty, is_active
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                )?;
                for a in &achievements {
                    stmt.execute(params![
                        a.id,
                        a.title,
                        a.description,
                        a.icon,
                        a.category.as_str(),
                        to_i64(a.xp_reward),
                        a.required_count,
                        a.is_repeatable,
                        a.unlock_condition,
                        a.difficulty.as_str(),
                        a.is_active,
                    ])?;
                }
            }
            tx.commit()?;
            debug!("Upserted {} achievements", achievements.len());
            Ok(())
        })
        .await
    }

    async fn get_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> StorageResult<Option<UserAchievement>> {
        let user_id = user_id.to_string();
        let achievement_id = achievement_id.to_string();
        let row = self
            .execute(move |conn| {
                let sql = format!(
                    "SELECT {} FROM user_achievements WHERE user_id = ?1 AND achievement_id = ?2",
                    USER_ACHIEVEMENT_COLUMNS
                );
                Ok(conn
                    .query_row(&sql, params![user_id, achievement_id], UserAchievementRow::read)
                    .optional()?)
            })
            .await?;
        row.map(UserAchievementRow::into_model).transpose()
    }

    async fn list_user_achievements(&self, user_id: &str) -> StorageResult<Vec<UserAchievement>> {
        let user_id = user_id.to_string();
        let rows = self
            .execute(move |conn| {
                let sql = format!(
                    "SELECT {} FROM user_achievements WHERE user_id = ?1 ORDER BY achievement_id",
                    USER_ACHIEVEMENT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![user_id], UserAchievementRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(UserAchievementRow::into_model).collect()
    }

    async fn upsert_user_achievement(&self, record: &UserAchievement) -> StorageResult<()> {
        let r = record.clone();
        self.execute(move |conn| write_user_achievement(conn, &r)).await
    }

    async fn apply_completion(
        &self,
        record: &UserAchievement,
        profile: &UserProfile,
    ) -> StorageResult<()> {
        let r = record.clone();
        let p = profile.clone();
        self.execute(move |conn| {
            let tx = conn.unchecked_transaction()?;
            write_user_achievement(&tx, &r)?;
            write_profile(&tx, &p)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_user_achievements(&self, user_id: &str) -> StorageResult<()> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let removed = conn.execute(
                "DELETE FROM user_achievements WHERE user_id = ?1",
                params![user_id],
            )?;
            debug!("Removed {} progress rows", removed);
            Ok(())
        })
        .await
    }
}
