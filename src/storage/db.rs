//! SQLite-backed user settings.
//!
//! The settings provider is read-only for the pipelines: output preferences
//! are written by the settings menu surface and only consumed here.

use crate::core::error::{AppError, AppResult};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

/// Type alias for the connection pool
pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// Type alias for a pooled connection
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Target resolution tier for video downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionTier {
    #[default]
    Best,
    P1080,
    P720,
    P480,
}

impl ResolutionTier {
    /// Parse from stored string value.
    pub fn parse(s: &str) -> Self {
        match s {
            "1080" => Self::P1080,
            "720" => Self::P720,
            "480" => Self::P480,
            _ => Self::Best,
        }
    }

    /// Serialize to string for DB storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::P1080 => "1080",
            Self::P720 => "720",
            Self::P480 => "480",
        }
    }
}

/// Delivery representation preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryFormat {
    #[default]
    Video,
    Document,
    Audio,
}

impl DeliveryFormat {
    /// Parse from stored string value.
    pub fn parse(s: &str) -> Self {
        match s {
            "document" => Self::Document,
            "audio" => Self::Audio,
            _ => Self::Video,
        }
    }

    /// Serialize to string for DB storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Document => "document",
            Self::Audio => "audio",
        }
    }
}

/// How the user's tasks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Enqueue onto a dispatcher-selected worker route
    #[default]
    Queued,
    /// Run directly on the admitting process, no worker selection
    Direct,
}

impl DispatchMode {
    /// Parse from stored string value.
    pub fn parse(s: &str) -> Self {
        match s {
            "direct" => Self::Direct,
            _ => Self::Queued,
        }
    }

    /// Serialize to string for DB storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Direct => "direct",
        }
    }
}

/// Per-user output preferences, consumed read-only by the pipelines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserSettings {
    pub resolution: ResolutionTier,
    pub format: DeliveryFormat,
    pub dispatch: DispatchMode,
}

/// Creates the connection pool and initializes the schema.
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = r2d2::Pool::new(manager)?;
    init_schema(&pool.get()?)?;
    Ok(pool)
}

/// Gets a connection from the pool.
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    pool.get().map_err(AppError::from)
}

fn init_schema(conn: &DbConnection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_settings (
            user_id INTEGER PRIMARY KEY,
            resolution TEXT NOT NULL DEFAULT 'best',
            format TEXT NOT NULL DEFAULT 'video',
            dispatch TEXT NOT NULL DEFAULT 'queued',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;
    Ok(())
}

/// Returns the user's settings, falling back to defaults when the user has
/// never touched the settings menu.
pub fn get_user_settings(conn: &DbConnection, user_id: i64) -> AppResult<UserSettings> {
    let row = conn.query_row(
        "SELECT resolution, format, dispatch FROM user_settings WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    );

    match row {
        Ok((resolution, format, dispatch)) => Ok(UserSettings {
            resolution: ResolutionTier::parse(&resolution),
            format: DeliveryFormat::parse(&format),
            dispatch: DispatchMode::parse(&dispatch),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(UserSettings::default()),
        Err(e) => Err(AppError::Database(e)),
    }
}

/// Stores the user's settings (INSERT OR REPLACE).
pub fn set_user_settings(conn: &DbConnection, user_id: i64, settings: &UserSettings) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO user_settings (user_id, resolution, format, dispatch, updated_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))",
        params![
            user_id,
            settings.resolution.as_str(),
            settings.format.as_str(),
            settings.dispatch.as_str()
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_pool() -> (NamedTempFile, DbPool) {
        let file = NamedTempFile::new().unwrap();
        let pool = create_pool(file.path().to_str().unwrap()).unwrap();
        (file, pool)
    }

    // ==================== Enum round-trip tests ====================

    #[test]
    fn test_resolution_tier_round_trip() {
        for tier in [
            ResolutionTier::Best,
            ResolutionTier::P1080,
            ResolutionTier::P720,
            ResolutionTier::P480,
        ] {
            assert_eq!(ResolutionTier::parse(tier.as_str()), tier);
        }
        assert_eq!(ResolutionTier::parse("garbage"), ResolutionTier::Best);
    }

    #[test]
    fn test_delivery_format_round_trip() {
        for fmt in [DeliveryFormat::Video, DeliveryFormat::Document, DeliveryFormat::Audio] {
            assert_eq!(DeliveryFormat::parse(fmt.as_str()), fmt);
        }
        assert_eq!(DeliveryFormat::parse(""), DeliveryFormat::Video);
    }

    #[test]
    fn test_dispatch_mode_round_trip() {
        assert_eq!(DispatchMode::parse("direct"), DispatchMode::Direct);
        assert_eq!(DispatchMode::parse("queued"), DispatchMode::Queued);
        assert_eq!(DispatchMode::parse("anything"), DispatchMode::Queued);
    }

    // ==================== Settings storage tests ====================

    #[test]
    fn test_unknown_user_gets_defaults() {
        let (_file, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();
        let settings = get_user_settings(&conn, 42).unwrap();
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn test_set_then_get_settings() {
        let (_file, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        let settings = UserSettings {
            resolution: ResolutionTier::P720,
            format: DeliveryFormat::Document,
            dispatch: DispatchMode::Direct,
        };
        set_user_settings(&conn, 7, &settings).unwrap();

        assert_eq!(get_user_settings(&conn, 7).unwrap(), settings);
        // Other users unaffected
        assert_eq!(get_user_settings(&conn, 8).unwrap(), UserSettings::default());
    }

    #[test]
    fn test_set_overwrites_previous_settings() {
        let (_file, pool) = test_pool();
        let conn = get_connection(&pool).unwrap();

        let first = UserSettings {
            resolution: ResolutionTier::P1080,
            ..Default::default()
        };
        let second = UserSettings {
            resolution: ResolutionTier::P480,
            format: DeliveryFormat::Audio,
            dispatch: DispatchMode::Queued,
        };
        set_user_settings(&conn, 7, &first).unwrap();
        set_user_settings(&conn, 7, &second).unwrap();

        assert_eq!(get_user_settings(&conn, 7).unwrap(), second);
    }
}
