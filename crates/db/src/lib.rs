// crates/db/src/lib.rs
// SQLite persistence for voice session history and running totals.

mod migrations;
mod queries;

pub use queries::{ChannelUsage, UserOverview};

use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("store unavailable after {attempts} attempts: {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("operation exceeded its {0:?} time budget")]
    Timeout(Duration),

    #[error("Failed to determine data directory")]
    NoDataDir,

    #[error("Failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Tuning knobs for a [`Store`].
///
/// Every field has a serde default, so a host can deserialize a partial
/// `[store]` section from its config file and get sensible behavior for
/// whatever it leaves out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file location; `None` means the platform data directory.
    pub path: Option<PathBuf>,
    /// Connection pool size.
    pub max_connections: u32,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout_secs: u64,
    /// Total attempts for a session commit before reporting the store
    /// unavailable. Values below 1 are treated as 1.
    pub commit_retries: u32,
    /// Base of the linear backoff between commit attempts.
    pub retry_backoff_ms: u64,
    /// Hard ceiling for any single query or commit; `None` is unbounded.
    pub op_timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 4,
            busy_timeout_secs: 5,
            commit_retries: 3,
            retry_backoff_ms: 50,
            op_timeout_ms: None,
        }
    }
}

/// Persistence handle wrapping a SQLite connection pool.
///
/// All query methods live in `queries/`; this type owns connection setup,
/// migrations, and the failure policy (retry classification and per-op
/// time budget) that those methods share.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    db_path: PathBuf,
    config: StoreConfig,
}

impl Store {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> StoreResult<Self> {
        Self::with_config(StoreConfig {
            path: Some(path.to_owned()),
            ..StoreConfig::default()
        })
        .await
    }

    /// Open the database at the configured (or default) location.
    pub async fn with_config(config: StoreConfig) -> StoreResult<Self> {
        let path = match &config.path {
            Some(path) => path.clone(),
            None => default_db_path()?,
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            db_path: path.clone(),
            config,
        };
        store.run_migrations().await?;

        info!("Session store opened at {}", path.display());
        Ok(store)
    }

    /// Open the database at the default location:
    /// `<data dir>/voicetime/voicetime.db`.
    pub async fn open_default() -> StoreResult<Self> {
        Self::with_config(StoreConfig::default()).await
    }

    /// Create an in-memory database (for testing).
    pub async fn new_in_memory() -> StoreResult<Self> {
        Self::in_memory_with_config(StoreConfig::default()).await
    }

    /// In-memory database with explicit tuning, for tests that exercise
    /// the retry and timeout policy.
    ///
    /// Uses `shared_cache(true)` so all pool connections share the same
    /// in-memory database. Without this, each connection gets its own
    /// separate database, breaking `tokio::try_join!` and concurrent
    /// queries.
    pub async fn in_memory_with_config(config: StoreConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        let store = Self {
            pool,
            db_path: PathBuf::new(),
            config,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run all inline migrations.
    ///
    /// Uses a `_migrations` table to track which migrations have already
    /// been applied, so that non-idempotent statements are only executed
    /// once.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1; // 1-based
            if version > current_version {
                sqlx::query(migration).execute(&self.pool).await?;
                sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the path to the database file.
    /// Returns an empty path for in-memory databases.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Apply the configured per-operation time budget to a query future.
    ///
    /// A timed-out commit aborts mid-transaction, which SQLite rolls back
    /// when the connection is released; no partial mutation survives.
    pub(crate) async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match self.config.op_timeout_ms {
            Some(ms) => {
                let budget = Duration::from_millis(ms);
                match tokio::time::timeout(budget, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::Timeout(budget)),
                }
            }
            None => fut.await,
        }
    }
}

/// Whether an error is worth retrying: the storage layer may recover
/// (lock contention, pool pressure, interrupted I/O), as opposed to a
/// malformed query or constraint violation which never will.
pub(crate) fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db) => {
            let message = db.message().to_ascii_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}

/// Returns the default database path:
/// `<platform data dir>/voicetime/voicetime.db`.
pub fn default_db_path() -> StoreResult<PathBuf> {
    let base = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
    Ok(base.join("voicetime").join("voicetime.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_store() {
        let store = Store::new_in_memory()
            .await
            .expect("should create in-memory store");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM session_records")
            .fetch_one(store.pool())
            .await
            .expect("session_records table should exist");
        assert_eq!(count.0, 0);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_totals")
            .fetch_one(store.pool())
            .await
            .expect("user_totals table should exist");
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let store = Store::new_in_memory()
            .await
            .expect("first open should succeed");

        store
            .run_migrations()
            .await
            .expect("second migration run should succeed");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM session_records")
            .fetch_one(store.pool())
            .await
            .expect("session_records table should still exist");
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_file_based_store() {
        let tmp = tempfile::tempdir().expect("should create temp dir");
        let db_path = tmp.path().join("voicetime.db");

        let store = Store::new(&db_path)
            .await
            .expect("should create file-based store");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM session_records")
            .fetch_one(store.pool())
            .await
            .expect("session_records table should exist");
        assert_eq!(count.0, 0);

        assert!(db_path.exists(), "database file should be created on disk");
    }

    #[tokio::test]
    async fn test_default_db_path() {
        let path = default_db_path().expect("should resolve default path");
        assert!(path.to_string_lossy().contains("voicetime"));
        assert!(path.to_string_lossy().ends_with("voicetime.db"));
    }

    #[test]
    fn test_config_defaults_from_partial_toml() {
        let config: StoreConfig = toml::from_str("commit_retries = 5").unwrap();
        assert_eq!(config.commit_retries, 5);
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.op_timeout_ms, None);
        assert!(config.path.is_none());
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::PoolClosed));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }
}
