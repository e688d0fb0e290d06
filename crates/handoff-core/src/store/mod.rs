//! SQLite-backed local store.
//!
//! Local-first: every operation here succeeds or fails against the local
//! database alone. Remote connectivity never enters this module; the sync
//! bridge only observes the same data and feeds externally-observed items
//! back in through [`Store::apply_remote`].
//!
//! One explicit handle, constructed at process start and injected into
//! whatever needs it — there is no global database object.

use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use tokio::sync::broadcast;

use crate::error::StoreError;

pub mod devices;
pub mod items;
pub mod observe;
pub mod profile;

pub use observe::{ItemsSubscription, TableChange};
pub use profile::LocalCache;

/// Central store handle. Cheap to clone (pool and channel are Arc inside).
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    changes: broadcast::Sender<TableChange>,
}

impl Store {
    /// Open (or create) the database at `db_path` and run pending migrations.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time, not inside a migration: SQLite refuses to change
    /// `journal_mode` inside the transaction sqlx wraps every migration in.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        let (changes, _) = broadcast::channel(64);
        Ok(Self { pool, changes })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Notify observers of a committed write. Lost sends (no receivers) are
    /// fine; live queries re-run on the next notification they do see.
    pub(crate) fn notify(&self, change: TableChange) {
        let _ = self.changes.send(change);
    }

    /// Raw change feed; most callers want [`Store::watch_items`] instead.
    pub fn changes(&self) -> broadcast::Receiver<TableChange> {
        self.changes.subscribe()
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
