use crate::config::Config;
use crate::error::StorageError;
use anyhow::{Context, Result};
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[("001_bookmarks.sql", include_str!("migrations/001_bookmarks.sql"))];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the document database. Cheap to clone; every clone
/// checks sessions out of the same bounded pool.
#[derive(Clone)]
pub struct Database {
    db: Arc<LibsqlDatabase>,
    sessions: Arc<Semaphore>,
}

/// A connection checked out from `Database`. Dropping it hands the slot back
/// to the pool, whichever way the owning operation returns.
pub struct Session {
    conn: Connection,
    _permit: OwnedSemaphorePermit,
}

impl Deref for Session {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Database {
    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = resolve_db_path(cfg.app.get_db(), data_dir);
        Self::open(&path, cfg.app.get_max_sessions()).await
    }

    pub async fn open(path: &Path, max_sessions: usize) -> Result<Self> {
        tracing::info!(path = ?path, max_sessions, "[db] opening document store");
        let db = Builder::new_local(path).build().await?;

        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;
        // journal_mode returns a row, so it has to go through query
        conn.query("PRAGMA journal_mode = WAL", ()).await?;

        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        for (filename, sql) in MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        Ok(Database {
            db: Arc::new(db),
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
        })
    }

    /// Checks out a session, waiting while all slots are in use.
    pub async fn session(&self) -> Result<Session, StorageError> {
        let permit = self
            .sessions
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| StorageError::Unavailable("database is closed".to_string()))?;

        let conn = self
            .db
            .connect()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        tracing::debug!(available = self.sessions.available_permits(), "[db] session checked out");
        Ok(Session { conn, _permit: permit })
    }

    /// Refuses further checkouts. Sessions already out finish normally.
    pub fn close(&self) {
        self.sessions.close();
        tracing::info!("[db] closed for new sessions");
    }

    pub fn is_closed(&self) -> bool {
        self.sessions.is_closed()
    }

    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name])
            .await
            .with_context(|| format!("failed to record migration {name}"))?;
        Ok(())
    }

    /// Applies `sql` and records it in one transaction, so a migration that
    /// fails halfway is neither half-applied nor marked as done.
    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        let tx = conn.transaction().await?;
        tx.execute_batch(sql)
            .await
            .with_context(|| format!("failed to execute migration {name}"))?;
        Self::record_migration(&tx, name).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn resolve_db_path(db: &str, data_dir: &Path) -> PathBuf {
    let path = PathBuf::from(db);
    if path.is_absolute() { path } else { data_dir.join(path) }
}
