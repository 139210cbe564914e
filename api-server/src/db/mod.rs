//! SQLite persistence.
//!
//! One connection behind a mutex; the lock is only held while a closure
//! passed to [`Database::with_conn`] runs, never across an await point.
//! Request handlers go through [`Database::call`], which runs that closure
//! on the blocking pool.

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Embedded migrations, applied in name order.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_create_users.sql",
        include_str!("migrations/0001_create_users.sql"),
    ),
    (
        "0002_create_watchlist.sql",
        include_str!("migrations/0002_create_watchlist.sql"),
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("could not prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection lock poisoned")]
    Poisoned,
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DbError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
        )
    }
}

/// Cloning shares the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path`. `:memory:` opens a private
    /// in-memory database.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T, DbError> {
        let mut conn = self.lock()?;
        Ok(f(&mut conn)?)
    }

    /// [`Database::with_conn`] on the blocking pool.
    pub async fn call<T, F>(&self, f: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f)).await?
    }

    /// Apply every migration not yet recorded in `schema_migrations`, each in
    /// its own transaction. Returns the ids applied by this call.
    pub fn run_migrations(&self) -> Result<Vec<&'static str>, DbError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_migrations (
                    id TEXT PRIMARY KEY,
                    applied_at TEXT NOT NULL
                );",
            )?;

            let applied: HashSet<String> = conn
                .prepare("SELECT id FROM schema_migrations")?
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;

            let mut pending: Vec<_> = MIGRATIONS
                .iter()
                .filter(|(id, _)| !applied.contains(*id))
                .collect();
            pending.sort_by_key(|(id, _)| *id);

            let mut newly_applied = vec![];
            for (id, sql) in pending {
                let tx = conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
                    params![id, Utc::now()],
                )?;
                tx.commit()?;
                log::info!("Applied migration {}", id);
                newly_applied.push(*id);
            }
            Ok(newly_applied)
        })
    }
}
