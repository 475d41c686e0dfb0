//! SQLite storage implementation

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use rusqlite::{Connection, Params, Row, Transaction};
use serde::Serialize;
use utoipa::ToSchema;
use crate::{Result, Error};
use super::schema;

/// Shared handle to the SQLite database.
///
/// Wraps the single process-wide connection. Cloning is cheap and every clone
/// refers to the same connection; access is serialized by a mutex, so a
/// closure passed to [`Database::with_conn`] or [`Database::transaction`]
/// never interleaves with another caller's statements.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize the database schema.
    ///
    /// Idempotent: tables and indexes are only created when absent.
    pub fn initialize(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(schema::ENABLE_FOREIGN_KEYS)?;
            for stmt in schema::all_schema_statements() {
                conn.execute(stmt, [])?;
            }
            Ok(())
        })
    }

    /// Lock the connection, recovering it if a previous holder panicked.
    ///
    /// A panic inside [`Database::transaction`] unwinds through the
    /// transaction's drop, which rolls it back, so the connection is left
    /// consistent and can keep serving.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            tracing::warn!("recovering database connection after a panicked storage task");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Run a closure with exclusive access to the connection
    pub fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        f(&mut conn)
    }

    /// Run a closure inside a single transaction.
    ///
    /// Commits when the closure returns `Ok`; any `Err` drops the transaction,
    /// which rolls back every statement it issued.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }

    /// Run a closure against the connection on the blocking thread pool
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| Error::Internal(format!("storage task failed: {}", e)))?
    }

    /// Run a closure inside a single transaction on the blocking thread pool
    pub async fn run_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.transaction(f))
            .await
            .map_err(|e| Error::Internal(format!("storage task failed: {}", e)))?
    }

    /// Execute a parameter-bound statement, returning the affected row count
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute(sql, params)?))
    }

    /// Run a parameter-bound query, mapping every row
    pub fn query<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params, f)?
                .collect::<rusqlite::Result<Vec<T>>>()?;
            Ok(rows)
        })
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        self.with_conn(|conn| DbStats::collect(conn))
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DbStats {
    pub collections: usize,
    pub tags: usize,
    pub data_points: usize,
}

impl DbStats {
    /// Count the rows of every table
    pub fn collect(conn: &Connection) -> Result<Self> {
        let count = |table: &str| -> Result<usize> {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count as usize)
        };
        Ok(Self {
            collections: count("collections")?,
            tags: count("tags")?,
            data_points: count("data_points")?,
        })
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Collections: {}", self.collections)?;
        writeln!(f, "  Tags: {}", self.tags)?;
        writeln!(f, "  Data points: {}", self.data_points)
    }
}
