//! Fixture store: an isolated SQLite database owned by one tester.
//!
//! The store is a cheap cloneable handle so a request handler under test can
//! hold it while the tester keeps its own copy.

use crate::error::{Error, Result, StoreError};
use crate::sql::{ExecuteStatement, load_setup_file, load_setup_string};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// URL of a fresh in-memory database.
pub const MEMORY_URL: &str = "sqlite::memory:";

/// Where a fixture store lives.
///
/// Accepts `:memory:`, `sqlite::memory:`, `sqlite://path` (so
/// `sqlite:///abs/path` for absolute paths) or a bare file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: MEMORY_URL.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Database path the URL refers to, `":memory:"` for in-memory stores.
    pub fn path(&self) -> &str {
        let url = self.url.as_str();
        if url == MEMORY_URL || url == ":memory:" {
            ":memory:"
        } else if let Some(path) = url.strip_prefix("sqlite://") {
            path
        } else {
            url
        }
    }
}

/// Handle to an open fixture store.
#[derive(Clone)]
pub struct FixtureStore {
    conn: Arc<Mutex<rusqlite::Connection>>,
    url: String,
}

impl std::fmt::Debug for FixtureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureStore")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl FixtureStore {
    /// Open an empty store.
    pub fn open(config: &StoreConfig) -> std::result::Result<Self, StoreError> {
        let path = config.path();
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(path)
        }
        .map_err(|e| StoreError {
            message: format!("Failed to open database: {e}"),
            url: Some(config.url.clone()),
        })?;
        tracing::debug!(url = %config.url, "opened fixture store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            url: config.url.clone(),
        })
    }

    /// Open a fresh in-memory store.
    pub fn open_in_memory() -> std::result::Result<Self, StoreError> {
        Self::open(&StoreConfig::default())
    }

    /// Open a store and run the fixture script in `path` against it.
    pub fn with_setup_file(config: &StoreConfig, path: &Path) -> Result<Self> {
        let mut store =
            Self::open(config).map_err(|e| Error::resource("error opening fixture store", e))?;
        if let Err(e) = load_setup_file(&mut store, path) {
            store.close_quietly();
            return Err(e);
        }
        Ok(store)
    }

    /// Open a store and run the fixture script `sql` against it.
    pub fn with_setup_string(config: &StoreConfig, sql: &str) -> Result<Self> {
        let mut store =
            Self::open(config).map_err(|e| Error::resource("error opening fixture store", e))?;
        if let Err(e) = load_setup_string(&mut store, sql) {
            store.close_quietly();
            return Err(e);
        }
        Ok(store)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lock the underlying connection for direct queries.
    pub fn lock(&self) -> std::result::Result<MutexGuard<'_, rusqlite::Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError {
            message: "Fixture store lock poisoned".to_string(),
            url: Some(self.url.clone()),
        })
    }

    /// Run a query and render its rows as tab-separated lines.
    ///
    /// NULL renders as `NULL` and blobs as `<blob>`. Statements that return
    /// no columns yield an empty string.
    pub fn query_text(&self, sql: &str) -> std::result::Result<String, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| self.error(format!("Failed to prepare statement: {e}")))?;
        let column_count = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value: rusqlite::types::Value = row.get(i)?;
                    values.push(match value {
                        rusqlite::types::Value::Null => "NULL".to_string(),
                        rusqlite::types::Value::Integer(n) => n.to_string(),
                        rusqlite::types::Value::Real(f) => f.to_string(),
                        rusqlite::types::Value::Text(s) => s,
                        rusqlite::types::Value::Blob(_) => "<blob>".to_string(),
                    });
                }
                Ok(values)
            })
            .map_err(|e| self.error(format!("Query failed: {e}")))?;

        let mut lines = Vec::new();
        for row in rows {
            let values = row.map_err(|e| self.error(format!("Failed to read row: {e}")))?;
            lines.push(values.join("\t"));
        }
        Ok(lines.join("\n"))
    }

    /// Release this handle, closing the database if it is the last one.
    pub fn close(self) -> std::result::Result<(), StoreError> {
        let url = self.url;
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner().map_err(|_| StoreError {
                    message: "Fixture store lock poisoned".to_string(),
                    url: Some(url.clone()),
                })?;
                conn.close().map_err(|(_, e)| StoreError {
                    message: format!("Failed to close database: {e}"),
                    url: Some(url.clone()),
                })?;
                tracing::debug!(url = %url, "closed fixture store");
                Ok(())
            }
            // Another holder (e.g. a handler) still has it; it closes on last drop.
            Err(_) => Ok(()),
        }
    }

    fn close_quietly(self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close fixture store");
        }
    }

    fn error(&self, message: String) -> StoreError {
        StoreError {
            message,
            url: Some(self.url.clone()),
        }
    }
}

impl ExecuteStatement for FixtureStore {
    /// Statements that produce rows are stepped to completion and the rows
    /// discarded. SQL made only of comments is a no-op.
    fn execute_statement(&mut self, sql: &str) -> std::result::Result<(), StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| self.error(format!("Failed to prepare statement: {e}")))?;
        if stmt.column_count() == 0 {
            // Covers comment-only SQL, which prepares to an empty statement.
            drop(stmt);
            conn.execute_batch(sql).map_err(|e| self.error(format!("Execute failed: {e}")))?;
        } else {
            let mut rows = stmt
                .query([])
                .map_err(|e| self.error(format!("Query failed: {e}")))?;
            while rows
                .next()
                .map_err(|e| self.error(format!("Failed to read row: {e}")))?
                .is_some()
            {}
        }
        Ok(())
    }
}
