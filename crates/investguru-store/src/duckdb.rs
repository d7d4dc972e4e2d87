//! `DuckDB` connection pool management.
//!
//! A database file may only be opened once per process, so the pool owns a
//! single root [`Connection`] and hands out clones of it. Clones share the
//! same database instance and are returned to an idle list after use.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

use crate::StoreError;

struct PoolInner {
    db_path: Option<PathBuf>,
    max_idle: usize,
    root: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
}

/// Shared pool of cloned `DuckDB` connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Open the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, max_idle: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let root = Connection::open(&path)?;
        Self::from_root(root, Some(path), max_idle)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(max_idle: usize) -> Result<Self, StoreError> {
        let root = Connection::open_in_memory()?;
        Self::from_root(root, None, max_idle)
    }

    fn from_root(
        root: Connection,
        db_path: Option<PathBuf>,
        max_idle: usize,
    ) -> Result<Self, StoreError> {
        configure_connection(&root)?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                db_path,
                max_idle: max_idle.max(1),
                root: Mutex::new(root),
                idle: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Run `work` on a pooled connection.
    ///
    /// The connection goes back to the idle list afterwards, whether or not
    /// `work` succeeded.
    pub fn with_connection<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let connection = self.checkout()?;
        let result = work(&connection);
        self.checkin(connection);
        result
    }

    /// Path of the database file, `None` for in-memory databases.
    pub fn db_path(&self) -> Option<&Path> {
        self.inner.db_path.as_deref()
    }

    fn checkout(&self) -> Result<Connection, StoreError> {
        let idle = self
            .inner
            .idle
            .lock()
            .map_err(|_| StoreError::PoolPoisoned)?
            .pop();
        if let Some(connection) = idle {
            return Ok(connection);
        }

        let root = self.inner.root.lock().map_err(|_| StoreError::PoolPoisoned)?;
        let connection = root.try_clone()?;
        drop(root);
        configure_connection(&connection)?;
        Ok(connection)
    }

    fn checkin(&self, connection: Connection) {
        let Ok(mut idle) = self.inner.idle.lock() else {
            return;
        };
        if idle.len() < self.inner.max_idle {
            idle.push(connection);
        }
    }
}

fn configure_connection(connection: &Connection) -> Result<(), StoreError> {
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_database() {
        let pool = ConnectionPool::open_in_memory(2).expect("pool");

        pool.with_connection(|connection| {
            connection.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")?;
            Ok(())
        })
        .expect("write");

        // Force a second, distinct clone while the first is checked out.
        let value: i64 = pool
            .with_connection(|outer| {
                let inner: i64 = pool.with_connection(|connection| {
                    Ok(connection.query_row("SELECT v FROM t", [], |row| row.get(0))?)
                })?;
                let outer_value: i64 = outer.query_row("SELECT v FROM t", [], |row| row.get(0))?;
                Ok(inner + outer_value)
            })
            .expect("read");

        assert_eq!(value, 14);
        assert!(pool.db_path().is_none());
    }
}
