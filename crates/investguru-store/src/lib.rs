//! # investguru store
//!
//! DuckDB-backed persistence for user accounts and per-user watchlists.
//!
//! All values reach the database as bound parameters, never through string
//! interpolation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use investguru_store::{Store, StoreConfig};
//!
//! fn main() -> Result<(), investguru_store::StoreError> {
//!     let store = Store::open(StoreConfig::new("./data/investguru.duckdb"))?;
//!     let user = store.create_user("ada", "$argon2id$...")?;
//!     store.add_watchlist_item(user.id, "aapl")?;
//!     assert_eq!(store.list_watchlist(user.id)?[0].symbol, "AAPL");
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `schema_migrations` | Applied migration versions |
//! | `users` | Accounts with argon2 password hashes |
//! | `watchlist_items` | Symbols a user follows |

pub mod duckdb;
mod error;
pub mod migrations;

use std::fs;
use std::path::PathBuf;

use ::duckdb::{params, Connection, OptionalExt};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub use duckdb::ConnectionPool;
pub use error::StoreError;

/// Longest symbol a watchlist entry may hold.
pub const MAX_SYMBOL_LEN: usize = 16;

/// Configuration for the store database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Idle connections kept for reuse.
    pub max_idle_connections: usize,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            max_idle_connections: 4,
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// One symbol on a user's watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistItem {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub created_at: String,
}

/// Users and watchlists over a pooled `DuckDB` database.
#[derive(Clone)]
pub struct Store {
    pool: ConnectionPool,
}

impl Store {
    /// Open (creating if needed) the database described by `config` and
    /// bring its schema up to date.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let pool = ConnectionPool::open(config.db_path.clone(), config.max_idle_connections)?;
        let store = Self { pool };
        store.initialize()?;
        tracing::info!(db_path = %config.db_path.display(), "store opened");
        Ok(store)
    }

    /// Throwaway in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            pool: ConnectionPool::open_in_memory(2)?,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<(), StoreError> {
        self.pool.with_connection(|connection| {
            migrations::apply_migrations(connection)?;
            Ok(())
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Register a new user.
    ///
    /// # Errors
    /// [`StoreError::UsernameTaken`] when the name is already registered.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        self.pool.with_connection(|connection| {
            connection.execute_batch("BEGIN TRANSACTION")?;
            let result = (|| -> Result<UserRecord, StoreError> {
                if select_user_by_username(connection, username)?.is_some() {
                    return Err(StoreError::UsernameTaken(username.to_owned()));
                }

                let id = next_id(connection, "users_id_seq")?;
                let created_at = now_rfc3339()?;
                connection
                    .execute(
                        "INSERT INTO users (id, username, password_hash, created_at) \
                         VALUES (?, ?, ?, ?)",
                        params![id, username, password_hash, created_at],
                    )
                    .map_err(|error| {
                        if is_unique_violation(&error) {
                            StoreError::UsernameTaken(username.to_owned())
                        } else {
                            StoreError::DuckDb(error)
                        }
                    })?;

                Ok(UserRecord {
                    id,
                    username: username.to_owned(),
                    password_hash: password_hash.to_owned(),
                    created_at,
                })
            })();

            let user = finalize_transaction(connection, result)?;
            tracing::info!(user_id = user.id, "user registered");
            Ok(user)
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.pool
            .with_connection(|connection| select_user_by_username(connection, username))
    }

    pub fn find_user(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        self.pool.with_connection(|connection| {
            Ok(connection
                .query_row(
                    "SELECT id, username, password_hash, created_at FROM users WHERE id = ?",
                    params![id],
                    read_user,
                )
                .optional()?)
        })
    }

    /// Add `symbol` (trimmed, uppercased) to the user's watchlist.
    ///
    /// Duplicates are allowed; each call creates a new entry.
    pub fn add_watchlist_item(&self, user_id: i64, symbol: &str) -> Result<WatchlistItem, StoreError> {
        let symbol = normalize_watchlist_symbol(symbol)?;

        self.pool.with_connection(|connection| {
            let id = next_id(connection, "watchlist_items_id_seq")?;
            let created_at = now_rfc3339()?;
            connection.execute(
                "INSERT INTO watchlist_items (id, user_id, symbol, created_at) VALUES (?, ?, ?, ?)",
                params![id, user_id, symbol, created_at],
            )?;

            Ok(WatchlistItem {
                id,
                user_id,
                symbol,
                created_at,
            })
        })
    }

    /// Items owned by `user_id`, oldest first.
    pub fn list_watchlist(&self, user_id: i64) -> Result<Vec<WatchlistItem>, StoreError> {
        self.pool.with_connection(|connection| {
            let mut statement = connection.prepare(
                "SELECT id, user_id, symbol, created_at FROM watchlist_items \
                 WHERE user_id = ? ORDER BY id",
            )?;
            let rows = statement.query_map(params![user_id], |row| {
                Ok(WatchlistItem {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    symbol: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
    }

    /// Remove one of the user's own items.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the item does not exist or belongs to
    /// someone else.
    pub fn remove_watchlist_item(&self, user_id: i64, item_id: i64) -> Result<(), StoreError> {
        self.pool.with_connection(|connection| {
            let removed = connection.execute(
                "DELETE FROM watchlist_items WHERE id = ? AND user_id = ?",
                params![item_id, user_id],
            )?;
            if removed == 0 {
                return Err(StoreError::NotFound(format!("watchlist item {item_id}")));
            }
            Ok(())
        })
    }
}

/// Trim and uppercase a watchlist symbol, rejecting empty or oversized ones.
pub fn normalize_watchlist_symbol(symbol: &str) -> Result<String, StoreError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(StoreError::InvalidData(String::from("symbol cannot be empty")));
    }
    if symbol.chars().count() > MAX_SYMBOL_LEN {
        return Err(StoreError::InvalidData(format!(
            "symbol cannot be longer than {MAX_SYMBOL_LEN} characters"
        )));
    }
    Ok(symbol)
}

fn select_user_by_username(
    connection: &Connection,
    username: &str,
) -> Result<Option<UserRecord>, StoreError> {
    Ok(connection
        .query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
            params![username],
            read_user,
        )
        .optional()?)
}

fn read_user(row: &::duckdb::Row<'_>) -> Result<UserRecord, ::duckdb::Error> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn next_id(connection: &Connection, sequence: &'static str) -> Result<i64, StoreError> {
    let sql = format!("SELECT nextval('{sequence}')");
    Ok(connection.query_row(sql.as_str(), [], |row| row.get(0))?)
}

fn now_rfc3339() -> Result<String, StoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|error| StoreError::InvalidData(format!("failed to format timestamp: {error}")))
}

fn is_unique_violation(error: &::duckdb::Error) -> bool {
    let message = error.to_string();
    message.contains("Duplicate key") || message.contains("unique constraint")
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}
