//! HTTP service over the investguru quote resolver.
//!
//! Exposes quote lookups, background quote jobs, user accounts and
//! per-user watchlists. State lives in a `DuckDB` file managed by
//! `investguru-store`.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod main_lib;

pub use api::app_router;
pub use config::Config;
pub use main_lib::{build_state, init_tracing, AppState};
