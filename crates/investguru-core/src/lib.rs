//! # investguru core
//!
//! Turns a free-form ticker into a normalized quote by asking several
//! upstream providers in priority order.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo chart, Stooq CSV) |
//! | [`data_source`] | Quote source trait and adapter error types |
//! | [`domain`] | Quote record and symbol normalizer |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`resolver`] | Resolution engine and its builder |
//! | [`source`] | Provider identifiers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use investguru_core::ResolverBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = ResolverBuilder::from_env()?.build();
//!
//!     match resolver.resolve("appl").await {
//!         Ok(quote) => println!("{} {} via {}", quote.symbol, quote.close, quote.source),
//!         Err(unresolved) => eprintln!("{unresolved}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! raw ticker
//!     │
//!     ▼
//! ┌─────────────────┐
//! │ normalize()     │  AAPL, AAPL.US, AAPL.us
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ QuoteResolver   │────▶│ QuoteSource      │ (Yahoo, Stooq, ...)
//! │ providers ×     │     └────────┬─────────┘
//! │ candidates      │              ▼
//! └─────────────────┘     ┌──────────────────┐
//!                         │ HttpClient       │
//!                         └──────────────────┘
//! ```

pub mod adapters;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod resolver;
pub mod source;

pub use adapters::{StooqAdapter, YahooAdapter};
pub use data_source::{FetchFuture, FetchResult, QuoteSource, SourceError, SourceErrorKind};
pub use domain::{canonical_symbol, normalize, CandidateList, QuoteRecord, US_MARKET_SUFFIX};
pub use error::ValidationError;
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use resolver::{
    resolve, resolve_with_timeout, Attempt, AttemptOutcome, QuoteResolver, Resolution,
    ResolverBuilder, SourceFailure, Unresolved,
};
pub use source::ProviderId;
