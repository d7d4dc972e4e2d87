//! Quote source trait and adapter error types.
//!
//! Every upstream integration implements [`QuoteSource`]. A fetch has three
//! outcomes, encoded as `Result<Option<QuoteRecord>, SourceError>`:
//!
//! | Value | Meaning |
//! |-------|---------|
//! | `Ok(Some(quote))` | success |
//! | `Ok(None)` | no-data: the provider does not know this candidate |
//! | `Err(error)` | hard error: the provider malfunctioned |
//!
//! # Example
//!
//! ```rust,ignore
//! use investguru_core::{QuoteSource, StooqAdapter};
//!
//! async fn probe(adapter: &StooqAdapter) {
//!     match adapter.fetch("aapl.us").await {
//!         Ok(Some(quote)) => println!("{} {}", quote.symbol, quote.close),
//!         Ok(None) => println!("unknown symbol"),
//!         Err(error) => eprintln!("provider down: {error}"),
//!     }
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::{ProviderId, QuoteRecord};

/// Adapter-level hard error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transport failure or non-success upstream status.
    Unavailable,
    /// The fetch did not complete within its time budget.
    Timeout,
    /// The upstream answered with a payload that could not be decoded.
    Malformed,
    Internal,
}

/// Structured hard error reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn timeout(elapsed: Duration) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: format!("fetch timed out after {}ms", elapsed.as_millis()),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Outcome of fetching one candidate from one provider.
pub type FetchResult = Result<Option<QuoteRecord>, SourceError>;

/// Boxed future returned by [`QuoteSource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = FetchResult> + Send + 'a>>;

/// Quote source adapter contract.
///
/// Adapters are stateless: each `fetch` is independent, so one adapter value
/// can serve any number of concurrent resolutions. Candidates are never
/// validated up front; anything the provider does not recognise comes back
/// as `Ok(None)`.
pub trait QuoteSource: Send + Sync {
    /// Returns the provider identifier stamped on produced records.
    fn id(&self) -> ProviderId;

    /// Fetches a single candidate symbol.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the provider itself failed (transport,
    /// non-success status, undecodable payload). Unknown symbols are not
    /// errors.
    fn fetch<'a>(&'a self, candidate: &'a str) -> FetchFuture<'a>;
}
