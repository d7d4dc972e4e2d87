use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::Instrument;

use crate::adapters::{StooqAdapter, YahooAdapter};
use crate::data_source::{QuoteSource, SourceError};
use crate::http_client::{HttpClient, ReqwestHttpClient, DEFAULT_MAX_IN_FLIGHT, DEFAULT_TIMEOUT_MS};
use crate::{normalize, CandidateList, ProviderId, QuoteRecord, ValidationError};

/// Provider priority used when nothing else is configured.
pub const DEFAULT_PRIORITY: [ProviderId; 2] = [ProviderId::Yahoo, ProviderId::Stooq];

pub const SOURCES_ENV: &str = "INVESTGURU_SOURCES";
pub const FETCH_TIMEOUT_ENV: &str = "INVESTGURU_FETCH_TIMEOUT_MS";
pub const MAX_IN_FLIGHT_ENV: &str = "INVESTGURU_MAX_IN_FLIGHT";

/// How a single provider/candidate fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    NoData,
    HardError,
}

/// One entry of the resolution attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub source: ProviderId,
    pub candidate: String,
    pub outcome: AttemptOutcome,
    pub latency_ms: u64,
}

/// A hard error observed for one provider/candidate pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: ProviderId,
    pub candidate: String,
    pub error: SourceError,
}

/// Terminal failure: every provider returned no-data or a hard error for
/// every candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No quote data found for '{raw}'. Try a valid ticker like AAPL or MSFT.")]
pub struct Unresolved {
    raw: String,
    candidates: CandidateList,
    failures: Vec<SourceFailure>,
}

impl Unresolved {
    /// The input exactly as the caller supplied it.
    pub fn symbol(&self) -> &str {
        &self.raw
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    /// Hard errors seen along the way, in attempt order.
    pub fn failures(&self) -> &[SourceFailure] {
        &self.failures
    }
}

/// Full outcome of one resolution, including the attempt log.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub raw: String,
    pub candidates: CandidateList,
    pub quote: Option<QuoteRecord>,
    pub attempts: Vec<Attempt>,
    pub failures: Vec<SourceFailure>,
    pub latency_ms: u64,
}

impl Resolution {
    pub fn into_result(self) -> Result<QuoteRecord, Unresolved> {
        match self.quote {
            Some(quote) => Ok(quote),
            None => Err(Unresolved {
                raw: self.raw,
                candidates: self.candidates,
                failures: self.failures,
            }),
        }
    }
}

/// Resolve `raw` against `sources` in the given order with the default
/// per-fetch timeout.
pub async fn resolve(
    raw: &str,
    sources: &[Arc<dyn QuoteSource>],
) -> Result<QuoteRecord, Unresolved> {
    resolve_with_timeout(raw, sources, Duration::from_millis(DEFAULT_TIMEOUT_MS))
        .await
        .into_result()
}

/// Walk providers × candidates: every candidate against the first provider,
/// then every candidate against the next one. First success wins.
pub async fn resolve_with_timeout(
    raw: &str,
    sources: &[Arc<dyn QuoteSource>],
    fetch_timeout: Duration,
) -> Resolution {
    let started = Instant::now();
    let candidates = normalize(raw);
    let span = tracing::info_span!("resolve", symbol = raw, candidates = %candidates);

    async {
        let mut attempts = Vec::with_capacity(sources.len() * candidates.len());
        let mut failures = Vec::new();

        for source in sources {
            let provider = source.id();
            for candidate in &candidates {
                let attempt_started = Instant::now();
                let result = tokio::time::timeout(fetch_timeout, source.fetch(candidate))
                    .await
                    .unwrap_or_else(|_| Err(SourceError::timeout(fetch_timeout)));

                let outcome = match result {
                    Ok(Some(quote)) => {
                        attempts.push(Attempt {
                            source: provider,
                            candidate: candidate.clone(),
                            outcome: AttemptOutcome::Success,
                            latency_ms: elapsed_ms(attempt_started),
                        });
                        tracing::info!(
                            source = %provider,
                            candidate = %candidate,
                            close = %quote.close,
                            "quote resolved"
                        );
                        return Resolution {
                            raw: raw.to_owned(),
                            candidates: candidates.clone(),
                            quote: Some(quote),
                            attempts,
                            failures,
                            latency_ms: elapsed_ms(started),
                        };
                    }
                    Ok(None) => {
                        tracing::debug!(source = %provider, candidate = %candidate, "no data");
                        AttemptOutcome::NoData
                    }
                    Err(error) => {
                        tracing::warn!(
                            source = %provider,
                            candidate = %candidate,
                            code = error.code(),
                            %error,
                            "source failed"
                        );
                        failures.push(SourceFailure {
                            source: provider,
                            candidate: candidate.clone(),
                            error,
                        });
                        AttemptOutcome::HardError
                    }
                };

                attempts.push(Attempt {
                    source: provider,
                    candidate: candidate.clone(),
                    outcome,
                    latency_ms: elapsed_ms(attempt_started),
                });
            }
        }

        tracing::info!(
            attempts = attempts.len(),
            hard_errors = failures.len(),
            "symbol unresolved"
        );
        Resolution {
            raw: raw.to_owned(),
            candidates: candidates.clone(),
            quote: None,
            attempts,
            failures,
            latency_ms: elapsed_ms(started),
        }
    }
    .instrument(span)
    .await
}

/// Ordered set of quote sources plus the per-fetch time budget.
///
/// Holds no mutable state; clone it freely and call [`resolve`](Self::resolve)
/// from as many tasks as needed.
#[derive(Clone)]
pub struct QuoteResolver {
    sources: Vec<Arc<dyn QuoteSource>>,
    fetch_timeout: Duration,
}

impl Default for QuoteResolver {
    fn default() -> Self {
        ResolverBuilder::new().build()
    }
}

impl QuoteResolver {
    /// Sources are consulted exactly in the given order, like [`resolve`].
    pub fn new(sources: Vec<Arc<dyn QuoteSource>>) -> Self {
        Self {
            sources,
            fetch_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Provider priority in effect.
    pub fn priority(&self) -> Vec<ProviderId> {
        self.sources.iter().map(|source| source.id()).collect()
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub async fn resolve(&self, raw: &str) -> Result<QuoteRecord, Unresolved> {
        self.resolve_traced(raw).await.into_result()
    }

    pub async fn resolve_traced(&self, raw: &str) -> Resolution {
        resolve_with_timeout(raw, &self.sources, self.fetch_timeout).await
    }
}

/// Builder for a [`QuoteResolver`] backed by the bundled adapters.
///
/// # Environment Variables
///
/// | Variable | Meaning | Default |
/// |----------|---------|---------|
/// | `INVESTGURU_SOURCES` | comma-separated provider priority | `yahoo,stooq` |
/// | `INVESTGURU_FETCH_TIMEOUT_MS` | per-fetch timeout | `10000` |
/// | `INVESTGURU_MAX_IN_FLIGHT` | bound on concurrent upstream requests | `16` |
///
/// # Example
///
/// ```rust,ignore
/// use investguru_core::ResolverBuilder;
///
/// let resolver = ResolverBuilder::from_env()?.build();
/// let quote = resolver.resolve("aapl").await?;
/// ```
#[derive(Clone)]
pub struct ResolverBuilder {
    priority: Vec<ProviderId>,
    fetch_timeout: Duration,
    max_in_flight: usize,
    http_client: Option<Arc<dyn HttpClient>>,
    sources: Vec<Arc<dyn QuoteSource>>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self {
            priority: DEFAULT_PRIORITY.to_vec(),
            fetch_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            http_client: None,
            sources: Vec::new(),
        }
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`; blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut builder = Self::new();

        if let Some(value) = read(SOURCES_ENV) {
            builder.priority = ProviderId::parse_list(&value)?;
        }
        if let Some(value) = read(FETCH_TIMEOUT_ENV) {
            let millis = parse_positive(FETCH_TIMEOUT_ENV, &value)?;
            builder.fetch_timeout = Duration::from_millis(millis);
        }
        if let Some(value) = read(MAX_IN_FLIGHT_ENV) {
            let bound = parse_positive(MAX_IN_FLIGHT_ENV, &value)?;
            builder.max_in_flight = usize::try_from(bound).map_err(|_| {
                ValidationError::InvalidSetting {
                    name: MAX_IN_FLIGHT_ENV,
                    value: value.clone(),
                    reason: "value is too large",
                }
            })?;
        }

        Ok(builder)
    }

    pub fn with_priority(mut self, priority: Vec<ProviderId>) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Transport shared by the bundled adapters.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Append an explicit source. Once any is given the priority list is
    /// ignored and sources are tried in the order they were added.
    pub fn with_source(mut self, source: Arc<dyn QuoteSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn priority(&self) -> &[ProviderId] {
        &self.priority
    }

    pub fn build(self) -> QuoteResolver {
        let sources = if self.sources.is_empty() {
            let http_client = self.http_client.unwrap_or_else(|| {
                Arc::new(ReqwestHttpClient::with_max_in_flight(self.max_in_flight))
            });
            let timeout_ms = u64::try_from(self.fetch_timeout.as_millis()).unwrap_or(u64::MAX);

            self.priority
                .iter()
                .filter_map(|provider| -> Option<Arc<dyn QuoteSource>> {
                    match provider {
                        ProviderId::Yahoo => Some(Arc::new(
                            YahooAdapter::with_http_client(Arc::clone(&http_client))
                                .with_timeout_ms(timeout_ms),
                        )),
                        ProviderId::Stooq => Some(Arc::new(
                            StooqAdapter::with_http_client(Arc::clone(&http_client))
                                .with_timeout_ms(timeout_ms),
                        )),
                        ProviderId::Other(name) => {
                            tracing::warn!(
                                provider = *name,
                                "no bundled adapter; add it with `with_source`"
                            );
                            None
                        }
                    }
                })
                .collect()
        } else {
            self.sources
        };

        QuoteResolver::new(sources).with_fetch_timeout(self.fetch_timeout)
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<u64, ValidationError> {
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        Ok(_) => Err(ValidationError::InvalidSetting {
            name,
            value: value.to_owned(),
            reason: "must be greater than zero",
        }),
        Err(_) => Err(ValidationError::InvalidSetting {
            name,
            value: value.to_owned(),
            reason: "expected a positive integer",
        }),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    let elapsed = started.elapsed().as_millis();
    u64::try_from(elapsed).unwrap_or(u64::MAX)
}
