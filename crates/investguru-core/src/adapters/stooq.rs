use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::data_source::{FetchFuture, FetchResult, QuoteSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient, DEFAULT_TIMEOUT_MS};
use crate::{ProviderId, QuoteRecord};

const QUOTE_ENDPOINT: &str = "https://stooq.com/q/l/";

/// Value Stooq writes into a column it has no data for.
pub const NO_DATA_SENTINEL: &str = "N/D";

const SENTINEL_COLUMNS: [&str; 6] = ["date", "time", "open", "high", "low", "close"];

/// CSV-over-HTTP quote source backed by Stooq's light quote endpoint.
#[derive(Clone)]
pub struct StooqAdapter {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl Default for StooqAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl StooqAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn fetch_csv(&self, candidate: &str) -> FetchResult {
        let request = HttpRequest::get(quote_url(candidate)).with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.is_timeout() {
                SourceError::timeout(Duration::from_millis(self.timeout_ms))
            } else {
                SourceError::unavailable(format!("stooq transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "stooq returned status {}",
                response.status
            )));
        }

        Ok(parse_quote_csv(&response.body, candidate))
    }
}

impl QuoteSource for StooqAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Stooq
    }

    fn fetch<'a>(&'a self, candidate: &'a str) -> FetchFuture<'a> {
        Box::pin(self.fetch_csv(candidate))
    }
}

/// Build the quote URL; Stooq expects lowercase tickers.
pub fn quote_url(candidate: &str) -> String {
    format!(
        "{QUOTE_ENDPOINT}?s={}&f=sd2t2ohlcvn&h&e=csv",
        urlencoding::encode(&candidate.to_ascii_lowercase())
    )
}

/// Parse a header + data row CSV payload.
///
/// Returns `None` for every shape Stooq uses to say "unknown symbol": fewer
/// than two non-blank lines, a sentinel in any date/time/OHLC column, or a
/// missing close.
pub fn parse_quote_csv(body: &str, candidate: &str) -> Option<QuoteRecord> {
    let mut lines = body.lines().map(str::trim).filter(|line| !line.is_empty());
    let header = lines.next()?;
    let values = lines.next()?;

    let row = header
        .split(',')
        .map(|name| name.trim().to_ascii_lowercase())
        .zip(values.split(',').map(|value| value.trim().to_owned()))
        .collect::<HashMap<_, _>>();

    let has_sentinel = SENTINEL_COLUMNS.iter().any(|column| {
        row.get(*column)
            .is_some_and(|value| value.eq_ignore_ascii_case(NO_DATA_SENTINEL))
    });
    if has_sentinel {
        return None;
    }

    let field = |name: &str| row.get(name).filter(|value| !value.is_empty()).cloned();
    let symbol = field("symbol").unwrap_or_else(|| candidate.to_owned());

    let quote = QuoteRecord::new(&symbol, field("close")?, ProviderId::Stooq).ok()?;
    Some(
        quote
            .with_name(field("name"))
            .with_timestamp(field("date"), field("time"))
            .with_range(field("open"), field("high"), field("low"))
            .with_volume(field("volume")),
    )
}
