use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::data_source::{FetchFuture, FetchResult, QuoteSource, SourceError};
use crate::http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, DEFAULT_TIMEOUT_MS,
};
use crate::{canonical_symbol, ProviderId, QuoteRecord};

const CHART_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SEARCH_ENDPOINT: &str = "https://query1.finance.yahoo.com/v1/finance/search";
const REFERER: &str = "https://finance.yahoo.com/";

/// Priced-ticker quote source backed by Yahoo's public chart endpoint.
///
/// Resolution per candidate:
/// 1. daily chart snapshot, reading `meta.regularMarketPrice`
/// 2. when the snapshot has no price, the last non-null one-minute close
/// 3. on a price, a best-effort display-name lookup whose failure is dropped
///
/// `timeout_ms` is the budget for the whole fetch. The name lookup only gets
/// half of what the price requests left over, so a stalled search can never
/// outlive a caller's deadline of the same length.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

/// Chart lookup outcome: Yahoo answers unknown tickers with 404 or an empty result.
enum ChartLookup {
    Missing,
    Found(ChartResult),
}

impl YahooAdapter {
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

    async fn fetch_quote(&self, candidate: &str) -> FetchResult {
        if candidate.trim().is_empty() {
            return Ok(None);
        }

        let started = Instant::now();
        let Some(price) = self.last_price(candidate).await? else {
            return Ok(None);
        };
        let name = self.enrich_name(candidate, started.elapsed()).await;

        let quote = QuoteRecord::new(candidate, format_price(price), ProviderId::Yahoo)
            .map_err(|error| SourceError::internal(error.to_string()))?;
        Ok(Some(quote.with_name(name)))
    }

    /// Enrichment only; a failed or late lookup leaves the name empty.
    async fn enrich_name(&self, candidate: &str, spent: Duration) -> Option<String> {
        let budget = self.timeout().saturating_sub(spent) / 2;
        if budget.is_zero() {
            tracing::debug!(candidate, "no time left for yahoo name lookup");
            return None;
        }

        match tokio::time::timeout(budget, self.display_name(candidate, budget)).await {
            Ok(Ok(name)) => name,
            Ok(Err(error)) => {
                tracing::debug!(candidate, %error, "yahoo name lookup failed");
                None
            }
            Err(_) => {
                tracing::debug!(candidate, ?budget, "yahoo name lookup timed out");
                None
            }
        }
    }

    async fn last_price(&self, candidate: &str) -> Result<Option<f64>, SourceError> {
        let snapshot = match self.chart(candidate, "1d").await? {
            ChartLookup::Missing => return Ok(None),
            ChartLookup::Found(result) => result,
        };
        if let Some(price) = snapshot.meta.regular_market_price.filter(|p| p.is_finite()) {
            return Ok(Some(price));
        }

        match self.chart(candidate, "1m").await? {
            ChartLookup::Missing => Ok(None),
            ChartLookup::Found(intraday) => Ok(intraday.last_close()),
        }
    }

    async fn chart(&self, candidate: &str, interval: &str) -> Result<ChartLookup, SourceError> {
        let url = chart_url(candidate, interval);
        let response = self.get(url, self.timeout()).await?;

        if response.status == 404 {
            return Ok(ChartLookup::Missing);
        }
        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "yahoo returned status {}",
                response.status
            )));
        }

        let envelope: ChartEnvelope = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::malformed(format!("failed to parse yahoo chart: {e}")))?;

        Ok(envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .map_or(ChartLookup::Missing, ChartLookup::Found))
    }

    async fn display_name(
        &self,
        candidate: &str,
        budget: Duration,
    ) -> Result<Option<String>, SourceError> {
        let response = self.get(search_url(candidate), budget).await?;
        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "yahoo search returned status {}",
                response.status
            )));
        }

        let search: SearchResponse = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::malformed(format!("failed to parse yahoo search: {e}")))?;

        let wanted = canonical_symbol(candidate);
        Ok(search
            .quotes
            .into_iter()
            .find(|hit| canonical_symbol(&hit.symbol) == wanted)
            .and_then(|hit| hit.shortname.or(hit.longname)))
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    async fn get(&self, url: String, timeout: Duration) -> Result<HttpResponse, SourceError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_timeout_ms(timeout_ms);

        self.http_client
            .execute(request)
            .await
            .map_err(|error| transport_error(&error, timeout))
    }
}

fn transport_error(error: &HttpError, timeout: Duration) -> SourceError {
    if error.is_timeout() {
        SourceError::timeout(timeout)
    } else {
        SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
    }
}

impl QuoteSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch<'a>(&'a self, candidate: &'a str) -> FetchFuture<'a> {
        Box::pin(self.fetch_quote(candidate))
    }
}

pub fn chart_url(candidate: &str, interval: &str) -> String {
    format!(
        "{CHART_ENDPOINT}/{}?range=1d&interval={interval}",
        urlencoding::encode(candidate)
    )
}

pub fn search_url(candidate: &str) -> String {
    format!(
        "{SEARCH_ENDPOINT}?q={}&quotesCount=1&newsCount=0",
        urlencoding::encode(candidate)
    )
}

fn format_price(price: f64) -> String {
    format!("{price}")
}

// ============================================================================
// Yahoo response payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

impl ChartResult {
    fn last_close(&self) -> Option<f64> {
        self.indicators
            .as_ref()?
            .quote
            .first()?
            .close
            .iter()
            .rev()
            .flatten()
            .copied()
            .find(|close| close.is_finite())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: String,
    shortname: Option<String>,
    longname: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    type Route = (&'static str, Result<HttpResponse, HttpError>);

    /// Answers the first route whose key is contained in the URL, 404 otherwise.
    struct RoutedHttpClient {
        routes: Vec<Route>,
        requests: Mutex<Vec<String>>,
    }

    impl RoutedHttpClient {
        fn new(routes: Vec<Route>) -> Arc<Self> {
            Arc::new(Self {
                routes,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded_urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RoutedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = self
                .routes
                .iter()
                .find(|(key, _)| request.url.contains(key))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "")));
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request.url);
            Box::pin(async move { response })
        }
    }

    fn chart_with_price(price: &str) -> Result<HttpResponse, HttpError> {
        Ok(HttpResponse::ok(format!(
            r#"{{"chart":{{"result":[{{"meta":{{"symbol":"AAPL","regularMarketPrice":{price}}}}}],"error":null}}}}"#
        )))
    }

    fn search_hit(symbol: &str, name: &str) -> Result<HttpResponse, HttpError> {
        Ok(HttpResponse::ok(format!(
            r#"{{"quotes":[{{"symbol":"{symbol}","shortname":"{name}"}}]}}"#
        )))
    }

    #[tokio::test]
    async fn snapshot_price_with_display_name() {
        let client = RoutedHttpClient::new(vec![
            ("interval=1d", chart_with_price("189.84")),
            ("/search", search_hit("AAPL", "Apple Inc.")),
        ]);
        let adapter = YahooAdapter::with_http_client(client.clone());

        let quote = adapter
            .fetch("AAPL.US")
            .await
            .expect("no hard error")
            .expect("price present");

        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.close, "189.84");
        assert_eq!(quote.name.as_deref(), Some("Apple Inc."));
        assert_eq!(quote.source, ProviderId::Yahoo);
        assert!(quote.open.is_none() && quote.date.is_none());
        assert!(client.recorded_urls()[0].contains("/chart/AAPL.US?"));
    }

    #[tokio::test]
    async fn falls_back_to_last_intraday_close() {
        let client = RoutedHttpClient::new(vec![
            (
                "interval=1d",
                Ok(HttpResponse::ok(
                    r#"{"chart":{"result":[{"meta":{"symbol":"MSFT"}}]}}"#,
                )),
            ),
            (
                "interval=1m",
                Ok(HttpResponse::ok(
                    r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{"close":[410.5,411.25,null]}]}}]}}"#,
                )),
            ),
        ]);
        let adapter = YahooAdapter::with_http_client(client);

        let quote = adapter.fetch("MSFT").await.expect("ok").expect("price");
        assert_eq!(quote.close, "411.25");
        assert!(quote.name.is_none());
    }

    #[tokio::test]
    async fn unknown_symbol_is_no_data_without_intraday_call() {
        let client = RoutedHttpClient::new(vec![(
            "interval=1d",
            Ok(HttpResponse::new(
                404,
                r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#,
            )),
        )]);
        let adapter = YahooAdapter::with_http_client(client.clone());

        assert_eq!(adapter.fetch("NOPE").await, Ok(None));
        assert_eq!(client.recorded_urls().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_hard_error() {
        let client = RoutedHttpClient::new(vec![(
            "/chart/",
            Err(HttpError::new("connection reset")),
        )]);
        let adapter = YahooAdapter::with_http_client(client);

        let error = adapter.fetch("AAPL").await.expect_err("hard error");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.message().contains("connection reset"));
    }

    #[tokio::test]
    async fn transport_timeout_is_classified() {
        let client = RoutedHttpClient::new(vec![(
            "/chart/",
            Err(HttpError::timeout("deadline elapsed")),
        )]);
        let adapter = YahooAdapter::with_http_client(client).with_timeout_ms(50);

        let error = adapter.fetch("AAPL").await.expect_err("hard error");
        assert_eq!(error.kind(), SourceErrorKind::Timeout);
    }

    #[tokio::test]
    async fn server_error_and_garbage_body_are_hard_errors() {
        let failing = RoutedHttpClient::new(vec![(
            "/chart/",
            Ok(HttpResponse::new(503, "busy")),
        )]);
        let error = YahooAdapter::with_http_client(failing)
            .fetch("AAPL")
            .await
            .expect_err("503 is a hard error");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);

        let garbage = RoutedHttpClient::new(vec![("/chart/", Ok(HttpResponse::ok("<html>")))]);
        let error = YahooAdapter::with_http_client(garbage)
            .fetch("AAPL")
            .await
            .expect_err("undecodable body is a hard error");
        assert_eq!(error.kind(), SourceErrorKind::Malformed);
    }

    #[tokio::test]
    async fn failed_name_lookup_is_swallowed() {
        let client = RoutedHttpClient::new(vec![
            ("interval=1d", chart_with_price("99.5")),
            ("/search", Err(HttpError::new("dns failure"))),
        ]);
        let adapter = YahooAdapter::with_http_client(client);

        let quote = adapter.fetch("IBM").await.expect("name failure is soft");
        let quote = quote.expect("price present");
        assert_eq!(quote.close, "99.5");
        assert!(quote.name.is_none());
    }

    #[tokio::test]
    async fn name_from_different_symbol_is_ignored() {
        let client = RoutedHttpClient::new(vec![
            ("interval=1d", chart_with_price("10")),
            ("/search", search_hit("GOOG", "Alphabet Inc.")),
        ]);
        let adapter = YahooAdapter::with_http_client(client);

        let quote = adapter.fetch("GOOGL").await.expect("ok").expect("price");
        assert_eq!(quote.close, "10");
        assert!(quote.name.is_none());
    }

    #[tokio::test]
    async fn blank_candidate_is_no_data() {
        let client = RoutedHttpClient::new(Vec::new());
        let adapter = YahooAdapter::with_http_client(client.clone());

        assert_eq!(adapter.fetch("  ").await, Ok(None));
        assert!(client.recorded_urls().is_empty());
    }
}
