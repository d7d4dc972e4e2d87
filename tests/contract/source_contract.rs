use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use investguru_core::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ProviderId, QuoteSource, SourceErrorKind,
    StooqAdapter, YahooAdapter,
};

/// Replies to every request with the same canned response.
struct CannedHttpClient {
    response: Result<HttpResponse, HttpError>,
}

impl HttpClient for CannedHttpClient {
    fn execute<'a>(
        &'a self,
        _request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self.response.clone();
        Box::pin(async move { response })
    }
}

fn canned(response: Result<HttpResponse, HttpError>) -> Arc<dyn HttpClient> {
    Arc::new(CannedHttpClient { response })
}

struct ProviderCase {
    id: ProviderId,
    build: fn(Arc<dyn HttpClient>) -> Arc<dyn QuoteSource>,
    priced_body: &'static str,
    unknown_body: &'static str,
}

fn yahoo(client: Arc<dyn HttpClient>) -> Arc<dyn QuoteSource> {
    Arc::new(YahooAdapter::with_http_client(client))
}

fn stooq(client: Arc<dyn HttpClient>) -> Arc<dyn QuoteSource> {
    Arc::new(StooqAdapter::with_http_client(client))
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::Yahoo,
            build: yahoo,
            priced_body: r#"{"chart":{"result":[{"meta":{"regularMarketPrice":189.84}}]},"quotes":[]}"#,
            unknown_body: r#"{"chart":{"result":[]}}"#,
        },
        ProviderCase {
            id: ProviderId::Stooq,
            build: stooq,
            priced_body: "Symbol,Date,Time,Open,High,Low,Close,Volume,Name\n\
AAPL.US,2024-05-17,22:00:09,189.51,190.81,189.18,189.84,41282925,APPLE\n",
            unknown_body: "Symbol,Date,Time,Open,High,Low,Close,Volume,Name\n\
AAPL.US,N/D,N/D,N/D,N/D,N/D,N/D,N/D,AAPL.US\n",
        },
    ]
}

#[tokio::test]
async fn success_is_stamped_with_provider_and_canonical_symbol() {
    for case in provider_cases() {
        let source = (case.build)(canned(Ok(HttpResponse::ok(case.priced_body))));
        assert_eq!(source.id(), case.id);

        let quote = source.fetch("aapl.us").await
            .unwrap_or_else(|error| panic!("provider '{}' failed: {error}", case.id))
            .unwrap_or_else(|| panic!("provider '{}' returned no data", case.id));

        assert_eq!(quote.symbol, "AAPL", "provider '{}': symbol", case.id);
        assert_eq!(quote.close, "189.84", "provider '{}': close", case.id);
        assert_eq!(quote.source, case.id, "provider '{}': source tag", case.id);
    }
}

#[tokio::test]
async fn unknown_symbol_is_no_data_not_error() {
    for case in provider_cases() {
        let source = (case.build)(canned(Ok(HttpResponse::ok(case.unknown_body))));
        let outcome = source.fetch("ZZZZ").await;
        assert_eq!(outcome, Ok(None), "provider '{}'", case.id);
    }
}

#[tokio::test]
async fn transport_failure_is_hard_error() {
    for case in provider_cases() {
        let source = (case.build)(canned(Err(HttpError::new("connection refused"))));
        let error = source.fetch("AAPL").await
            .expect_err("transport failure must not look like no-data");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable, "provider '{}'", case.id);
    }
}

#[tokio::test]
async fn server_error_status_is_hard_error() {
    for case in provider_cases() {
        let source = (case.build)(canned(Ok(HttpResponse::new(502, "bad gateway"))));
        let error = source.fetch("AAPL").await
            .expect_err("non-2xx status must not look like no-data");
        assert!(
            error.code().starts_with("source."),
            "provider '{}': code {}",
            case.id,
            error.code()
        );
    }
}

#[tokio::test]
async fn adapters_are_reusable_across_calls() {
    for case in provider_cases() {
        let source = (case.build)(canned(Ok(HttpResponse::ok(case.priced_body))));
        let first = source.fetch("AAPL").await;
        let second = source.fetch("AAPL").await;
        assert_eq!(first, second, "provider '{}'", case.id);
    }
}
