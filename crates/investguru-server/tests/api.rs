use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use investguru_core::{
    FetchFuture, ProviderId, QuoteRecord, QuoteSource, ResolverBuilder, SourceError,
};
use investguru_server::{app_router, build_state, Config};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

/// Knows `MSFT.US` only; `BROKEN` always fails with a provider outage.
struct CannedSource;

impl QuoteSource for CannedSource {
    fn id(&self) -> ProviderId {
        ProviderId::Stooq
    }

    fn fetch<'a>(&'a self, candidate: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            match candidate {
                "MSFT.US" => QuoteRecord::new(candidate, "410.50", ProviderId::Stooq)
                    .map(|quote| Some(quote.with_name(Some(String::from("Microsoft")))))
                    .map_err(|e| SourceError::malformed(e.to_string())),
                "BROKEN" | "BROKEN.US" => Err(SourceError::unavailable("stooq is down")),
                _ => Ok(None),
            }
        })
    }
}

struct TestApp {
    router: Router,
    _dir: TempDir,
}

async fn build_test_app() -> TestApp {
    build_test_app_with(|_| {}).await
}

async fn build_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("api.duckdb");
    let mut config = Config::from_lookup(|name| match name {
        "INVESTGURU_DB_PATH" => Some(db_path.display().to_string()),
        "INVESTGURU_JWT_SECRET" => Some(String::from("test-secret")),
        "INVESTGURU_ENV" => Some(String::from("test")),
        _ => None,
    })
    .unwrap();
    let source: Arc<dyn QuoteSource> = Arc::new(CannedSource);
    config.resolver = ResolverBuilder::new().with_source(source);
    configure(&mut config);

    let state = build_state(&config).await.unwrap();
    TestApp {
        router: app_router(state, &config),
        _dir: dir,
    }
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register_and_login(app: &TestApp, username: &str) -> String {
    let credentials = json!({ "username": username, "password": "secret123" });
    let (status, _) = send(app, Method::POST, "/auth/register", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, Method::POST, "/auth/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

// =============================================================================
// Health and quotes
// =============================================================================

#[tokio::test]
async fn health_reports_environment() {
    let app = build_test_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "env": "test" }));
}

#[tokio::test]
async fn quote_lookup_returns_canonical_record() {
    // Given: a source that only knows the suffixed form
    let app = build_test_app().await;

    // When: the bare lowercase ticker is requested
    let (status, body) = send(&app, Method::GET, "/quotes/msft", None, None).await;

    // Then: the suffix fallback resolves it under the canonical symbol
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "MSFT");
    assert_eq!(body["close"], "410.50");
    assert_eq!(body["name"], "Microsoft");
    assert_eq!(body["source"], "stooq");
}

#[tokio::test]
async fn unknown_and_failing_symbols_both_return_not_found() {
    let app = build_test_app().await;

    let (status, body) = send(&app, Method::GET, "/quotes/XYZ", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        "No quote data found for 'XYZ'. Try a valid ticker like AAPL or MSFT."
    );

    let (status, body) = send(&app, Method::GET, "/quotes/BROKEN", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn me_requires_a_valid_token() {
    let app = build_test_app().await;

    let (status, body) = send(&app, Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing token");

    let (status, body) = send(&app, Method::GET, "/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");

    let token = register_and_login(&app, "ada").await;
    let (status, body) = send(&app, Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ada");
    assert!(body["id"].as_i64().is_some());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = build_test_app().await;
    register_and_login(&app, "ada").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "ada", "password": "another1" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
async fn wrong_password_and_short_credentials_are_rejected() {
    let app = build_test_app().await;
    register_and_login(&app, "ada").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "ada", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "ab", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Watchlist
// =============================================================================

#[tokio::test]
async fn watchlist_is_scoped_to_the_caller() {
    // Given: two users, one with a watchlist entry
    let app = build_test_app().await;
    let ada = register_and_login(&app, "ada").await;
    let bob = register_and_login(&app, "bob").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/watchlist",
        Some(&ada),
        Some(json!({ "symbol": " aapl " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "symbol": "AAPL" }));

    // When: each user lists their watchlist
    let (_, ada_items) = send(&app, Method::GET, "/watchlist", Some(&ada), None).await;
    let (_, bob_items) = send(&app, Method::GET, "/watchlist", Some(&bob), None).await;

    // Then: only the owner sees the entry, and only the owner can delete it
    let items = ada_items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["symbol"], "AAPL");
    assert_eq!(bob_items, json!([]));

    let item_id = items[0]["id"].as_i64().unwrap();
    let uri = format!("/watchlist/{item_id}");
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (_, ada_items) = send(&app, Method::GET, "/watchlist", Some(&ada), None).await;
    assert_eq!(ada_items, json!([]));
}

#[tokio::test]
async fn watchlist_rejects_oversized_symbols() {
    let app = build_test_app().await;
    let token = register_and_login(&app, "ada").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/watchlist",
        Some(&token),
        Some(json!({ "symbol": "ABCDEFGHIJKLMNOPQ" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Background jobs
// =============================================================================

#[tokio::test]
async fn quote_job_runs_to_completion() {
    let app = build_test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/jobs/quote",
        None,
        Some(json!({ "symbol": "msft" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let uri = format!("/jobs/{job_id}");

    let mut last = Value::Null;
    for _ in 0..200 {
        let (status, body) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "finished" || body["status"] == "failed" {
            last = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(last["id"], job_id.as_str());
    assert_eq!(last["status"], "finished");
    assert_eq!(last["result"]["symbol"], "MSFT");
}

#[tokio::test]
async fn expired_job_is_not_found() {
    // Given: completed jobs are kept for 50ms only
    let app = build_test_app_with(|config| config.job_retention = Duration::from_millis(50)).await;
    let (_, body) = send(
        &app,
        Method::POST,
        "/jobs/quote",
        None,
        Some(json!({ "symbol": "xyz" })),
    )
    .await;
    let uri = format!("/jobs/{}", body["job_id"].as_str().unwrap());

    // When: the job completes and the retention period passes
    let mut completed = false;
    for _ in 0..200 {
        let (_, body) = send(&app, Method::GET, &uri, None, None).await;
        if body["status"] == "failed" {
            completed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert!(completed, "job should fail for an unknown symbol");
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Then: the job is gone
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Job not found");
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let app = build_test_app().await;

    let (status, _) = send(&app, Method::GET, "/jobs/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/jobs/{}", uuid_like());
    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn uuid_like() -> &'static str {
    "00000000-0000-4000-8000-000000000000"
}
