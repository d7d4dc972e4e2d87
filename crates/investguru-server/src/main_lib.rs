use std::sync::Arc;

use investguru_core::QuoteResolver;
use investguru_store::{Store, StoreConfig};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::auth::AuthManager;
use crate::config::Config;
use crate::jobs::{JobQueue, DEFAULT_QUEUE_CAPACITY};

/// Log output format selector: `json` or anything else for plain text.
pub const LOG_FORMAT_ENV: &str = "INVESTGURU_LOG_FORMAT";

pub struct AppState {
    pub env: String,
    pub store: Store,
    pub resolver: QuoteResolver,
    pub auth: Arc<AuthManager>,
    pub jobs: JobQueue,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|value| value.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Open the store, build the resolver and start the job workers.
///
/// Must run inside a tokio runtime.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    if config.jwt_secret == crate::config::DEFAULT_JWT_SECRET {
        tracing::warn!("INVESTGURU_JWT_SECRET is not set, using the insecure default");
    }

    let store_config = StoreConfig::new(config.db_path.clone());
    let store = tokio::task::spawn_blocking(move || Store::open(store_config)).await??;

    let resolver = config.resolver.clone().build();
    tracing::info!(
        sources = ?resolver.priority(),
        fetch_timeout_ms = u64::try_from(resolver.fetch_timeout().as_millis()).unwrap_or(u64::MAX),
        "quote resolver ready"
    );

    let jobs = JobQueue::start(resolver.clone(), config.job_workers, DEFAULT_QUEUE_CAPACITY)
        .with_retention(config.job_retention)
        .with_max_tracked(config.job_max_tracked);

    Ok(Arc::new(AppState {
        env: config.env.clone(),
        store,
        resolver,
        auth: Arc::new(AuthManager::new(&config.jwt_secret, config.token_ttl)),
        jobs,
    }))
}
