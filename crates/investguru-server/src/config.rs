use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use investguru_core::ResolverBuilder;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8100";
pub const DEFAULT_DB_PATH: &str = "./data/investguru.duckdb";
pub const DEFAULT_JWT_SECRET: &str = "CHANGE_ME";
pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 60 * 24;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";
pub const DEFAULT_JOB_WORKERS: usize = 2;
pub const DEFAULT_JOB_RETENTION_SECS: u64 = crate::jobs::DEFAULT_RETENTION.as_secs();
pub const DEFAULT_JOB_MAX_TRACKED: usize = crate::jobs::DEFAULT_MAX_TRACKED;

/// Server settings, read once at startup.
///
/// | Variable | Default |
/// |----------|---------|
/// | `INVESTGURU_ENV` | `local` |
/// | `INVESTGURU_LISTEN_ADDR` | `0.0.0.0:8100` |
/// | `INVESTGURU_DB_PATH` | `./data/investguru.duckdb` |
/// | `INVESTGURU_JWT_SECRET` | `CHANGE_ME` |
/// | `INVESTGURU_TOKEN_TTL_MINUTES` | `1440` |
/// | `INVESTGURU_ALLOWED_ORIGINS` | `http://localhost:3000` |
/// | `INVESTGURU_JOB_WORKERS` | `2` |
/// | `INVESTGURU_JOB_RETENTION_SECS` | `500` |
/// | `INVESTGURU_JOB_MAX_TRACKED` | `10000` |
///
/// Resolver settings (`INVESTGURU_SOURCES`, `INVESTGURU_FETCH_TIMEOUT_MS`,
/// `INVESTGURU_MAX_IN_FLIGHT`) are read by [`ResolverBuilder::from_lookup`].
#[derive(Clone)]
pub struct Config {
    pub env: String,
    pub listen_addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub cors_allow: Vec<String>,
    pub job_workers: usize,
    /// How long finished and failed jobs stay queryable.
    pub job_retention: Duration,
    pub job_max_tracked: usize,
    pub resolver: ResolverBuilder,
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; unset or blank values use defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let env = read("INVESTGURU_ENV").unwrap_or_else(|| String::from("local"));
        let listen_addr = read("INVESTGURU_LISTEN_ADDR")
            .unwrap_or_else(|| String::from(DEFAULT_LISTEN_ADDR))
            .trim()
            .parse::<SocketAddr>()
            .context("invalid INVESTGURU_LISTEN_ADDR")?;
        let db_path = read("INVESTGURU_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let jwt_secret =
            read("INVESTGURU_JWT_SECRET").unwrap_or_else(|| String::from(DEFAULT_JWT_SECRET));

        let ttl_minutes =
            positive(&read, "INVESTGURU_TOKEN_TTL_MINUTES", DEFAULT_TOKEN_TTL_MINUTES)?;
        let token_ttl = ttl_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .context("INVESTGURU_TOKEN_TTL_MINUTES is too large")?;

        let cors_allow = read("INVESTGURU_ALLOWED_ORIGINS")
            .unwrap_or_else(|| String::from(DEFAULT_ALLOWED_ORIGINS))
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let job_workers = positive(&read, "INVESTGURU_JOB_WORKERS", DEFAULT_JOB_WORKERS)?;
        let job_retention = Duration::from_secs(positive(
            &read,
            "INVESTGURU_JOB_RETENTION_SECS",
            DEFAULT_JOB_RETENTION_SECS,
        )?);
        let job_max_tracked =
            positive(&read, "INVESTGURU_JOB_MAX_TRACKED", DEFAULT_JOB_MAX_TRACKED)?;

        let resolver = ResolverBuilder::from_lookup(&lookup)?;

        Ok(Self {
            env,
            listen_addr,
            db_path,
            jwt_secret,
            token_ttl,
            cors_allow,
            job_workers,
            job_retention,
            job_max_tracked,
            resolver,
        })
    }
}

/// Parse an optional strictly positive integer, falling back to `default`.
fn positive<T, R>(read: R, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
    R: Fn(&str) -> Option<String>,
{
    let Some(value) = read(name) else {
        return Ok(default);
    };
    let parsed = value
        .trim()
        .parse::<T>()
        .with_context(|| format!("invalid {name}"))?;
    if parsed == T::default() {
        anyhow::bail!("{name} must be greater than zero");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = config_with(&[]).expect("defaults");
        assert_eq!(config.env, "local");
        assert_eq!(config.listen_addr.port(), 8100);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.cors_allow, vec!["http://localhost:3000"]);
        assert_eq!(config.job_workers, 2);
        assert_eq!(config.job_retention, Duration::from_secs(500));
        assert_eq!(config.job_max_tracked, 10_000);
    }

    #[test]
    fn splits_allowed_origins() {
        let config = config_with(&[(
            "INVESTGURU_ALLOWED_ORIGINS",
            "http://a.test, http://b.test,,",
        )])
        .expect("valid");
        assert_eq!(config.cors_allow, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn invalid_values_fail_at_startup() {
        assert!(config_with(&[("INVESTGURU_LISTEN_ADDR", "nowhere")]).is_err());
        assert!(config_with(&[("INVESTGURU_JOB_WORKERS", "0")]).is_err());
        assert!(config_with(&[("INVESTGURU_TOKEN_TTL_MINUTES", "soon")]).is_err());
        assert!(config_with(&[("INVESTGURU_SOURCES", "bloomberg")]).is_err());
        assert!(config_with(&[("INVESTGURU_JOB_RETENTION_SECS", "0")]).is_err());
    }

    #[test]
    fn token_ttl_that_overflows_seconds_is_rejected() {
        let minutes = u64::MAX.to_string();
        let error = config_with(&[("INVESTGURU_TOKEN_TTL_MINUTES", minutes.as_str())])
            .err()
            .expect("overflow is an error");

        assert!(error.to_string().contains("too large"));
    }
}
