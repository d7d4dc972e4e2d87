mod candidates;
mod quote;
mod sources;

use std::time::Duration;

use investguru_core::{ProviderId, ResolverBuilder};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub unresolved: usize,
    pub latency_ms: u64,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            unresolved: 0,
            latency_ms: 0,
            source_chain,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_unresolved(mut self, unresolved: usize) -> Self {
        self.unresolved = unresolved;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::Quote(args) => quote::run(args, resolver_builder(cli)?).await,
        Command::Candidates(args) => candidates::run(args),
        Command::Sources => sources::run(&resolver_builder(cli)?),
    }
}

/// Environment settings first, then command-line overrides.
fn resolver_builder(cli: &Cli) -> Result<ResolverBuilder, CliError> {
    let mut builder = ResolverBuilder::from_env()?;

    if let Some(list) = cli.source.as_deref() {
        builder = builder.with_priority(ProviderId::parse_list(list)?);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        if timeout_ms == 0 {
            return Err(CliError::Argument(String::from(
                "--timeout-ms must be greater than zero",
            )));
        }
        builder = builder.with_fetch_timeout(Duration::from_millis(timeout_ms));
    }

    tracing::debug!(priority = ?builder.priority(), "resolver configured");
    Ok(builder)
}
