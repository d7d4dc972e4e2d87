use std::time::Instant;

use serde::Serialize;

use investguru_core::{
    Attempt, ProviderId, QuoteRecord, QuoteResolver, ResolverBuilder, Unresolved,
};

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct QuoteResponseData {
    quotes: Vec<QuoteRecord>,
    unresolved: Vec<UnresolvedSymbol>,
}

#[derive(Debug, Serialize)]
struct UnresolvedSymbol {
    symbol: String,
    message: String,
    errors: Vec<ProviderFailure>,
    attempts: Vec<Attempt>,
}

#[derive(Debug, Serialize)]
struct ProviderFailure {
    source: ProviderId,
    candidate: String,
    code: &'static str,
    message: String,
}

impl From<Unresolved> for UnresolvedSymbol {
    fn from(unresolved: Unresolved) -> Self {
        Self {
            symbol: unresolved.symbol().to_string(),
            message: unresolved.to_string(),
            errors: unresolved
                .failures()
                .iter()
                .map(|failure| ProviderFailure {
                    source: failure.source,
                    candidate: failure.candidate.clone(),
                    code: failure.error.code(),
                    message: failure.error.message().to_string(),
                })
                .collect(),
            attempts: Vec::new(),
        }
    }
}

pub async fn run(args: &QuoteArgs, builder: ResolverBuilder) -> Result<CommandResult, CliError> {
    let resolver = builder.build();
    let started = Instant::now();
    let (quotes, unresolved) = resolve_all(&resolver, &args.symbols).await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let warnings = unresolved
        .iter()
        .filter(|symbol| !symbol.errors.is_empty())
        .map(|symbol| {
            format!(
                "'{}' hit {} provider error(s); the result may change once providers recover",
                symbol.symbol,
                symbol.errors.len()
            )
        })
        .collect::<Vec<_>>();
    let unresolved_count = unresolved.len();

    let data = serde_json::to_value(QuoteResponseData { quotes, unresolved })?;
    Ok(CommandResult::ok(data, resolver.priority())
        .with_warnings(warnings)
        .with_unresolved(unresolved_count)
        .with_latency(latency_ms))
}

/// Symbols are resolved one after another, in argument order.
async fn resolve_all(
    resolver: &QuoteResolver,
    symbols: &[String],
) -> (Vec<QuoteRecord>, Vec<UnresolvedSymbol>) {
    let mut quotes = Vec::new();
    let mut unresolved = Vec::new();

    for symbol in symbols {
        let resolution = resolver.resolve_traced(symbol).await;
        let attempts = resolution.attempts.clone();
        match resolution.into_result() {
            Ok(quote) => quotes.push(quote),
            Err(failure) => unresolved.push(UnresolvedSymbol {
                attempts,
                ..UnresolvedSymbol::from(failure)
            }),
        }
    }

    (quotes, unresolved)
}
