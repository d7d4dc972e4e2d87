use serde::Serialize;

use investguru_core::{ProviderId, ResolverBuilder};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceStatus {
    id: ProviderId,
    rank: usize,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceStatus>,
    fetch_timeout_ms: u64,
}

pub fn run(builder: &ResolverBuilder) -> Result<CommandResult, CliError> {
    let priority = builder.priority().to_vec();
    let resolver = builder.clone().build();
    let fetch_timeout_ms = u64::try_from(resolver.fetch_timeout().as_millis()).unwrap_or(u64::MAX);

    let sources = priority
        .iter()
        .enumerate()
        .map(|(index, id)| SourceStatus {
            id: *id,
            rank: index + 1,
        })
        .collect::<Vec<_>>();

    let data = serde_json::to_value(SourcesResponseData {
        sources,
        fetch_timeout_ms,
    })?;

    Ok(CommandResult::ok(data, priority))
}
