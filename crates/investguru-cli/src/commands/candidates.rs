use serde::Serialize;

use investguru_core::{canonical_symbol, normalize, CandidateList};

use crate::cli::CandidatesArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct CandidatesResponseData<'a> {
    input: &'a str,
    canonical: String,
    candidates: CandidateList,
}

pub fn run(args: &CandidatesArgs) -> Result<CommandResult, CliError> {
    let candidates = normalize(&args.symbol);
    let data = serde_json::to_value(CandidatesResponseData {
        input: &args.symbol,
        canonical: canonical_symbol(candidates.first()),
        candidates,
    })?;

    Ok(CommandResult::ok(data, Vec::new()))
}
