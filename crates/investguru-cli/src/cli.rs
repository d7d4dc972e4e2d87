//! CLI argument definitions for investguru.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Resolve the latest quote for one or more tickers |
//! | `candidates` | Show the spelling variants tried for a ticker |
//! | `sources` | Show the configured provider priority |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--source` | `INVESTGURU_SOURCES` or `yahoo,stooq` | Provider priority |
//! | `--timeout-ms` | `INVESTGURU_FETCH_TIMEOUT_MS` or `10000` | Per-fetch timeout |
//! | `--verbose` | `false` | Log resolution attempts to stderr |
//!
//! # Examples
//!
//! ```bash
//! investguru quote AAPL
//! investguru quote msft google --pretty
//! investguru quote AAPL --source stooq --format table
//! investguru candidates brk.b
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Resolve stock quotes across Yahoo Finance and Stooq.
#[derive(Debug, Parser)]
#[command(
    name = "investguru",
    author,
    version,
    about = "Multi-source stock quote lookup",
    long_about = "investguru resolves a ticker by trying its spelling variants against each \
configured provider in priority order and returns the first quote found.\n\
\n\
Use 'investguru <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Comma-separated provider priority, e.g. `stooq,yahoo`.
    #[arg(long, global = true)]
    pub source: Option<String>,

    /// Per-fetch timeout budget in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log every provider attempt to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object output.
    Json,
    /// Aligned text for terminal display.
    Table,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the latest quote for one or more tickers.
    ///
    /// Exits with code 3 when any ticker could not be resolved.
    ///
    /// # Examples
    ///
    ///   investguru quote AAPL
    ///   investguru quote AAPL MSFT GOOGL --pretty
    Quote(QuoteArgs),

    /// Show the candidate spellings tried for a ticker, in order.
    Candidates(CandidatesArgs),

    /// Show the provider priority the resolver would use.
    Sources,
}

/// Arguments for the `quote` command.
#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// One or more tickers (e.g., AAPL, msft, google).
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

/// Arguments for the `candidates` command.
#[derive(Debug, Args)]
pub struct CandidatesArgs {
    /// Raw ticker as a user would type it.
    pub symbol: String,
}
