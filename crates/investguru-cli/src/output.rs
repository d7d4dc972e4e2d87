use serde_json::Value;

use crate::cli::OutputFormat;
use crate::commands::CommandResult;
use crate::error::CliError;

pub fn render(
    result: &CommandResult,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&result.data)?
            } else {
                serde_json::to_string(&result.data)?
            };
            println!("{payload}");
            for warning in &result.warnings {
                eprintln!("warning: {warning}");
            }
        }
        OutputFormat::Table => render_table(result)?,
    }

    Ok(())
}

fn render_table(result: &CommandResult) -> Result<(), CliError> {
    if !result.source_chain.is_empty() {
        println!(
            "sources     : {}",
            result
                .source_chain
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );
        println!("latency_ms  : {}", result.latency_ms);
    }

    if !result.warnings.is_empty() {
        println!("warnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }

    match result.data.get("quotes").and_then(Value::as_array) {
        Some(quotes) => render_quotes(quotes, &result.data["unresolved"]),
        None => {
            println!("data:");
            let pretty_data = serde_json::to_string_pretty(&result.data)?;
            for line in pretty_data.lines() {
                println!("  {line}");
            }
        }
    }

    Ok(())
}

fn render_quotes(quotes: &[Value], unresolved: &Value) {
    println!(
        "{:<10} {:>12} {:<10} {:<8} {}",
        "SYMBOL", "CLOSE", "DATE", "SOURCE", "NAME"
    );
    for quote in quotes {
        println!(
            "{:<10} {:>12} {:<10} {:<8} {}",
            text(&quote["symbol"]),
            text(&quote["close"]),
            text(&quote["date"]),
            text(&quote["source"]),
            text(&quote["name"]),
        );
    }

    if let Some(unresolved) = unresolved.as_array().filter(|items| !items.is_empty()) {
        println!("unresolved:");
        for item in unresolved {
            println!("  - {}", text(&item["message"]));
        }
    }
}

fn text(value: &Value) -> &str {
    value.as_str().unwrap_or("-")
}
