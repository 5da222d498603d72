use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use observability::{init_logging, LogConfig, LogFormat};
use tubescan_search::{ContinuationDescriptor, SearchClient, SearchOptions};

mod observability;

/// Scrape search results, filters, and continuation pages from the
/// command line.
#[derive(Debug, Parser)]
#[command(name = "tubescan", version, about)]
struct Cli {
    /// Search term, or a results link whose query string carries one.
    query: Option<String>,

    /// Maximum number of items to collect.
    #[arg(long)]
    limit: Option<u64>,

    /// Maximum number of pages to fetch; lifts the item limit.
    #[arg(long)]
    pages: Option<u64>,

    /// Ask the platform to filter out restricted content.
    #[arg(long)]
    safe_search: bool,

    /// Two-letter region code sent with every request.
    #[arg(long, env = "TUBESCAN_GL")]
    gl: Option<String>,

    /// Interface language sent with every request.
    #[arg(long, env = "TUBESCAN_HL")]
    hl: Option<String>,

    /// UTC offset in minutes for localized timestamps.
    #[arg(long)]
    utc_offset_minutes: Option<i64>,

    /// Fetch only the filter catalog for the query.
    #[arg(long, conflicts_with = "resume")]
    filters: bool,

    /// Resume one page from a descriptor file written by a previous run;
    /// the file is rewritten with the follow-up descriptor, or removed
    /// when the stream ends.
    #[arg(long, value_name = "FILE")]
    resume: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Also log to stderr.
    #[arg(long)]
    verbose: bool,

    /// Emit log events as JSON instead of text.
    #[arg(long)]
    log_json: bool,

    /// Directory for the rolling log file (default: TUBESCAN_LOG_DIR,
    /// then ~/.local/share/tubescan).
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

fn log_config(cli: &Cli) -> LogConfig {
    LogConfig {
        log_dir: cli.log_dir.clone(),
        emit_stderr: cli.verbose,
        format: if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        ..LogConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(log_config(&cli))?;

    let client = SearchClient::new()?;

    if let Some(path) = &cli.resume {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read descriptor file: {}", path.display()))?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("descriptor file is not JSON: {}", path.display()))?;
        let descriptor = ContinuationDescriptor::from_value(&value)?;

        let step = client.resume(&descriptor).await?;
        match &step.continuation {
            Some(next) => {
                let encoded = serde_json::to_string_pretty(next)?;
                std::fs::write(path, encoded).with_context(|| {
                    format!("failed to rewrite descriptor file: {}", path.display())
                })?;
            }
            None => {
                tracing::info!(target: "app", "stream ended; removing descriptor file");
                let _ = std::fs::remove_file(path);
            }
        }
        print_json(&step, cli.pretty)?;
        return Ok(());
    }

    let query = cli
        .query
        .as_deref()
        .context("a search query is required unless --resume is given")?;
    let options = SearchOptions {
        limit: cli.limit,
        pages: cli.pages,
        safe_search: cli.safe_search,
        gl: cli.gl.clone(),
        hl: cli.hl.clone(),
        utc_offset_minutes: cli.utc_offset_minutes,
        ..SearchOptions::default()
    };

    if cli.filters {
        let catalog = client.filters(query, &options).await?;
        print_json(&catalog, cli.pretty)?;
    } else {
        let results = client.search(query, &options).await?;
        print_json(&results, cli.pretty)?;
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{encoded}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn log_flags_flow_into_config() {
        let cli = Cli::try_parse_from([
            "tubescan",
            "cats",
            "--log-json",
            "--log-dir",
            "/tmp/tubescan-logs",
            "--verbose",
        ])
        .unwrap();
        let config = log_config(&cli);
        assert!(matches!(config.format, LogFormat::Json));
        assert_eq!(
            config.log_dir.as_deref(),
            Some(Path::new("/tmp/tubescan-logs"))
        );
        assert!(config.emit_stderr);
    }

    #[test]
    fn default_logging_is_text_to_file_only() {
        let cli = Cli::try_parse_from(["tubescan", "cats"]).unwrap();
        let config = log_config(&cli);
        assert!(matches!(config.format, LogFormat::Text));
        assert!(config.log_dir.is_none());
        assert!(!config.emit_stderr);
    }
}
