mod config;
mod report;
mod rest;

use std::path::PathBuf;
use std::time::Duration;

use agency_analytics_core::models::parse_timestamp;
use agency_analytics_core::source::JsonFileSource;
use agency_analytics_core::{trailing_months, AnalyticsError, DataAccess, SnapshotAssembler};
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use config::{AppConfig, URL_ENV};
use rest::RestSource;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agency-analytics")]
#[command(author, version, about = "Dashboard analytics for the client store")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, global = true, help = "Path to config file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable debug logging")]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch all records and print the dashboard snapshot")]
    Snapshot(SnapshotArgs),
    #[command(about = "Show the trailing month buckets")]
    Buckets {
        #[arg(long, help = "Number of months (default 6)")]
        months: Option<usize>,
        #[arg(long, help = "Reference time (RFC 3339), defaults to now")]
        now: Option<String>,
    },
}

#[derive(Args, Default)]
struct SnapshotArgs {
    #[arg(long, help = "Output as JSON")]
    json: bool,

    #[arg(long, help = "Read records from a JSON export instead of the store")]
    data: Option<PathBuf>,

    #[arg(long, help = "Number of trailing months")]
    months: Option<usize>,

    #[arg(long, help = "Number of recent activity entries")]
    activity_limit: Option<usize>,

    #[arg(long, help = "Number of top clients")]
    top: Option<usize>,

    #[arg(long, help = "Reference time (RFC 3339), defaults to now")]
    now: Option<String>,

    #[arg(long, default_value = "0", help = "Re-run every N seconds (0 = once)")]
    refresh: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Snapshot(args)) => run_snapshot(config, args),
        Some(Commands::Buckets { months, now }) => {
            let now = resolve_now(now.as_deref())?;
            let months = months.unwrap_or(config.snapshot.months);
            let options = agency_analytics_core::SnapshotOptions {
                months,
                ..config.snapshot
            }
            .normalized();
            report::print_buckets(&trailing_months(now, options.months));
            Ok(())
        }
        None => run_snapshot(config, SnapshotArgs::default()),
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => parse_timestamp(raw).ok_or_else(|| anyhow!("Invalid --now value: {}", raw)),
        None => Ok(Utc::now()),
    }
}

fn open_source(config: &AppConfig, data: Option<PathBuf>) -> Result<Box<dyn DataAccess>> {
    if let Some(path) = data {
        debug!(path = %path.display(), "Reading records from file");
        return Ok(Box::new(JsonFileSource::new(path)));
    }

    let Some(base_url) = config.store.base_url.as_deref() else {
        bail!(
            "No store configured. Set {} or [store] base_url in {}, or pass --data <FILE>",
            URL_ENV,
            AppConfig::default_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the config file".to_string())
        );
    };
    let source = RestSource::new(
        base_url,
        config.store.api_key.clone(),
        config.store.request_timeout(),
    )?;
    Ok(Box::new(source))
}

fn run_snapshot(config: AppConfig, args: SnapshotArgs) -> Result<()> {
    use tokio::runtime::Runtime;

    let mut options = config.snapshot;
    if let Some(months) = args.months {
        options.months = months;
    }
    if let Some(limit) = args.activity_limit {
        options.activity_limit = limit;
    }
    if let Some(top) = args.top {
        options.top_clients = top;
    }
    let pinned_now = match args.now.as_deref() {
        Some(raw) => Some(resolve_now(Some(raw))?),
        None => None,
    };

    let json = args.json;
    let refresh = args.refresh;
    let source = open_source(&config, args.data)?;
    let assembler = SnapshotAssembler::new(source, options);
    let rt = Runtime::new()?;

    if refresh == 0 {
        let now = pinned_now.unwrap_or_else(Utc::now);
        let snapshot = rt.block_on(assembler.refresh(now))?;
        return print_snapshot(&snapshot, json);
    }

    let interval = Duration::from_secs(refresh);
    rt.block_on(async {
        loop {
            let now = pinned_now.unwrap_or_else(Utc::now);
            match assembler.refresh(now).await {
                Ok(snapshot) => print_snapshot(&snapshot, json)?,
                Err(AnalyticsError::Superseded { generation }) => {
                    debug!(generation, "Skipping superseded pass");
                }
                Err(err) => {
                    warn!(error = %err, "Refresh failed, keeping last snapshot");
                    if assembler.current().is_none() {
                        eprintln!("  Refresh failed: {}", err);
                    }
                }
            }
            info!(seconds = refresh, "Waiting for next refresh");
            tokio::time::sleep(interval).await;
        }
    })
}

fn print_snapshot(snapshot: &agency_analytics_core::AnalyticsSnapshot, json: bool) -> Result<()> {
    if json {
        report::print_json(snapshot)
    } else {
        report::print_tables(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cli_parses_snapshot_flags() {
        let cli = Cli::try_parse_from([
            "agency-analytics",
            "snapshot",
            "--json",
            "--months",
            "12",
            "--top",
            "3",
            "--now",
            "2024-03-20T09:00:00Z",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Snapshot(args)) => {
                assert!(args.json);
                assert_eq!(args.months, Some(12));
                assert_eq!(args.top, Some(3));
                assert_eq!(args.refresh, 0);
            }
            _ => panic!("expected snapshot command"),
        }
    }

    #[test]
    fn test_resolve_now() {
        assert_eq!(
            resolve_now(Some("2024-03-20T09:00:00Z")).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap()
        );
        assert!(resolve_now(Some("yesterday")).is_err());
    }

    #[test]
    fn test_open_source_requires_store_or_file() {
        let config = AppConfig::default();
        assert!(open_source(&config, None).is_err());
        assert!(open_source(&config, Some(PathBuf::from("records.json"))).is_ok());
    }
}
