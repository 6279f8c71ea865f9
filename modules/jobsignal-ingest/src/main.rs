use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobsignal_archive::{detect_ats, ConnectorRegistry, HttpClient, RetryPolicy};
use jobsignal_common::config::MAX_WINDOW_DAYS;
use jobsignal_common::{Config, VerificationTier};
use jobsignal_ingest::{JobsQuery, JobsService};

#[derive(Parser)]
#[command(name = "jobsignal", about = "Job posting ingestion and aggregation")]
struct Cli {
    /// Root for the default cache and directory paths
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,

    /// Company directory JSON
    #[arg(long, global = true)]
    directory: Option<PathBuf>,

    #[arg(long, global = true, value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_DAYS))]
    freshness_window_days: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full ingest now and print its stats
    Refresh,
    /// Print cached postings, refreshing first on cold start
    Jobs {
        #[arg(
            long,
            default_value_t = jobsignal_ingest::query::DEFAULT_MAX_AGE_DAYS,
            value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_DAYS)
        )]
        max_age_days: i64,
        #[arg(long)]
        remote_only: bool,
        /// Substring match over title, company, location and description
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// source_verified, domain_verified or unverified
        #[arg(long)]
        min_tier: Option<VerificationTier>,
        #[arg(long, default_value_t = jobsignal_ingest::query::DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Identify the ATS provider and handle behind a careers URL
    Detect { url: String },
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive("jobsignal=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn apply_overrides(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(data_dir) = &cli.data_dir {
        let rooted = Config::for_data_dir(data_dir.clone());
        config.cache_path = rooted.cache_path;
        config.directory_path = rooted.directory_path;
        config.data_dir = rooted.data_dir;
    }
    if let Some(path) = &cli.cache_path {
        config.cache_path = path.clone();
    }
    if let Some(path) = &cli.directory {
        config.directory_path = path.clone();
    }
    if let Some(days) = cli.freshness_window_days {
        config.freshness_window_days = days;
    }
    config.validate()?;
    Ok(config)
}

fn service_for(cli: &Cli) -> Result<JobsService> {
    let config = apply_overrides(cli)?;
    config.log_redacted();

    let http = HttpClient::new(config.fetch_timeout, &config.user_agent)?;
    let retry = RetryPolicy::default().with_max_retries(config.ats_max_retries);
    let registry = ConnectorRegistry::standard(Arc::new(http), retry);
    info!(connectors = registry.len(), "Connector registry built");
    Ok(JobsService::from_config(&config, registry))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_flags_are_range_checked() {
        for bad in ["0", "-3", "3651", "200000000000000"] {
            let parsed = Cli::try_parse_from(["jobsignal", "--freshness-window-days", bad, "refresh"]);
            assert!(parsed.is_err(), "--freshness-window-days {bad} was accepted");
            let parsed = Cli::try_parse_from(["jobsignal", "jobs", "--max-age-days", bad]);
            assert!(parsed.is_err(), "--max-age-days {bad} was accepted");
        }

        let cli = Cli::try_parse_from(["jobsignal", "jobs", "--max-age-days", "30"]).unwrap();
        assert!(matches!(cli.command, Command::Jobs { max_age_days: 30, .. }));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();

    match &cli.command {
        Command::Detect { url } => match detect_ats(url) {
            Some(detected) => print_json(&detected)?,
            None => anyhow::bail!("No supported ATS recognised in {url}"),
        },
        Command::Refresh => {
            let service = service_for(&cli)?;
            let outcome = service.refresh().await?;
            info!("{}", outcome.stats);
            print_json(&outcome.stats)?;
        }
        Command::Jobs {
            max_age_days,
            remote_only,
            query,
            location,
            min_tier,
            limit,
        } => {
            let service = service_for(&cli)?;
            let cache = service.jobs().await?;
            let query = JobsQuery {
                max_age_days: *max_age_days,
                remote_only: *remote_only,
                text: query.clone(),
                location: location.clone(),
                min_tier: *min_tier,
                limit: *limit,
            };
            print_json(&query.apply(&cache, Utc::now()))?;
            service.wait_for_background().await;
        }
    }

    Ok(())
}
