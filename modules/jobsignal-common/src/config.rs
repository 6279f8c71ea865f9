use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::JobSignalError;

/// Upper bound for day-valued windows (ten years).
pub const MAX_WINDOW_DAYS: i64 = 3650;
/// Upper bound for the staleness threshold, in hours.
pub const MAX_STALE_AFTER_HOURS: i64 = MAX_WINDOW_DAYS * 24;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub data_dir: PathBuf,
    pub cache_path: PathBuf,
    pub cache_fallback_path: PathBuf,
    pub directory_path: PathBuf,

    // Pipeline
    pub freshness_window_days: i64,
    pub stale_after_hours: i64,

    // Fetching
    pub fetch_timeout: Duration,
    pub ats_max_retries: u32,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_data_dir(PathBuf::from("data"))
    }
}

impl Config {
    /// Defaults rooted at `data_dir`.
    pub fn for_data_dir(data_dir: PathBuf) -> Self {
        Self {
            cache_path: data_dir.join("cache").join("jobs_cache.json"),
            cache_fallback_path: env::temp_dir().join("jobsignal_jobs_cache.json"),
            directory_path: data_dir.join("companies.json"),
            data_dir,
            freshness_window_days: 14,
            stale_after_hours: 6,
            fetch_timeout: Duration::from_secs(8),
            ats_max_retries: 2,
            user_agent: "jobsignal/0.1".to_string(),
        }
    }

    /// Load configuration from environment variables. Every key is optional;
    /// a present but malformed value is an error.
    pub fn from_env() -> Result<Self, JobSignalError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading keys through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, JobSignalError> {
        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));
        let defaults = Self::for_data_dir(data_dir);

        let config = Self {
            cache_path: lookup("JOBS_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            cache_fallback_path: lookup("JOBS_CACHE_FALLBACK_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_fallback_path),
            directory_path: lookup("COMPANY_DIRECTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.directory_path),
            freshness_window_days: parse_var(&lookup, "FRESHNESS_WINDOW_DAYS", defaults.freshness_window_days)?,
            stale_after_hours: parse_var(&lookup, "STALE_AFTER_HOURS", defaults.stale_after_hours)?,
            fetch_timeout: Duration::from_secs(parse_var(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )?),
            ats_max_retries: parse_var(&lookup, "ATS_MAX_RETRIES", defaults.ats_max_retries)?,
            user_agent: lookup("USER_AGENT").unwrap_or(defaults.user_agent),
            data_dir: defaults.data_dir,
        };
        config.validate()?;
        Ok(config)
    }

    /// Window settings must lie in `1..=MAX`; anything else is a config error.
    pub fn validate(&self) -> Result<(), JobSignalError> {
        check_range("FRESHNESS_WINDOW_DAYS", self.freshness_window_days, MAX_WINDOW_DAYS)?;
        check_range("STALE_AFTER_HOURS", self.stale_after_hours, MAX_STALE_AFTER_HOURS)?;
        Ok(())
    }

    /// Clamped into the valid range.
    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.freshness_window_days.clamp(1, MAX_WINDOW_DAYS))
            .unwrap_or(chrono::Duration::zero())
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.stale_after_hours.clamp(1, MAX_STALE_AFTER_HOURS))
            .unwrap_or(chrono::Duration::zero())
    }

    /// Log the effective configuration. Nothing here is secret today, but
    /// keep it to one structured line so it greps well.
    pub fn log_redacted(&self) {
        info!(
            cache_path = %self.cache_path.display(),
            cache_fallback_path = %self.cache_fallback_path.display(),
            directory_path = %self.directory_path.display(),
            freshness_window_days = self.freshness_window_days,
            stale_after_hours = self.stale_after_hours,
            fetch_timeout_secs = self.fetch_timeout.as_secs(),
            ats_max_retries = self.ats_max_retries,
            user_agent = self.user_agent.as_str(),
            "Config loaded"
        );
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, JobSignalError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| JobSignalError::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}
fn check_range(key: &str, value: i64, max: i64) -> Result<(), JobSignalError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(JobSignalError::Config(format!("{key} must be between 1 and {max}, got {value}")))
    }
}
