//! Daemon configuration
//!
//! Every limit the core enforces is a named field here so it can be tuned
//! independently. Defaults can be overridden with `INSIGHTS_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default account capacity: 5 GiB
const DEFAULT_CAPACITY_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Longest TTL or interval accepted anywhere: 100 years
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Default socket path for IPC communication
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/storage-insights.sock";

/// Runtime configuration for the vault, aggregator and daemon
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage capacity reported for every principal
    pub capacity_bytes: u64,
    /// How long a stored credential stays valid
    pub credential_ttl: Duration,
    /// Interval between vault sweeps
    pub sweep_interval: Duration,
    /// How long a computed usage report is served from cache
    pub report_ttl: Duration,
    /// Maximum remote objects folded into one usage report
    pub report_object_ceiling: usize,
    /// Maximum remote objects counted by one stats summary
    pub stats_object_ceiling: usize,
    /// Objects requested per listing page
    pub page_size: u32,
    /// Length of the largest / most recent item lists
    pub top_n: usize,
    /// Only items newer than this appear in the recent list
    pub recent_window: Duration,
    /// Overall deadline for one report or stats computation
    pub compute_timeout: Duration,
    /// Unix socket the daemon listens on
    pub socket_path: PathBuf,
    /// JSON manifest of local file and folder records
    pub catalog_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let catalog_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("storage-insights")
            .join("catalog.json");

        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            credential_ttl: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            report_ttl: Duration::from_secs(10 * 60),
            report_object_ceiling: 50_000,
            stats_object_ceiling: 100_000,
            page_size: 1000,
            top_n: 10,
            recent_window: Duration::from_secs(30 * 24 * 60 * 60),
            compute_timeout: Duration::from_secs(60),
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            catalog_path,
        }
    }
}

impl Config {
    /// Build a config from defaults overlaid with `INSIGHTS_*` variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parsed(&lookup, "INSIGHTS_CAPACITY_BYTES") {
            config.capacity_bytes = v;
        }
        if let Some(v) = parsed(&lookup, "INSIGHTS_CREDENTIAL_TTL_SECS") {
            config.credential_ttl = seconds(v);
        }
        if let Some(v) = parsed(&lookup, "INSIGHTS_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = seconds(v);
        }
        if let Some(v) = parsed(&lookup, "INSIGHTS_REPORT_TTL_SECS") {
            config.report_ttl = seconds(v);
        }
        if let Some(v) = parsed(&lookup, "INSIGHTS_REPORT_OBJECT_CEILING") {
            config.report_object_ceiling = v;
        }
        if let Some(v) = parsed(&lookup, "INSIGHTS_STATS_OBJECT_CEILING") {
            config.stats_object_ceiling = v;
        }
        if let Some(v) = parsed(&lookup, "INSIGHTS_PAGE_SIZE") {
            config.page_size = v;
        }
        if let Some(v) = parsed(&lookup, "INSIGHTS_COMPUTE_TIMEOUT_SECS") {
            config.compute_timeout = seconds(v);
        }
        if let Some(v) = lookup("INSIGHTS_SOCKET_PATH") {
            config.socket_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("INSIGHTS_CATALOG_PATH") {
            config.catalog_path = PathBuf::from(v);
        }

        config
    }
}

/// Seconds as a Duration, clamped to MAX_TTL
fn seconds(value: u64) -> Duration {
    let duration = Duration::from_secs(value);
    if duration > MAX_TTL {
        warn!(seconds = value, max_seconds = MAX_TTL.as_secs(), "Clamping oversized duration");
    }
    duration.min(MAX_TTL)
}

fn parsed<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_keep_ceilings_distinct() {
        let config = Config::default();
        assert_eq!(config.report_object_ceiling, 50_000);
        assert_eq!(config.stats_object_ceiling, 100_000);
        assert_eq!(config.report_ttl, Duration::from_secs(600));
        assert_eq!(config.credential_ttl, Duration::from_secs(86_400));
        assert_eq!(config.page_size, 1000);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("INSIGHTS_REPORT_OBJECT_CEILING", "10"),
            ("INSIGHTS_REPORT_TTL_SECS", "5"),
            ("INSIGHTS_SOCKET_PATH", "/tmp/other.sock"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.report_object_ceiling, 10);
        assert_eq!(config.stats_object_ceiling, 100_000);
        assert_eq!(config.report_ttl, Duration::from_secs(5));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/other.sock"));
    }

    #[test]
    fn test_oversized_durations_clamped() {
        let config = Config::from_lookup(|name| match name {
            "INSIGHTS_CREDENTIAL_TTL_SECS" | "INSIGHTS_REPORT_TTL_SECS" => {
                Some(u64::MAX.to_string())
            }
            _ => None,
        });
        assert_eq!(config.credential_ttl, MAX_TTL);
        assert_eq!(config.report_ttl, MAX_TTL);
    }

    #[test]
    fn test_unparseable_values_ignored() {
        let config = Config::from_lookup(|name| {
            (name == "INSIGHTS_CAPACITY_BYTES").then(|| "lots".to_string())
        });
        assert_eq!(config.capacity_bytes, DEFAULT_CAPACITY_BYTES);
    }
}
