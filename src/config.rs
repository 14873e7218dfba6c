//! Runtime configuration, read from the environment (and `.env`).

use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub bind_addr: String,
    pub max_request_bytes: usize,
    pub read_timeout: Duration,
    /// Files to load into a session at startup, if both are set.
    pub encounters_csv: Option<PathBuf>,
    pub claims_csv: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            encounters_csv: None,
            claims_csv: None,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: get("DASHBOARD_BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_request_bytes: get("DASHBOARD_MAX_REQUEST_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_request_bytes),
            read_timeout: get("DASHBOARD_READ_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout),
            encounters_csv: get("DASHBOARD_ENCOUNTERS_CSV").map(PathBuf::from),
            claims_csv: get("DASHBOARD_CLAIMS_CSV").map(PathBuf::from),
        }
    }

    pub fn preload_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.encounters_csv, &self.claims_csv) {
            (Some(e), Some(c)) => Some((e, c)),
            _ => None,
        }
    }
}

/// Default filter for the long-running binaries (`server`, `generate_data`).
pub const SERVICE_LOG_FILTER: &str = "info";
/// Default filter for the CLI, whose stdout carries the report itself.
pub const CLI_LOG_FILTER: &str = "warn";

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_filter_defaults_parse() {
        for filter in [SERVICE_LOG_FILTER, CLI_LOG_FILTER] {
            assert!(EnvFilter::try_new(filter).is_ok());
        }
        assert_eq!(SERVICE_LOG_FILTER, "info");
        assert_eq!(CLI_LOG_FILTER, "warn");
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = DashboardConfig::from_lookup(|_| None);
        assert_eq!(config, DashboardConfig::default());
        assert!(config.preload_paths().is_none());
    }

    #[test]
    fn test_values_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("DASHBOARD_BIND_ADDR", "127.0.0.1:9000"),
            ("DASHBOARD_MAX_REQUEST_BYTES", "1024"),
            ("DASHBOARD_READ_TIMEOUT_SECS", "not-a-number"),
            ("DASHBOARD_ENCOUNTERS_CSV", "ehr.csv"),
            ("DASHBOARD_CLAIMS_CSV", "claims.csv"),
        ]
        .into_iter()
        .collect();
        let config = DashboardConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.max_request_bytes, 1024);
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        let (e, c) = config.preload_paths().unwrap();
        assert_eq!(e, &PathBuf::from("ehr.csv"));
        assert_eq!(c, &PathBuf::from("claims.csv"));
    }
}
