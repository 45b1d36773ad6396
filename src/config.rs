use crate::error::{GuardError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Validation pipeline configuration
    pub guard: GuardConfig,
    /// Reputation service configuration
    pub reputation: ReputationConfig,
    /// Read-only API server configuration
    pub api: ApiServerConfig,
    /// Geolocation lookup configuration
    pub geo: GeoConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Pause between batches in seconds (default: 30)
    pub interval_secs: u64,
    /// Upper bound on concurrent evaluations (default: 50)
    pub max_workers: usize,
    /// Per-call timeout for every network check in seconds (default: 10)
    pub check_timeout_secs: u64,
    /// Reachability target dialed through the candidate proxy
    pub probe_target: String,
    /// Echo endpoint reporting the caller's apparent IP
    pub echo_url: String,
    /// Output file for malicious endpoints
    pub blacklist_file: PathBuf,
    /// Output file for non-functional endpoints
    pub not_working_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ReputationConfig {
    /// AbuseIPDB API key; lookups fail open when absent
    pub api_key: Option<String>,
    /// AbuseIPDB check endpoint
    pub url: String,
    /// Report lookback window in days (default: 90)
    pub max_age_days: u32,
    /// Scores strictly above this are malicious (default: 50)
    pub malicious_above: u8,
    /// Scores strictly above this are logged as moderate risk (default: 10)
    pub moderate_above: u8,
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Serve the read-only endpoints (default: true)
    pub enabled: bool,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port for the API server (default: 5000)
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct GeoConfig {
    /// ipinfo.io token; every lookup yields "Unknown, Unknown" when absent
    pub api_key: Option<String>,
    /// ipinfo.io base URL
    pub url: String,
    /// Per-lookup timeout in seconds (default: 5)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let reputation = ReputationConfig {
            api_key: get_env_opt("ABUSEIPDB_API_KEY"),
            url: parse_url("ABUSEIPDB_URL", "https://api.abuseipdb.com/api/v2/check")?,
            max_age_days: parse_env("ABUSEIPDB_MAX_AGE_DAYS", "90")?,
            malicious_above: parse_env("REPUTATION_MALICIOUS_ABOVE", "50")?,
            moderate_above: parse_env("REPUTATION_MODERATE_ABOVE", "10")?,
        };

        if reputation.moderate_above > reputation.malicious_above {
            return Err(GuardError::InvalidConfig(
                "REPUTATION_MODERATE_ABOVE must not exceed REPUTATION_MALICIOUS_ABOVE".into(),
            ));
        }
        if reputation.malicious_above > 100 {
            return Err(GuardError::InvalidConfig(
                "REPUTATION_MALICIOUS_ABOVE must be at most 100".into(),
            ));
        }

        let guard = GuardConfig {
            interval_secs: parse_env("GUARD_INTERVAL_SECS", "30")?,
            max_workers: parse_env("GUARD_MAX_WORKERS", "50")?,
            check_timeout_secs: parse_env("GUARD_CHECK_TIMEOUT_SECS", "10")?,
            probe_target: get_env_or("GUARD_PROBE_TARGET", "1.1.1.1:80"),
            echo_url: parse_url("GUARD_ECHO_URL", "https://httpbin.org/ip")?,
            blacklist_file: PathBuf::from(get_env_or("GUARD_BLACKLIST_FILE", "blacklist.json")),
            not_working_file: PathBuf::from(get_env_or(
                "GUARD_NOT_WORKING_FILE",
                "not_working.json",
            )),
        };

        if guard.max_workers == 0 {
            return Err(GuardError::InvalidConfig(
                "GUARD_MAX_WORKERS must be at least 1".into(),
            ));
        }
        if guard.check_timeout_secs == 0 {
            return Err(GuardError::InvalidConfig(
                "GUARD_CHECK_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        if guard.probe_target.parse::<std::net::SocketAddr>().is_err() {
            return Err(GuardError::InvalidConfig(
                "GUARD_PROBE_TARGET must be an IP:PORT socket address".into(),
            ));
        }

        Ok(Config {
            guard,
            reputation,
            api: ApiServerConfig {
                enabled: parse_env("API_ENABLED", "true")?,
                host: get_env_or("API_HOST", "0.0.0.0"),
                port: get_env_or("API_PORT", "5000").parse().map_err(|_| {
                    GuardError::InvalidConfig("API_PORT must be a valid port number".into())
                })?,
            },
            geo: GeoConfig {
                api_key: get_env_opt("IPINFO_API_KEY"),
                url: parse_url("IPINFO_URL", "https://ipinfo.io")?,
                timeout_secs: parse_env("IPINFO_TIMEOUT_SECS", "5")?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Get the API server address
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

impl GuardConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a non-empty environment variable
fn get_env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    get_env_or(key, default)
        .trim()
        .parse()
        .map_err(|_| GuardError::InvalidConfig(format!("{} has an invalid value", key)))
}

fn parse_url(key: &str, default: &str) -> Result<String> {
    let raw = get_env_or(key, default);
    let url = Url::parse(raw.trim()).map_err(|e| {
        GuardError::InvalidConfig(format!("{} must be a valid URL: {}", key, e))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(GuardError::InvalidConfig(format!(
            "{} has unsupported scheme: {}",
            key, other
        ))),
    }
}
