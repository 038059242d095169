//! Process configuration.
//!
//! Every option can be given as a flag or through the environment; flags win.

use clap::Parser;
use std::time::Duration;

/// Browse cloud-education file collections as one virtual filesystem.
#[derive(Parser, Debug, Clone)]
#[command(name = "edudav", version)]
#[command(about = "Browse cloud-education file collections as one virtual filesystem")]
pub struct Config {
    /// Base URL of the backend REST API
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:3030")]
    pub base_url: String,

    /// Deployment environment (development, production, ...)
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    pub environment: String,

    /// Log filter used when RUST_LOG is unset; defaults per environment
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Timeout for every backend and blob store request
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Age after which cached size and dates are re-read from the backend
    #[arg(long, env = "METADATA_TTL_SECS", default_value_t = 30)]
    pub metadata_ttl_secs: u64,

    /// Number of authenticated sessions kept in memory
    #[arg(long, env = "SESSION_CACHE_SIZE", default_value_t = 64)]
    pub session_cache_size: usize,

    /// Account to log in with
    #[arg(long, env = "EDUDAV_USERNAME")]
    pub username: Option<String>,

    /// Password for the account; prompted for when absent
    #[arg(long, env = "EDUDAV_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl Config {
    /// Log filter directive: explicit level, else the environment default
    pub fn log_filter(&self) -> String {
        if let Some(level) = &self.log_level {
            return level.clone();
        }
        match self.environment.as_str() {
            "development" => "info",
            "production" => "warn",
            _ => "debug",
        }
        .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["edudav"];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    #[test]
    fn test_log_filter_follows_environment() {
        let mut config = parse(&["--environment", "production"]);
        assert_eq!(config.log_filter(), "warn");
        config.environment = "development".into();
        assert_eq!(config.log_filter(), "info");
        config.environment = "test".into();
        assert_eq!(config.log_filter(), "debug");
        config.log_level = Some("edudav=trace".into());
        assert_eq!(config.log_filter(), "edudav=trace");
    }

    #[test]
    fn test_durations() {
        let config = parse(&["--request-timeout-secs", "5", "--metadata-ttl-secs", "0"]);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.metadata_ttl(), Duration::ZERO);
    }
}
