//! CLI argument definitions for the Parley server.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Parley - a two-stage chatbot over a Redis store.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Redis connection URL.
    #[arg(long = "redis-url")]
    pub redis_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > PARLEY_PORT env var > config file value > 1557.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("PARLEY_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        1557
    }

    /// Resolve the bind address. Priority: --host flag > config file value.
    pub fn resolve_host(&self, config_host: &str) -> String {
        self.host
            .clone()
            .unwrap_or_else(|| config_host.to_string())
    }

    /// Resolve the store URL.
    ///
    /// Priority: --redis-url flag > PARLEY_REDIS_URL env var > config file value.
    pub fn resolve_redis_url(&self, config_url: &str) -> String {
        if let Some(ref url) = self.redis_url {
            return url.clone();
        }
        if let Ok(url) = std::env::var("PARLEY_REDIS_URL") {
            if !url.is_empty() {
                return url;
            }
        }
        config_url.to_string()
    }

    /// Resolve the log level. Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("parley").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_parse() {
        let args = parse(&[
            "--config",
            "/tmp/p.toml",
            "-p",
            "8080",
            "--host",
            "127.0.0.1",
            "--redis-url",
            "redis://cache:6379/2",
            "-l",
            "debug",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/p.toml")));
        assert_eq!(args.port, Some(8080));
        assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(args.redis_url.as_deref(), Some("redis://cache:6379/2"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = CliArgs::try_parse_from(["parley", "--port", "not-a-port"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_win_over_config() {
        let args = parse(&["-p", "9000", "--host", "::1", "--redis-url", "redis://x/1", "-l", "warn"]);
        assert_eq!(args.resolve_port(1557), 9000);
        assert_eq!(args.resolve_host("0.0.0.0"), "::1");
        assert_eq!(args.resolve_redis_url("redis://127.0.0.1:6379/0"), "redis://x/1");
        assert_eq!(args.resolve_log_level("info"), "warn");
        assert_eq!(
            parse(&["-c", "a.toml"]).resolve_config_path(),
            PathBuf::from("a.toml")
        );
    }

    #[test]
    fn test_config_values_used_without_flags() {
        let args = parse(&[]);
        assert_eq!(args.resolve_host("10.0.0.1"), "10.0.0.1");
        assert_eq!(args.resolve_log_level("trace"), "trace");
    }
}
