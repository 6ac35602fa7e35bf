// Relay configuration.
//
// Settings are layered, highest precedence first: command-line flags,
// environment variables (both handled by `clap`), a JSON config file, then
// built-in defaults. The file is the same `config/config.json` the field and
// controller pages are deployed with, so it may carry keys the relay does not
// understand (`domain`, `winning_score`, ...); those are ignored.
//
// A missing file at the default path is fine. A missing file that was named
// explicitly, or a file that does not parse, is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

/// Command-line interface of the `relay` binary.
#[derive(Debug, Default, Parser)]
#[command(name = "relay", version, about = "Remote Pong session relay")]
pub struct Cli {
    /// Path to a JSON config file.
    #[arg(long, env = "REMOTE_PONG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "REMOTE_PONG_BIND")]
    pub bind: Option<String>,

    /// Port to listen on (0 picks a free port).
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    #[arg(long, env = "REMOTE_PONG_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Output logs as JSON instead of human-readable. Accepts 1/0, yes/no,
    /// on/off as well as true/false.
    #[arg(
        long,
        env = "REMOTE_PONG_JSON_LOGS",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub json_logs: Option<bool>,
}

/// Keys read from the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

impl FileConfig {
    /// Load `path`. With `required == false` a missing file yields defaults.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved settings for one relay process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 7878,
            log_level: "info".into(),
            json_logs: false,
        }
    }
}

impl RelayConfig {
    /// Resolve the full configuration, reading the config file if any.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path, true)?,
            None => FileConfig::load(Path::new(DEFAULT_CONFIG_PATH), false)?,
        };
        Ok(Self::layer(cli, file))
    }

    /// Merge CLI/env values over file values over defaults.
    pub fn layer(cli: &Cli, file: FileConfig) -> Self {
        let defaults = Self::default();
        Self {
            bind: cli.bind.clone().or(file.bind).unwrap_or(defaults.bind),
            port: cli.port.or(file.port).unwrap_or(defaults.port),
            log_level: cli
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
            json_logs: cli.json_logs.or(file.json_logs).unwrap_or(defaults.json_logs),
        }
    }

    /// `host:port` string for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = RelayConfig::layer(&Cli::default(), FileConfig::default());
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.listen_addr(), "127.0.0.1:7878");
    }

    #[test]
    fn cli_overrides_file_overrides_defaults() {
        let cli = Cli {
            port: Some(9000),
            ..Cli::default()
        };
        let file = FileConfig {
            port: Some(8000),
            log_level: Some("debug".into()),
            ..FileConfig::default()
        };
        let config = RelayConfig::layer(&cli, file);
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bind, "127.0.0.1");
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "relay",
            "--bind",
            "0.0.0.0",
            "--port",
            "4000",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(cli.bind.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(4000));
        assert_eq!(cli.json_logs, Some(true));
    }

    #[test]
    fn json_logs_accepts_boolish_values() {
        for (raw, expected) in [
            ("1", true),
            ("yes", true),
            ("on", true),
            ("0", false),
            ("off", false),
            ("false", false),
        ] {
            let cli = Cli::try_parse_from(["relay".to_string(), format!("--json-logs={raw}")])
                .unwrap();
            assert_eq!(cli.json_logs, Some(expected), "--json-logs={raw}");
        }
        assert!(Cli::try_parse_from(["relay", "--json-logs=maybe"]).is_err());
    }

    #[test]
    fn rejects_invalid_port() {
        assert!(Cli::try_parse_from(["relay", "--port", "not-a-port"]).is_err());
    }

    #[test]
    fn file_ignores_client_only_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"domain": "pong.example", "winning_score": 5, "port": 8123}}"#
        )
        .unwrap();

        let loaded = FileConfig::load(file.path(), true).unwrap();
        assert_eq!(loaded.port, Some(8123));
        assert_eq!(loaded.bind, None);
    }

    #[test]
    fn missing_optional_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = FileConfig::load(&dir.path().join("config.json"), false).unwrap();
        assert_eq!(loaded.port, None);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(&dir.path().join("config.json"), true).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = FileConfig::load(file.path(), false).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
