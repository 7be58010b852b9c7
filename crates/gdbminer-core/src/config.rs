//! Typed configuration, loaded from the key=value record format of spec §6.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputChannel {
    File,
    Stdin,
    Serial,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Direct,
    MemorySandbox,
    OnChip,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Map onto the `tracing` crate's level, which has no `CRITICAL`
    /// variant; `CRITICAL` collapses onto `ERROR` (the run logs a
    /// backend-specific message at `ERROR` regardless).
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }
}

/// Serial-port parameters, required when `input_channel = serial`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerialParams {
    pub port: String,
    pub baud_rate: u32,
}

/// On-chip probe connection parameters, required when `instance = on-chip`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnChipParams {
    pub gdb_server_path: PathBuf,
    pub gdb_server_address: String,
}

/// Typed, validated form of the key=value record file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub seed_directory: PathBuf,
    #[serde(default)]
    pub eval_directory: Option<PathBuf>,
    pub output_directory: PathBuf,
    pub binary_file: PathBuf,

    pub input_channel: InputChannel,
    #[serde(default)]
    pub serial: Option<SerialParams>,

    #[serde(default = "default_gdb_path")]
    pub gdb_path: PathBuf,
    pub instance: BackendKind,
    #[serde(default)]
    pub on_chip: Option<OnChipParams>,

    #[serde(default)]
    pub ignore_functions_regex: Option<String>,
    #[serde(default)]
    pub watchpoint_type: Option<String>,
    pub watchpoint_count: i64,
    pub timeout: u64,
    pub entrypoint: String,
    #[serde(default)]
    pub exitpoint: Option<String>,
    pub input_buffer: String,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default)]
    pub number_of_seeds: Option<u32>,
    #[serde(default)]
    pub original_mimid: bool,
    #[serde(default)]
    pub delay_wp: bool,
    #[serde(default)]
    pub precision_set_size: Option<u32>,

    /// Open Question (spec §9), resolved: whether `CallSiteKey` folds in the
    /// call site's source location, or uses the function symbol alone.
    /// Defaults to function-only, per the spec's own stated default.
    #[serde(default)]
    pub callsite_qualified: bool,

    /// Number of whole-trace retries on `BackendUnresponsive`,
    /// `DebuggerProtocolError`, or `InconsistentTree` before the seed is
    /// recorded as failed (§4.D "Retry").
    #[serde(default = "default_retry_bound")]
    pub retry_bound: u32,
}

fn default_gdb_path() -> PathBuf {
    PathBuf::from("gdb")
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_retry_bound() -> u32 {
    3
}

impl Config {
    /// Parse the key=value record format. The whole file is treated as a
    /// flat TOML table; unrecognized keys are rejected rather than silently
    /// ignored, since a typo in a config key should fail loudly at startup
    /// (`ConfigInvalid`, fatal) rather than silently use a default.
    pub fn from_str(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|source| Error::ConfigInvalid {
            detail: source.to_string(),
        })
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigInvalid {
            detail: format!("reading {}: {source}", path.display()),
        })?;
        Self::from_str(&text)
    }

    /// Cross-field validation that plain deserialization cannot express:
    /// `serial`/`on_chip` sub-tables must be present exactly when their
    /// discriminant selects them.
    pub fn validate(&self) -> Result<(), Error> {
        if self.input_channel == InputChannel::Serial && self.serial.is_none() {
            return Err(Error::ConfigInvalid {
                detail: "input_channel = serial requires a [serial] table".to_string(),
            });
        }
        if self.instance == BackendKind::OnChip && self.on_chip.is_none() {
            return Err(Error::ConfigInvalid {
                detail: "instance = on-chip requires an [on_chip] table".to_string(),
            });
        }
        if self.watchpoint_count < -1 {
            return Err(Error::ConfigInvalid {
                detail: format!(
                    "watchpoint_count must be >= -1, got {}",
                    self.watchpoint_count
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        seed_directory = "seeds"
        output_directory = "out"
        binary_file = "bin/calc"
        input_channel = "file"
        instance = "direct"
        watchpoint_count = 4
        timeout = 5
        entrypoint = "parse_expr"
        input_buffer = "g_input"
    "#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let cfg = Config::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.gdb_path, PathBuf::from("gdb"));
        assert_eq!(cfg.log_level as i32, LogLevel::Info as i32);
        assert!(!cfg.callsite_qualified);
        assert!(!cfg.delay_wp);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_keys() {
        let bad = format!("{MINIMAL}\ntypo_key = \"x\"");
        assert!(Config::from_str(&bad).is_err());
    }

    #[test]
    fn serial_channel_requires_serial_table() {
        let mut cfg = Config::from_str(MINIMAL).unwrap();
        cfg.input_channel = InputChannel::Serial;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_watchpoint_count_other_than_unlimited_is_invalid() {
        let mut cfg = Config::from_str(MINIMAL).unwrap();
        cfg.watchpoint_count = -2;
        assert!(cfg.validate().is_err());
        cfg.watchpoint_count = -1;
        assert!(cfg.validate().is_ok());
    }
}
