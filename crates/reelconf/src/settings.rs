//! Per-subcommand configuration sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Live capture settings.
///
/// Everything except `repeaters` and `quantized` is required before the
/// recorder binds a socket, but any of it may come from a file, the
/// environment or the command line, so the fields are optional here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Address to listen on, e.g. "127.0.0.1" or "0.0.0.0".
    #[serde(default)]
    pub listen_address: Option<String>,

    /// UDP port to listen on.
    #[serde(default)]
    pub listen_port: Option<u16>,

    /// Where the session JSON is written on shutdown.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Payload transform name (basic, dirt_basic, dirt_strip, only_numbers).
    #[serde(default)]
    pub scheme: Option<String>,

    /// Comma-separated ports that receive an untransformed copy of traffic.
    #[serde(default)]
    pub repeaters: Option<String>,

    /// Shift the session start to the first message. Unset means off.
    #[serde(default)]
    pub quantized: Option<bool>,
}

/// Replay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayerConfig {
    /// Recorded session to play back.
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Default: 127.0.0.1
    #[serde(default = "ReplayerConfig::default_destination_address")]
    pub destination_address: String,

    /// Default: 8000
    #[serde(default = "ReplayerConfig::default_destination_port")]
    pub destination_port: u16,

    /// 2.0 plays twice as fast, 0.5 half as fast.
    #[serde(default = "ReplayerConfig::default_speed")]
    pub speed: f64,
}

impl ReplayerConfig {
    fn default_destination_address() -> String {
        "127.0.0.1".to_string()
    }

    fn default_destination_port() -> u16 {
        8000
    }

    fn default_speed() -> f64 {
        1.0
    }
}

impl Default for ReplayerConfig {
    fn default() -> Self {
        Self {
            input: None,
            destination_address: Self::default_destination_address(),
            destination_port: Self::default_destination_port(),
            speed: Self::default_speed(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// EnvFilter directive. Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
