//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, RecorderConfig, ReelConfig, ReplayerConfig, TelemetryConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only existing
/// files are returned.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/oscreel/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("oscreel/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("oscreel.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<ReelConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from a TOML string.
///
/// Sections and keys are picked out of the raw table so that a file only
/// has to mention what it changes.
pub(crate) fn parse_toml(contents: &str, path: &Path) -> Result<ReelConfig, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut config = ReelConfig::default();

    if let Some(recorder) = table.get("recorder").and_then(|v| v.as_table()) {
        if let Some(v) = recorder.get("listen_address").and_then(|v| v.as_str()) {
            config.recorder.listen_address = Some(v.to_string());
        }
        if let Some(v) = recorder.get("listen_port") {
            config.recorder.listen_port = Some(port_value(v, "recorder.listen_port", path)?);
        }
        if let Some(v) = recorder.get("output").and_then(|v| v.as_str()) {
            config.recorder.output = Some(expand_path(v));
        }
        if let Some(v) = recorder.get("scheme").and_then(|v| v.as_str()) {
            config.recorder.scheme = Some(v.to_string());
        }
        if let Some(v) = recorder.get("repeaters") {
            // Accept both "57121,57122" and [57121, 57122]
            let list = match v {
                toml::Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        toml::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            config.recorder.repeaters = Some(list);
        }
        if let Some(v) = recorder.get("quantized").and_then(|v| v.as_bool()) {
            config.recorder.quantized = Some(v);
        }
    }

    if let Some(replayer) = table.get("replayer").and_then(|v| v.as_table()) {
        if let Some(v) = replayer.get("input").and_then(|v| v.as_str()) {
            config.replayer.input = Some(expand_path(v));
        }
        if let Some(v) = replayer.get("destination_address").and_then(|v| v.as_str()) {
            config.replayer.destination_address = v.to_string();
        }
        if let Some(v) = replayer.get("destination_port") {
            config.replayer.destination_port = port_value(v, "replayer.destination_port", path)?;
        }
        if let Some(v) = replayer.get("speed") {
            config.replayer.speed = match v {
                toml::Value::Float(f) => *f,
                toml::Value::Integer(i) => *i as f64,
                _ => {
                    return Err(ConfigError::Parse {
                        path: path.to_path_buf(),
                        message: "replayer.speed must be a number".to_string(),
                    })
                }
            };
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(config)
}

fn port_value(value: &toml::Value, key: &str, path: &Path) -> Result<u16, ConfigError> {
    value
        .as_integer()
        .and_then(|i| u16::try_from(i).ok())
        .ok_or_else(|| ConfigError::Parse {
            path: path.to_path_buf(),
            message: format!("{} must be an integer between 0 and 65535", key),
        })
}

/// Merge two configs, with `overlay` taking precedence.
///
/// Optional values fall back to `base` when the overlay leaves them unset;
/// defaulted values fall back when the overlay still holds the default.
pub fn merge_configs(base: ReelConfig, overlay: ReelConfig) -> ReelConfig {
    let replayer_default = ReplayerConfig::default();
    let telemetry_default = TelemetryConfig::default();

    ReelConfig {
        recorder: RecorderConfig {
            listen_address: overlay.recorder.listen_address.or(base.recorder.listen_address),
            listen_port: overlay.recorder.listen_port.or(base.recorder.listen_port),
            output: overlay.recorder.output.or(base.recorder.output),
            scheme: overlay.recorder.scheme.or(base.recorder.scheme),
            repeaters: overlay.recorder.repeaters.or(base.recorder.repeaters),
            quantized: overlay.recorder.quantized.or(base.recorder.quantized),
        },
        replayer: ReplayerConfig {
            input: overlay.replayer.input.or(base.replayer.input),
            destination_address: if overlay.replayer.destination_address
                != replayer_default.destination_address
            {
                overlay.replayer.destination_address
            } else {
                base.replayer.destination_address
            },
            destination_port: if overlay.replayer.destination_port
                != replayer_default.destination_port
            {
                overlay.replayer.destination_port
            } else {
                base.replayer.destination_port
            },
            speed: if overlay.replayer.speed != replayer_default.speed {
                overlay.replayer.speed
            } else {
                base.replayer.speed
            },
        },
        telemetry: TelemetryConfig {
            log_level: if overlay.telemetry.log_level != telemetry_default.log_level {
                overlay.telemetry.log_level
            } else {
                base.telemetry.log_level
            },
        },
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ReelConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides using an arbitrary lookup, so tests need not touch the
/// process environment.
pub fn apply_overrides_from<F>(config: &mut ReelConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Recorder
    if let Some(v) = lookup("OSCREEL_LISTEN_ADDRESS") {
        config.recorder.listen_address = Some(v);
        sources.env_overrides.push("OSCREEL_LISTEN_ADDRESS".to_string());
    }
    if let Some(v) = lookup("OSCREEL_LISTEN_PORT") {
        if let Ok(port) = v.trim().parse() {
            config.recorder.listen_port = Some(port);
            sources.env_overrides.push("OSCREEL_LISTEN_PORT".to_string());
        }
    }
    if let Some(v) = lookup("OSCREEL_OUTPUT") {
        config.recorder.output = Some(expand_path(&v));
        sources.env_overrides.push("OSCREEL_OUTPUT".to_string());
    }
    if let Some(v) = lookup("OSCREEL_SCHEME") {
        config.recorder.scheme = Some(v);
        sources.env_overrides.push("OSCREEL_SCHEME".to_string());
    }
    if let Some(v) = lookup("OSCREEL_REPEATERS") {
        config.recorder.repeaters = Some(v);
        sources.env_overrides.push("OSCREEL_REPEATERS".to_string());
    }
    if let Some(v) = lookup("OSCREEL_QUANTIZED") {
        if let Some(flag) = parse_bool(&v) {
            config.recorder.quantized = Some(flag);
            sources.env_overrides.push("OSCREEL_QUANTIZED".to_string());
        }
    }

    // Replayer
    if let Some(v) = lookup("OSCREEL_DESTINATION_ADDRESS") {
        config.replayer.destination_address = v;
        sources.env_overrides.push("OSCREEL_DESTINATION_ADDRESS".to_string());
    }
    if let Some(v) = lookup("OSCREEL_DESTINATION_PORT") {
        if let Ok(port) = v.trim().parse() {
            config.replayer.destination_port = port;
            sources.env_overrides.push("OSCREEL_DESTINATION_PORT".to_string());
        }
    }
    if let Some(v) = lookup("OSCREEL_SPEED") {
        if let Ok(speed) = v.trim().parse() {
            config.replayer.speed = speed;
            sources.env_overrides.push("OSCREEL_SPEED".to_string());
        }
    }

    // Telemetry
    if let Some(v) = lookup("OSCREEL_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("OSCREEL_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
