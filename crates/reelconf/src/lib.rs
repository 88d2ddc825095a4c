//! Minimal configuration loading for oscreel.
//!
//! Both the `record` and `replay` subcommands read the same layered
//! configuration. Command-line flags are applied on top by the binary.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/oscreel/config.toml` (system)
//! 2. `~/.config/oscreel/config.toml` (user)
//! 3. `./oscreel.toml` or the path given with `--config` (local override)
//! 4. Environment variables (`OSCREEL_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [recorder]
//! listen_address = "0.0.0.0"
//! listen_port = 57120
//! output = "~/sessions/tidal.json"
//! scheme = "dirt_strip"
//! repeaters = "57121, 57122"
//! quantized = true
//!
//! [replayer]
//! destination_address = "127.0.0.1"
//! destination_port = 57120
//! speed = 1.0
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use settings::{RecorderConfig, ReplayerConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete oscreel configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReelConfig {
    #[serde(default)]
    pub recorder: RecorderConfig,

    #[serde(default)]
    pub replayer: ReplayerConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ReelConfig {
    /// Load configuration, letting `config_path` replace `./oscreel.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and env vars contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = ReelConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# oscreel configuration\n\n");

        output.push_str("[recorder]\n");
        if let Some(address) = &self.recorder.listen_address {
            output.push_str(&format!("listen_address = \"{}\"\n", address));
        }
        if let Some(port) = self.recorder.listen_port {
            output.push_str(&format!("listen_port = {}\n", port));
        }
        if let Some(path) = &self.recorder.output {
            output.push_str(&format!("output = \"{}\"\n", path.display()));
        }
        if let Some(scheme) = &self.recorder.scheme {
            output.push_str(&format!("scheme = \"{}\"\n", scheme));
        }
        if let Some(repeaters) = &self.recorder.repeaters {
            output.push_str(&format!("repeaters = \"{}\"\n", repeaters));
        }
        if let Some(quantized) = self.recorder.quantized {
            output.push_str(&format!("quantized = {}\n", quantized));
        }

        output.push_str("\n[replayer]\n");
        if let Some(path) = &self.replayer.input {
            output.push_str(&format!("input = \"{}\"\n", path.display()));
        }
        output.push_str(&format!(
            "destination_address = \"{}\"\n",
            self.replayer.destination_address
        ));
        output.push_str(&format!(
            "destination_port = {}\n",
            self.replayer.destination_port
        ));
        output.push_str(&format!("speed = {:?}\n", self.replayer.speed));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output
    }
}
