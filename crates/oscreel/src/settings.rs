//! Validated runtime settings
//!
//! `reelconf` gathers raw values from files and the environment, the binary
//! layers CLI flags on top, and this module turns the result into settings
//! the services can trust. Everything here fails before a socket is bound.

use std::path::PathBuf;

use reelconf::{RecorderConfig, ReplayerConfig};

use crate::repeater::parse_repeater_ports;
use crate::replay::{ReplayError, SpeedFactor};
use crate::scheme::{Scheme, UnknownScheme};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error(transparent)]
    Scheme(#[from] UnknownScheme),

    #[error(transparent)]
    Speed(#[from] ReplayError),
}

/// Everything `oscreel record` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSettings {
    pub listen_address: String,
    pub listen_port: u16,
    pub output: PathBuf,
    pub scheme: Scheme,
    pub repeater_ports: Vec<u16>,
    pub quantized: bool,
}

impl RecordSettings {
    pub fn resolve(config: &RecorderConfig) -> Result<Self, SettingsError> {
        let listen_address = config
            .listen_address
            .clone()
            .filter(|a| !a.trim().is_empty())
            .ok_or(SettingsError::Missing("listen_address"))?;
        let listen_port = config
            .listen_port
            .filter(|p| *p != 0)
            .ok_or(SettingsError::Missing("listen_port"))?;
        let output = config
            .output
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(SettingsError::Missing("output"))?;
        let scheme: Scheme = config
            .scheme
            .as_deref()
            .ok_or(SettingsError::Missing("scheme"))?
            .parse()?;

        let repeater_ports = config
            .repeaters
            .as_deref()
            .map(parse_repeater_ports)
            .unwrap_or_default();

        Ok(Self {
            listen_address,
            listen_port,
            output,
            scheme,
            repeater_ports,
            quantized: config.quantized.unwrap_or(false),
        })
    }
}

/// Everything `oscreel replay` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySettings {
    pub input: PathBuf,
    pub destination_address: String,
    pub destination_port: u16,
    pub speed: SpeedFactor,
}

impl ReplaySettings {
    pub fn resolve(config: &ReplayerConfig) -> Result<Self, SettingsError> {
        let input = config
            .input
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(SettingsError::Missing("input"))?;

        Ok(Self {
            input,
            destination_address: config.destination_address.clone(),
            destination_port: config.destination_port,
            speed: SpeedFactor::new(config.speed)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder_config() -> RecorderConfig {
        RecorderConfig {
            listen_address: Some("127.0.0.1".to_string()),
            listen_port: Some(57120),
            output: Some(PathBuf::from("/tmp/out.json")),
            scheme: Some("dirt_strip".to_string()),
            repeaters: Some("57121,nope,57122".to_string()),
            quantized: Some(true),
        }
    }

    #[test]
    fn test_resolve_record_settings() {
        let settings = RecordSettings::resolve(&recorder_config()).unwrap();
        assert_eq!(settings.scheme, Scheme::DirtStrip);
        assert_eq!(settings.repeater_ports, vec![57121, 57122]);
        assert!(settings.quantized);
    }

    #[test]
    fn test_record_requires_each_field() {
        let cases: [(&str, fn(&mut RecorderConfig)); 4] = [
            ("listen_address", |c| c.listen_address = None),
            ("listen_port", |c| c.listen_port = Some(0)),
            ("output", |c| c.output = None),
            ("scheme", |c| c.scheme = None),
        ];
        for (name, clear) in cases {
            let mut config = recorder_config();
            clear(&mut config);
            match RecordSettings::resolve(&config) {
                Err(SettingsError::Missing(missing)) => assert_eq!(missing, name),
                other => panic!("expected missing {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let mut config = recorder_config();
        config.scheme = Some("everything".to_string());
        assert!(matches!(
            RecordSettings::resolve(&config),
            Err(SettingsError::Scheme(_))
        ));
    }

    #[test]
    fn test_replay_defaults() {
        let config = ReplayerConfig {
            input: Some(PathBuf::from("session.json")),
            ..Default::default()
        };
        let settings = ReplaySettings::resolve(&config).unwrap();
        assert_eq!(settings.destination_address, "127.0.0.1");
        assert_eq!(settings.destination_port, 8000);
        assert_eq!(settings.speed.get(), 1.0);
    }

    #[test]
    fn test_replay_rejects_non_positive_speed() {
        for speed in [0.0, -2.0] {
            let config = ReplayerConfig {
                input: Some(PathBuf::from("session.json")),
                speed,
                ..Default::default()
            };
            assert!(matches!(
                ReplaySettings::resolve(&config),
                Err(SettingsError::Speed(_))
            ));
        }
    }

    #[test]
    fn test_replay_requires_input() {
        assert!(matches!(
            ReplaySettings::resolve(&ReplayerConfig::default()),
            Err(SettingsError::Missing("input"))
        ));
    }
}
