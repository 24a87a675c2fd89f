//! CLI parsing and YAML configuration loading (SPEC_FULL.md §4.0).
//!
//! Grounded in the original `_cli.py` (click) / `_config.py` (PyYAML)
//! pair and rendered in the idiom `sholiday-musicbox` uses for the same
//! kind of appliance: a `clap`-derived [`Cli`] plus a plain `serde`
//! config struct loaded from an optional file, with CLI flags overriding
//! file values.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "tapper", version, about = "HARDWARIO TAPPER device supervisor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the device supervisor.
    Run(RunArgs),
    /// Print the TAPPER version and exit.
    Version,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Path to the TAPPER YAML configuration file.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Enable debug mode: echo debug-level logs to standard error.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// MQTT broker host, overriding the config file.
    #[arg(short = 'H', long = "mqtt")]
    pub mqtt_host: Option<String>,
}

/// Raw YAML shape, mirroring `_config.py::load`'s expectations exactly
/// (spec.md §6: `mqtt.host`, `mqtt.port`, `mqtt.tls.*`, `legacy`, `wifi.*`).
#[derive(Debug, Deserialize)]
struct RawConfig {
    mqtt: RawMqtt,
    #[serde(default)]
    legacy: bool,
    #[serde(default)]
    wifi: Option<WifiConfig>,
}

#[derive(Debug, Deserialize)]
struct RawMqtt {
    host: Option<String>,
    #[serde(default = "default_mqtt_port")]
    port: u16,
    #[serde(default)]
    tls: Option<TlsConfig>,
}

fn default_mqtt_port() -> u16 {
    1883
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cafile: PathBuf,
    pub certfile: PathBuf,
    pub keyfile: PathBuf,
}

/// Wi-Fi provisioning is delegated to the host's network-management daemon
/// (spec.md §1, §6 — out of scope for the core). Parsed so the config file
/// can be validated in full, never interpreted here.
#[derive(Debug, Clone, Deserialize)]
pub struct WifiConfig {
    pub network: String,
    pub passphrase: String,
    pub mode: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub nameservers: Option<Vec<String>>,
}

/// Validated, merged configuration the supervisor actually runs from.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub tls: Option<TlsConfig>,
    pub legacy: bool,
    pub wifi: Option<WifiConfig>,
    pub debug: bool,
}

impl AppConfig {
    /// Load the YAML file at `config_path` (if any), then apply CLI
    /// overrides. `mqtt_host` must be resolvable from either source or
    /// loading fails — the Rust analogue of `_cli.py`'s
    /// `click.UsageError("MQTT host not specified!")`.
    pub fn load(config_path: Option<&Path>, args: &RunArgs) -> anyhow::Result<Self> {
        let raw = match config_path {
            Some(path) => Some(Self::read_yaml(path)?),
            None => None,
        };

        let mqtt_host = args
            .mqtt_host
            .clone()
            .or_else(|| raw.as_ref().and_then(|r| r.mqtt.host.clone()));

        let Some(mqtt_host) = mqtt_host else {
            bail!("MQTT host not specified! Pass --mqtt or set mqtt.host in the config file.");
        };

        let mqtt_port = raw.as_ref().map(|r| r.mqtt.port).unwrap_or_else(default_mqtt_port);
        let tls = raw.as_ref().and_then(|r| r.mqtt.tls.clone());
        let legacy = raw.as_ref().map(|r| r.legacy).unwrap_or(false);
        let wifi = raw.and_then(|r| r.wifi);

        Ok(Self { mqtt_host, mqtt_port, tls, legacy, wifi, debug: args.debug })
    }

    fn read_yaml(path: &Path) -> anyhow::Result<RawConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let raw: RawConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(raw)
    }
}

/// GPIO line numbers resolved from `legacy` (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct PinMap {
    pub buzzer: u32,
    pub tamper: u32,
    pub led_red: u32,
    pub led_green: u32,
    pub led_blue: u32,
    pub relay: u32,
}

impl PinMap {
    pub const DEFAULT: PinMap = PinMap {
        buzzer: 21,
        tamper: 6,
        led_red: 26,
        led_green: 13,
        led_blue: 19,
        relay: 14,
    };

    pub const LEGACY: PinMap = PinMap {
        buzzer: 18,
        tamper: 20,
        led_red: 17,
        led_green: 16,
        led_blue: 15,
        relay: 14,
    };

    pub fn resolve(legacy: bool) -> PinMap {
        if legacy { Self::LEGACY } else { Self::DEFAULT }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args() -> RunArgs {
        RunArgs { config_path: None, debug: false, mqtt_host: None }
    }

    #[test]
    fn missing_host_is_an_error() {
        let err = AppConfig::load(None, &run_args()).unwrap_err();
        assert!(err.to_string().contains("MQTT host"));
    }

    #[test]
    fn cli_override_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tapper.yaml");
        std::fs::write(&path, "mqtt:\n  host: broker.example\n  port: 8883\n").unwrap();

        let mut args = run_args();
        args.mqtt_host = Some("override.example".into());

        let cfg = AppConfig::load(Some(&path), &args).unwrap();
        assert_eq!(cfg.mqtt_host, "override.example");
        assert_eq!(cfg.mqtt_port, 8883);
    }

    #[test]
    fn default_port_is_1883() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tapper.yaml");
        std::fs::write(&path, "mqtt:\n  host: broker.example\n").unwrap();

        let cfg = AppConfig::load(Some(&path), &run_args()).unwrap();
        assert_eq!(cfg.mqtt_port, 1883);
        assert!(!cfg.legacy);
    }

    #[test]
    fn legacy_pin_map_differs_from_default() {
        let legacy = PinMap::resolve(true);
        let default = PinMap::resolve(false);
        assert_ne!(legacy.buzzer, default.buzzer);
        assert_eq!(legacy.relay, default.relay);
    }
}
