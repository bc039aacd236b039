//! Server configuration.
//!
//! Loaded from a YAML file, then `DOORBELL_*` environment overrides, then
//! command-line overrides in `main.rs`.
//!
//! ```yaml
//! trigger_port: 5050
//! status_port: 2882
//! advertise_ip: 192.168.1.20
//! sounds_dir: /var/lib/doorbell/sounds
//! fade:
//!   step: 5
//!   interval_ms: 100
//! doorbell:
//!   header: "10!x1"
//!   volume_override: true
//!   override_volume: 60
//! ```

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use doorbell_core::{Config, DoorbellSettings};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address speakers reach the sound share at.
    /// If not specified, auto-detection is retried until it succeeds.
    /// Override: `DOORBELL_ADVERTISE_IP`
    pub advertise_ip: Option<IpAddr>,

    /// Engine tuning (ports, timings, discovery).
    #[serde(flatten)]
    pub engine: Config,

    /// Doorbell behaviour.
    pub doorbell: DoorbellSettings,
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies overrides from `lookup`; unparsable values are ignored.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("DOORBELL_TRIGGER_PORT").and_then(|v| v.parse().ok()) {
            self.engine.trigger_port = port;
        }
        if let Some(port) = lookup("DOORBELL_STATUS_PORT").and_then(|v| v.parse().ok()) {
            self.engine.status_port = port;
        }
        if let Some(ip) = lookup("DOORBELL_ADVERTISE_IP").and_then(|v| v.parse().ok()) {
            self.advertise_ip = Some(ip);
        }
        if let Some(share) = lookup("DOORBELL_SHARE_NAME") {
            self.engine.share_name = share;
        }
        if let Some(header) = lookup("DOORBELL_HEADER") {
            self.doorbell.header = header;
        }
        if let Some(enabled) = lookup("DOORBELL_ENABLED").and_then(|v| v.parse().ok()) {
            self.doorbell.enabled = enabled;
        }

        // Note: DOORBELL_SOUNDS_DIR is handled by clap via #[arg(env = ...)] in main.rs
    }

    pub fn set_sounds_dir(&mut self, dir: PathBuf) {
        self.engine.sounds_dir = dir;
    }
}
