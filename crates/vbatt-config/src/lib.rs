//! Configuration management for vbatt
//!
//! One TOML file with a `[broker]` table for the daemon and an `[agent]`
//! table for the agent library. Every field has a default, so an empty or
//! missing file yields a working setup.

mod agent_profile;
mod broker_config;

pub use agent_profile::AgentProfile;
pub use broker_config::{BrokerConfig, DeviceConfig, SocketConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vbatt_core::DeviceName;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/vbatt";
pub const CONFIG_FILE: &str = "vbatt.toml";

/// Control socket shared by the daemon and agent defaults
pub const DEFAULT_CONTROL_SOCKET: &str = "/run/vbatt/pipower5.ctl";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VbattConfig {
    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub agent: AgentProfile,
}

impl VbattConfig {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the standard location, falling back to defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        let system_config = Path::new(CONFIG_DIR).join(CONFIG_FILE);
        if system_config.exists() {
            return Self::load(&system_config);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        let broker = &self.broker;
        if broker.device.name.is_empty() || DeviceName::new(&broker.device.name).is_none() {
            return Err(ConfigError::Invalid(format!(
                "device name {:?} must be 1-32 bytes",
                broker.device.name
            )));
        }
        if DeviceName::new(&self.agent.name).is_none() {
            return Err(ConfigError::Invalid(format!(
                "agent battery name {:?} must be at most 32 bytes",
                self.agent.name
            )));
        }
        for (label, socket) in [("control", &broker.control), ("query", &broker.query)] {
            if socket.mode > 0o777 {
                return Err(ConfigError::Invalid(format!(
                    "{} socket mode {:o} is not a permission mask",
                    label, socket.mode
                )));
            }
            if socket.socket_path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{} socket path is empty", label)));
            }
        }
        if broker.control.socket_path == broker.query.socket_path {
            return Err(ConfigError::Invalid(
                "control and query sockets must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed broker device name
    pub fn device_name(&self) -> Result<DeviceName, ConfigError> {
        DeviceName::new(&self.broker.device.name)
            .ok_or_else(|| ConfigError::Invalid(format!("bad device name {:?}", self.broker.device.name)))
    }
}
