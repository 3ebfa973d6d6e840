//! Broker daemon configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vbatt_core::SupplyType;

/// Identity advertised to the reporting subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Power supply name
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Power supply type
    #[serde(default = "default_supply_type")]
    pub supply_type: SupplyType,
}

fn default_device_name() -> String {
    "pipower5".to_string()
}

fn default_supply_type() -> SupplyType {
    SupplyType::Battery
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            supply_type: default_supply_type(),
        }
    }
}

/// A Unix socket endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Socket path
    pub socket_path: PathBuf,

    /// File mode applied after bind
    pub mode: u32,
}

fn default_control() -> SocketConfig {
    SocketConfig {
        socket_path: PathBuf::from(crate::DEFAULT_CONTROL_SOCKET),
        // Privileged writers only
        mode: 0o600,
    }
}

fn default_query() -> SocketConfig {
    SocketConfig {
        socket_path: PathBuf::from("/run/vbatt/pipower5.query"),
        mode: 0o666,
    }
}

/// Broker daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Refuse to start unless running as root
    #[serde(default = "default_true")]
    pub require_root: bool,

    /// Advertised identity
    #[serde(default)]
    pub device: DeviceConfig,

    /// Control channel endpoint
    #[serde(default = "default_control")]
    pub control: SocketConfig,

    /// Query interface endpoint
    #[serde(default = "default_query")]
    pub query: SocketConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            require_root: default_true(),
            device: DeviceConfig::default(),
            control: default_control(),
            query: default_query(),
        }
    }
}
