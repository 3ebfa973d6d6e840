//! Agent-side battery profile
//!
//! Static design values the agent registers with before the first reading
//! arrives. Defaults describe the PiPower 5 pack.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vbatt_core::{SupplyType, Technology};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Name written into the battery record
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_supply_type")]
    pub supply_type: SupplyType,

    #[serde(default = "default_technology")]
    pub technology: Technology,

    /// Microvolts
    #[serde(default = "default_voltage_max")]
    pub voltage_max_design: i64,

    /// Microvolts
    #[serde(default = "default_voltage_min")]
    pub voltage_min_design: i64,

    /// Microjoules
    #[serde(default = "default_energy_full")]
    pub energy_full_design: i64,

    /// Broker control socket to connect to
    #[serde(default = "default_control_socket")]
    pub control_socket: PathBuf,
}

fn default_name() -> String {
    "PiPower 5".to_string()
}

fn default_supply_type() -> SupplyType {
    SupplyType::Battery
}

fn default_technology() -> Technology {
    Technology::LiIon
}

fn default_voltage_max() -> i64 {
    8_400_000
}

fn default_voltage_min() -> i64 {
    6_200_000
}

fn default_energy_full() -> i64 {
    14_800_000
}

fn default_control_socket() -> PathBuf {
    PathBuf::from(crate::DEFAULT_CONTROL_SOCKET)
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: default_name(),
            supply_type: default_supply_type(),
            technology: default_technology(),
            voltage_max_design: default_voltage_max(),
            voltage_min_design: default_voltage_min(),
            energy_full_design: default_energy_full(),
            control_socket: default_control_socket(),
        }
    }
}
