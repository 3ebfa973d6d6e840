//! Agent side of the virtual battery
//!
//! Talks to the broker's control socket on behalf of whatever samples the
//! power board, and turns raw board readings into battery records.
//!
//! # Example
//!
//! ```no_run
//! use vbatt_agent::{BatteryAgent, BoardReading, ControlClient};
//! use vbatt_config::AgentProfile;
//!
//! fn main() -> Result<(), vbatt_agent::AgentError> {
//!     let profile = AgentProfile::default();
//!     let client = ControlClient::connect(&profile.control_socket)?;
//!     let mut agent = BatteryAgent::register(client, &profile)?;
//!
//!     agent.publish(&BoardReading {
//!         battery_voltage_mv: 8_100.0,
//!         battery_current_ma: 350.0,
//!         battery_percentage: 76.0,
//!         is_charging: false,
//!         is_input_plugged_in: false,
//!     })?;
//!
//!     agent.shutdown()
//! }
//! ```

mod agent;
mod client;
mod reading;

pub use agent::BatteryAgent;
pub use client::ControlClient;
pub use reading::BoardReading;

use thiserror::Error;
use vbatt_core::BrokerError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Control socket not found: {0}")]
    SocketNotFound(std::path::PathBuf),

    #[error("Broker rejected request: {0}")]
    Rejected(#[from] BrokerError),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
