//! Virtual battery state broker
//!
//! Lets a privileged agent publish battery telemetry (register, update,
//! unregister) while arbitrary consumers read individual properties through
//! a gated query interface.
//!
//! # Example
//!
//! ```
//! use vbatt_core::{BatteryRecord, Broker, ChargeStatus, DeviceName, Property, PropertyValue};
//!
//! let broker = Broker::new();
//! assert!(broker.get_property(Property::Capacity).is_err());
//!
//! broker
//!     .register(BatteryRecord {
//!         name: DeviceName::new("pipower5-batt").unwrap(),
//!         status: ChargeStatus::Discharging,
//!         capacity: 76,
//!         ..Default::default()
//!     })
//!     .unwrap();
//! assert_eq!(broker.get_property(Property::Capacity).unwrap(), PropertyValue::Int(76));
//! ```

pub mod broker;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod query;
pub mod record;
pub mod wire;

pub use broker::Broker;
pub use control::{ControlEvent, ControlOp, ControlRequest};
pub use error::BrokerError;
pub use lifecycle::{ChannelBinder, Lifecycle, LifecycleState, ReportingSubsystem, Resource, ResourceStack};
pub use query::{CATALOGUE, Property, PropertyValue, SupplyDescriptor};
pub use record::{BatteryRecord, CapacityLevel, ChargeStatus, DeviceName, SupplyType, Technology};
pub use wire::WireError;

/// Broker result type
pub type Result<T> = std::result::Result<T, BrokerError>;
