//! Query interface property catalogue

use crate::error::BrokerError;
use crate::record::{BatteryRecord, ChargeStatus, DeviceName, SupplyType, Technology};
use std::fmt;

/// A queryable battery property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Status,
    Present,
    Online,
    Technology,
    Capacity,
    VoltageMaxDesign,
    VoltageMinDesign,
    VoltageNow,
    CurrentNow,
    EnergyFull,
    EnergyNow,
    EnergyFullDesign,
    PowerNow,
}

/// Every property the interface advertises, in catalogue order
pub const CATALOGUE: [Property; 13] = [
    Property::Status,
    Property::Present,
    Property::Online,
    Property::Technology,
    Property::Capacity,
    Property::VoltageMaxDesign,
    Property::VoltageMinDesign,
    Property::VoltageNow,
    Property::CurrentNow,
    Property::EnergyFull,
    Property::EnergyNow,
    Property::EnergyFullDesign,
    Property::PowerNow,
];

impl Property {
    /// sysfs attribute name
    pub fn name(&self) -> &'static str {
        match self {
            Property::Status => "status",
            Property::Present => "present",
            Property::Online => "online",
            Property::Technology => "technology",
            Property::Capacity => "capacity",
            Property::VoltageMaxDesign => "voltage_max_design",
            Property::VoltageMinDesign => "voltage_min_design",
            Property::VoltageNow => "voltage_now",
            Property::CurrentNow => "current_now",
            Property::EnergyFull => "energy_full",
            Property::EnergyNow => "energy_now",
            Property::EnergyFullDesign => "energy_full_design",
            Property::PowerNow => "power_now",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, BrokerError> {
        let name = name.trim();
        CATALOGUE
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| BrokerError::UnsupportedProperty(name.to_string()))
    }

    /// Pull this property out of a record
    pub fn read(&self, record: &BatteryRecord) -> PropertyValue {
        match self {
            Property::Status => PropertyValue::Status(record.status),
            Property::Present => PropertyValue::Flag(record.present),
            Property::Online => PropertyValue::Flag(record.online),
            Property::Technology => PropertyValue::Technology(record.technology),
            Property::Capacity => PropertyValue::Int(i64::from(record.capacity)),
            Property::VoltageMaxDesign => PropertyValue::Int(record.voltage_max_design),
            Property::VoltageMinDesign => PropertyValue::Int(record.voltage_min_design),
            Property::VoltageNow => PropertyValue::Int(record.voltage_now),
            Property::CurrentNow => PropertyValue::Int(record.current_now),
            Property::EnergyFull => PropertyValue::Int(record.energy_full),
            Property::EnergyNow => PropertyValue::Int(record.energy_now),
            Property::EnergyFullDesign => PropertyValue::Int(record.energy_full_design),
            Property::PowerNow => PropertyValue::Int(record.power_now),
        }
    }
}

/// A single scalar answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValue {
    Status(ChargeStatus),
    Technology(Technology),
    Flag(bool),
    Int(i64),
}

impl PropertyValue {
    /// Numeric form, as the kernel's `intval`
    pub fn as_int(&self) -> i64 {
        match self {
            PropertyValue::Status(status) => i64::from(status.code()),
            PropertyValue::Technology(tech) => i64::from(tech.code()),
            PropertyValue::Flag(flag) => i64::from(*flag),
            PropertyValue::Int(value) => *value,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Status(status) => f.write_str(status.as_str()),
            PropertyValue::Technology(tech) => f.write_str(tech.as_str()),
            PropertyValue::Flag(flag) => write!(f, "{}", u8::from(*flag)),
            PropertyValue::Int(value) => write!(f, "{}", value),
        }
    }
}

/// What the broker advertises to the reporting subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyDescriptor {
    pub name: DeviceName,
    pub supply_type: SupplyType,
    pub properties: Vec<Property>,
}

impl SupplyDescriptor {
    pub fn new(name: DeviceName, supply_type: SupplyType) -> Self {
        Self {
            name,
            supply_type,
            properties: CATALOGUE.to_vec(),
        }
    }

    pub fn supports(&self, property: Property) -> bool {
        self.properties.contains(&property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_resolve() {
        for property in CATALOGUE {
            assert_eq!(Property::from_name(property.name()).unwrap(), property);
        }
        assert_eq!(
            Property::from_name(" Capacity\n").unwrap(),
            Property::Capacity
        );
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            Property::from_name("capacity_level"),
            Err(BrokerError::UnsupportedProperty(name)) if name == "capacity_level"
        ));
        assert!(Property::from_name("name").is_err());
        assert!(Property::from_name("").is_err());
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(
            PropertyValue::Status(ChargeStatus::Discharging).to_string(),
            "Discharging"
        );
        assert_eq!(
            PropertyValue::Technology(Technology::LiIon).to_string(),
            "Li-ion"
        );
        assert_eq!(PropertyValue::Flag(true).to_string(), "1");
        assert_eq!(PropertyValue::Int(-350_000).to_string(), "-350000");
    }

    #[test]
    fn test_as_int() {
        assert_eq!(PropertyValue::Status(ChargeStatus::Full).as_int(), 4);
        assert_eq!(PropertyValue::Flag(false).as_int(), 0);
        assert_eq!(PropertyValue::Int(5_000_000_000).as_int(), 5_000_000_000);
    }

    #[test]
    fn test_descriptor_catalogue() {
        let descriptor = SupplyDescriptor::new(
            DeviceName::new("pipower5").unwrap(),
            SupplyType::Battery,
        );
        assert_eq!(descriptor.properties.len(), 13);
        assert!(descriptor.supports(Property::PowerNow));
    }
}
