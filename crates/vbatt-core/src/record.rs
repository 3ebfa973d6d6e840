//! Battery record
//!
//! The in-memory snapshot of everything the virtual battery reports. Enum
//! discriminants follow the Linux power-supply class so that values sent by
//! an agent written against the kernel headers decode unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capacity of the fixed-size name field, in bytes
pub const NAME_LEN: usize = 32;

/// Power supply kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyType {
    #[default]
    Unknown,
    Battery,
    Ups,
    Mains,
    Usb,
    UsbDcp,
    UsbCdp,
    UsbAca,
}

impl SupplyType {
    pub fn code(self) -> i32 {
        match self {
            SupplyType::Unknown => 0,
            SupplyType::Battery => 1,
            SupplyType::Ups => 2,
            SupplyType::Mains => 3,
            SupplyType::Usb => 4,
            SupplyType::UsbDcp => 5,
            SupplyType::UsbCdp => 6,
            SupplyType::UsbAca => 7,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SupplyType::Unknown),
            1 => Some(SupplyType::Battery),
            2 => Some(SupplyType::Ups),
            3 => Some(SupplyType::Mains),
            4 => Some(SupplyType::Usb),
            5 => Some(SupplyType::UsbDcp),
            6 => Some(SupplyType::UsbCdp),
            7 => Some(SupplyType::UsbAca),
            _ => None,
        }
    }

    /// sysfs spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyType::Unknown => "Unknown",
            SupplyType::Battery => "Battery",
            SupplyType::Ups => "UPS",
            SupplyType::Mains => "Mains",
            SupplyType::Usb => "USB",
            SupplyType::UsbDcp => "USB_DCP",
            SupplyType::UsbCdp => "USB_CDP",
            SupplyType::UsbAca => "USB_ACA",
        }
    }
}

/// Battery chemistry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    #[default]
    Unknown,
    NiMH,
    LiIon,
    LiPo,
    LiFe,
    NiCd,
    LiMn,
}

impl Technology {
    pub fn code(self) -> i32 {
        match self {
            Technology::Unknown => 0,
            Technology::NiMH => 1,
            Technology::LiIon => 2,
            Technology::LiPo => 3,
            Technology::LiFe => 4,
            Technology::NiCd => 5,
            Technology::LiMn => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Technology::Unknown),
            1 => Some(Technology::NiMH),
            2 => Some(Technology::LiIon),
            3 => Some(Technology::LiPo),
            4 => Some(Technology::LiFe),
            5 => Some(Technology::NiCd),
            6 => Some(Technology::LiMn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Unknown => "Unknown",
            Technology::NiMH => "NiMH",
            Technology::LiIon => "Li-ion",
            Technology::LiPo => "Li-poly",
            Technology::LiFe => "LiFe",
            Technology::NiCd => "NiCd",
            Technology::LiMn => "LiMn",
        }
    }
}

/// Charging status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    #[default]
    Unknown,
    Charging,
    Discharging,
    NotCharging,
    Full,
}

impl ChargeStatus {
    pub fn code(self) -> i32 {
        match self {
            ChargeStatus::Unknown => 0,
            ChargeStatus::Charging => 1,
            ChargeStatus::Discharging => 2,
            ChargeStatus::NotCharging => 3,
            ChargeStatus::Full => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ChargeStatus::Unknown),
            1 => Some(ChargeStatus::Charging),
            2 => Some(ChargeStatus::Discharging),
            3 => Some(ChargeStatus::NotCharging),
            4 => Some(ChargeStatus::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Unknown => "Unknown",
            ChargeStatus::Charging => "Charging",
            ChargeStatus::Discharging => "Discharging",
            ChargeStatus::NotCharging => "Not charging",
            ChargeStatus::Full => "Full",
        }
    }
}

/// Coarse charge level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityLevel {
    #[default]
    Unknown,
    Critical,
    Low,
    Normal,
    High,
    Full,
}

impl CapacityLevel {
    pub fn code(self) -> i32 {
        match self {
            CapacityLevel::Unknown => 0,
            CapacityLevel::Critical => 1,
            CapacityLevel::Low => 2,
            CapacityLevel::Normal => 3,
            CapacityLevel::High => 4,
            CapacityLevel::Full => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(CapacityLevel::Unknown),
            1 => Some(CapacityLevel::Critical),
            2 => Some(CapacityLevel::Low),
            3 => Some(CapacityLevel::Normal),
            4 => Some(CapacityLevel::High),
            5 => Some(CapacityLevel::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityLevel::Unknown => "Unknown",
            CapacityLevel::Critical => "Critical",
            CapacityLevel::Low => "Low",
            CapacityLevel::Normal => "Normal",
            CapacityLevel::High => "High",
            CapacityLevel::Full => "Full",
        }
    }
}

/// Fixed-capacity, NUL-padded device name
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceName([u8; NAME_LEN]);

impl DeviceName {
    /// Build from text; fails if it does not fit or contains NUL
    pub fn new(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() > NAME_LEN || bytes.contains(&0) {
            return None;
        }
        let mut buf = [0u8; NAME_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Self(buf))
    }

    /// Wrap raw wire bytes as-is
    pub fn from_bytes(bytes: [u8; NAME_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    /// Text up to the first NUL, lossily decoded
    pub fn as_string(&self) -> String {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl Default for DeviceName {
    fn default() -> Self {
        Self([0u8; NAME_LEN])
    }
}

impl fmt::Debug for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceName({:?})", self.as_string())
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl TryFrom<String> for DeviceName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DeviceName::new(&value)
            .ok_or_else(|| format!("device name must be at most {} bytes without NUL", NAME_LEN))
    }
}

impl From<DeviceName> for String {
    fn from(name: DeviceName) -> Self {
        name.as_string()
    }
}

/// Complete battery snapshot
///
/// Voltages are in microvolts, currents in microamperes, energies in
/// microjoules and power in microwatts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatteryRecord {
    pub name: DeviceName,
    pub supply_type: SupplyType,
    pub technology: Technology,
    pub status: ChargeStatus,
    /// Percentage; values outside 0-100 are carried through untouched
    pub capacity: i32,
    pub capacity_level: CapacityLevel,
    pub present: bool,
    pub online: bool,
    pub voltage_max_design: i64,
    pub voltage_min_design: i64,
    pub voltage_now: i64,
    pub current_now: i64,
    pub energy_full: i64,
    pub energy_now: i64,
    pub energy_full_design: i64,
    pub power_now: i64,
}
