//! Board readings and their translation into battery fields

use serde::{Deserialize, Serialize};
use vbatt_core::{BatteryRecord, CapacityLevel, ChargeStatus};

/// Below this percentage the pack is reported absent
const PRESENT_THRESHOLD: f64 = 2.0;

/// Discharge current (mA) above which the pack counts as discharging
const DISCHARGE_THRESHOLD_MA: f64 = 20.0;

/// One sample from the power board, in the board's own units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardReading {
    pub battery_voltage_mv: f64,
    pub battery_current_ma: f64,
    pub battery_percentage: f64,
    pub is_charging: bool,
    pub is_input_plugged_in: bool,
}

impl BoardReading {
    pub fn status(&self) -> ChargeStatus {
        if self.is_charging {
            ChargeStatus::Charging
        } else if self.battery_current_ma > DISCHARGE_THRESHOLD_MA {
            ChargeStatus::Discharging
        } else if self.battery_percentage == 100.0 {
            ChargeStatus::Full
        } else {
            ChargeStatus::NotCharging
        }
    }

    pub fn capacity_level(&self) -> CapacityLevel {
        let pct = self.battery_percentage;
        if pct > 90.0 {
            CapacityLevel::Full
        } else if pct > 80.0 {
            CapacityLevel::High
        } else if pct > 30.0 {
            CapacityLevel::Normal
        } else if pct > 10.0 {
            CapacityLevel::Low
        } else {
            CapacityLevel::Critical
        }
    }

    /// Overwrite the live fields of `record` from this reading
    ///
    /// Design values and identity are left alone.
    pub fn apply(&self, record: &mut BatteryRecord) {
        record.present = self.battery_percentage > PRESENT_THRESHOLD;
        record.capacity = self.battery_percentage as i32;
        record.online = self.is_input_plugged_in;
        record.capacity_level = self.capacity_level();
        record.status = self.status();
        record.voltage_now = round(self.battery_voltage_mv * 1000.0);
        record.current_now = round(self.battery_current_ma * 1000.0);
        record.energy_now =
            round(self.battery_percentage * record.energy_full_design as f64 / 100.0);
        // mV x mA is already microwatts
        record.power_now = round(self.battery_voltage_mv * self.battery_current_ma);
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}
