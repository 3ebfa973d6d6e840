//! Registered battery session

use crate::reading::BoardReading;
use crate::{AgentError, ControlClient};
use vbatt_config::AgentProfile;
use vbatt_core::{BatteryRecord, CapacityLevel, ChargeStatus, DeviceName};

/// A battery registered with the broker, kept current from board readings
pub struct BatteryAgent {
    client: ControlClient,
    record: BatteryRecord,
}

impl BatteryAgent {
    /// Initial record for a profile, before any reading
    pub fn initial_record(profile: &AgentProfile) -> Result<BatteryRecord, AgentError> {
        let name = DeviceName::new(&profile.name).ok_or_else(|| {
            AgentError::InvalidProfile(format!("battery name {:?} is too long", profile.name))
        })?;

        Ok(BatteryRecord {
            name,
            supply_type: profile.supply_type,
            technology: profile.technology,
            status: ChargeStatus::Unknown,
            capacity: 100,
            capacity_level: CapacityLevel::Unknown,
            present: true,
            online: true,
            voltage_max_design: profile.voltage_max_design,
            voltage_min_design: profile.voltage_min_design,
            voltage_now: profile.voltage_max_design,
            current_now: 0,
            energy_full: profile.energy_full_design,
            energy_now: profile.energy_full_design,
            energy_full_design: profile.energy_full_design,
            power_now: 0,
        })
    }

    /// Register the battery described by `profile`
    pub fn register(mut client: ControlClient, profile: &AgentProfile) -> Result<Self, AgentError> {
        let record = Self::initial_record(profile)?;
        client.register(&record)?;
        tracing::info!("Virtual battery {} registered", record.name);

        Ok(Self { client, record })
    }

    /// Fold a reading into the record and push it to the broker
    pub fn publish(&mut self, reading: &BoardReading) -> Result<(), AgentError> {
        reading.apply(&mut self.record);
        if let Err(e) = self.client.update(&self.record) {
            tracing::error!("Failed to update battery status: {}", e);
            return Err(e);
        }
        tracing::debug!(
            "Published capacity={} status={}",
            self.record.capacity,
            self.record.status.as_str()
        );
        Ok(())
    }

    /// Last record sent to the broker
    pub fn record(&self) -> &BatteryRecord {
        &self.record
    }

    /// Unregister the battery
    pub fn shutdown(mut self) -> Result<(), AgentError> {
        self.client.unregister()?;
        tracing::info!("Virtual battery unregistered");
        Ok(())
    }
}
