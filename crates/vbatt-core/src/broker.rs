//! Battery state broker
//!
//! Owns the single battery record and its registration flag. Both sit behind
//! one `RwLock` so a reader always sees a whole record: control calls take
//! the write lock for the full replacement, property queries share the read
//! lock. A separate gate turns every new call away once shutdown starts.

use crate::control::{ControlEvent, ControlOp, ControlRequest};
use crate::error::BrokerError;
use crate::query::{Property, PropertyValue};
use crate::record::BatteryRecord;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

#[derive(Debug, Default)]
struct BrokerState {
    record: BatteryRecord,
    registered: bool,
    last_event: Option<ControlEvent>,
}

/// Virtual battery broker
#[derive(Debug)]
pub struct Broker {
    state: RwLock<BrokerState>,
    open: AtomicBool,
}

impl Broker {
    /// Create a broker with a zeroed, unregistered record
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BrokerState::default()),
            open: AtomicBool::new(true),
        }
    }

    /// Replace the record and mark it live
    pub fn register(&self, record: BatteryRecord) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let mut state = self.write()?;
        let replaced = state.registered;
        state.record = record;
        state.registered = true;
        state.last_event = Some(event(ControlOp::Register));
        drop(state);

        if replaced {
            tracing::info!("Virtual battery re-registered as {}", record.name);
        } else {
            tracing::info!("Virtual battery registered as {}", record.name);
        }
        Ok(())
    }

    /// Replace the record without touching the registration flag
    pub fn update(&self, record: BatteryRecord) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let mut state = self.write()?;
        state.record = record;
        state.last_event = Some(event(ControlOp::Update));
        let registered = state.registered;
        drop(state);

        if !registered {
            tracing::debug!("Update applied while unregistered; record stays hidden");
        }
        Ok(())
    }

    /// Hide the record; idempotent
    pub fn unregister(&self) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let mut state = self.write()?;
        let was_registered = std::mem::replace(&mut state.registered, false);
        state.last_event = Some(event(ControlOp::Unregister));
        drop(state);

        if was_registered {
            tracing::info!("Virtual battery unregistered");
        }
        Ok(())
    }

    /// Dispatch a decoded control request
    pub fn handle(&self, request: ControlRequest) -> Result<(), BrokerError> {
        match request {
            ControlRequest::Register(record) => self.register(record),
            ControlRequest::Update(record) => self.update(record),
            ControlRequest::Unregister => self.unregister(),
        }
    }

    /// Decode and dispatch a raw control frame
    pub fn handle_frame(&self, opcode: u32, payload: &[u8]) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let request = ControlRequest::from_frame(opcode, payload)?;
        self.handle(request)
    }

    /// Read one property from the live record
    pub fn get_property(&self, property: Property) -> Result<PropertyValue, BrokerError> {
        self.ensure_open()?;
        let state = self.read()?;
        if !state.registered {
            return Err(BrokerError::NotAvailable);
        }
        Ok(property.read(&state.record))
    }

    /// Resolve a property by name and read it
    ///
    /// The gate and the registration flag are checked before the name, so an
    /// unavailable battery answers `NotAvailable` whatever is asked.
    pub fn get_property_by_name(&self, name: &str) -> Result<PropertyValue, BrokerError> {
        self.ensure_open()?;
        let state = self.read()?;
        if !state.registered {
            return Err(BrokerError::NotAvailable);
        }
        let property = Property::from_name(name)?;
        Ok(property.read(&state.record))
    }

    /// `Ok` when a property query would currently be served
    pub fn check_available(&self) -> Result<(), BrokerError> {
        self.ensure_open()?;
        if self.read()?.registered {
            Ok(())
        } else {
            Err(BrokerError::NotAvailable)
        }
    }

    /// Whether the record is currently live
    pub fn is_registered(&self) -> bool {
        self.read().map(|state| state.registered).unwrap_or(false)
    }

    /// Most recent successful control call
    pub fn last_event(&self) -> Option<ControlEvent> {
        self.read().ok().and_then(|state| state.last_event)
    }

    /// Stop accepting new calls; calls already admitted finish normally
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            tracing::debug!("Broker closed to new calls");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(BrokerError::NotAvailable)
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BrokerState>, BrokerError> {
        self.state
            .read()
            .map_err(|_| BrokerError::InternalInconsistency("battery state lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BrokerState>, BrokerError> {
        self.state
            .write()
            .map_err(|_| BrokerError::InternalInconsistency("battery state lock poisoned".into()))
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

fn event(op: ControlOp) -> ControlEvent {
    ControlEvent {
        op,
        at: SystemTime::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CATALOGUE;
    use crate::record::{ChargeStatus, DeviceName, Technology};
    use crate::wire::{OP_REGISTER, OP_UNREGISTER, encode_record};
    use std::sync::Arc;

    fn record(capacity: i32) -> BatteryRecord {
        BatteryRecord {
            name: DeviceName::new("pipower5-batt").unwrap(),
            technology: Technology::LiIon,
            status: ChargeStatus::Discharging,
            capacity,
            present: true,
            voltage_now: 4_050_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_broker_is_gated() {
        let broker = Broker::new();
        assert!(!broker.is_registered());
        for property in CATALOGUE {
            assert!(matches!(
                broker.get_property(property),
                Err(BrokerError::NotAvailable)
            ));
        }
        assert!(broker.last_event().is_none());
    }

    #[test]
    fn test_register_then_query() {
        let broker = Broker::new();
        broker.register(record(76)).unwrap();
        assert_eq!(
            broker.get_property(Property::Capacity).unwrap(),
            PropertyValue::Int(76)
        );
        assert_eq!(
            broker.get_property_by_name("status").unwrap(),
            PropertyValue::Status(ChargeStatus::Discharging)
        );
        assert_eq!(broker.last_event().unwrap().op, ControlOp::Register);
    }

    #[test]
    fn test_reregister_replaces_whole_record() {
        let broker = Broker::new();
        broker.register(record(76)).unwrap();
        let mut second = record(12);
        second.voltage_now = 0;
        broker.register(second).unwrap();
        assert_eq!(
            broker.get_property(Property::Capacity).unwrap(),
            PropertyValue::Int(12)
        );
        assert_eq!(
            broker.get_property(Property::VoltageNow).unwrap(),
            PropertyValue::Int(0)
        );
    }

    #[test]
    fn test_unknown_name_is_gated() {
        let broker = Broker::new();
        assert!(matches!(
            broker.get_property_by_name("temp"),
            Err(BrokerError::NotAvailable)
        ));
        assert!(matches!(
            broker.check_available(),
            Err(BrokerError::NotAvailable)
        ));

        broker.register(record(76)).unwrap();
        assert!(broker.check_available().is_ok());
        assert!(matches!(
            broker.get_property_by_name("temp"),
            Err(BrokerError::UnsupportedProperty(_))
        ));

        broker.close();
        assert!(matches!(
            broker.get_property_by_name("temp"),
            Err(BrokerError::NotAvailable)
        ));
        assert!(matches!(
            broker.get_property_by_name("capacity"),
            Err(BrokerError::NotAvailable)
        ));
    }

    #[test]
    fn test_update_keeps_flag() {
        let broker = Broker::new();
        broker.update(record(50)).unwrap();
        assert!(!broker.is_registered());
        assert!(broker.get_property(Property::Capacity).is_err());
        assert_eq!(broker.last_event().unwrap().op, ControlOp::Update);

        broker.register(record(60)).unwrap();
        broker.update(record(61)).unwrap();
        assert!(broker.is_registered());
        assert_eq!(
            broker.get_property(Property::Capacity).unwrap(),
            PropertyValue::Int(61)
        );
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let broker = Broker::new();
        broker.register(record(76)).unwrap();
        broker.unregister().unwrap();
        broker.unregister().unwrap();
        assert!(!broker.is_registered());
        assert!(matches!(
            broker.get_property(Property::Capacity),
            Err(BrokerError::NotAvailable)
        ));
    }

    #[test]
    fn test_handle_frame() {
        let broker = Broker::new();
        broker
            .handle_frame(OP_REGISTER, &encode_record(&record(33)))
            .unwrap();
        assert!(broker.is_registered());

        assert!(matches!(
            broker.handle_frame(OP_REGISTER, &[0u8; 64]),
            Err(BrokerError::InvalidInput(_))
        ));
        assert_eq!(
            broker.get_property(Property::Capacity).unwrap(),
            PropertyValue::Int(33)
        );

        broker.handle_frame(OP_UNREGISTER, &[1, 0, 0, 0]).unwrap();
        assert!(!broker.is_registered());
    }

    #[test]
    fn test_closed_broker_rejects_everything() {
        let broker = Broker::new();
        broker.register(record(76)).unwrap();
        broker.close();
        assert!(!broker.is_open());
        assert!(matches!(
            broker.get_property(Property::Capacity),
            Err(BrokerError::NotAvailable)
        ));
        assert!(matches!(
            broker.update(record(1)),
            Err(BrokerError::NotAvailable)
        ));
        assert!(matches!(
            broker.unregister(),
            Err(BrokerError::NotAvailable)
        ));
    }

    #[test]
    fn test_poisoned_lock_fails_single_call() {
        let broker = Arc::new(Broker::new());
        let poisoner = Arc::clone(&broker);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(
            broker.register(record(1)),
            Err(BrokerError::InternalInconsistency(_))
        ));
        assert!(matches!(
            broker.get_property(Property::Capacity),
            Err(BrokerError::InternalInconsistency(_))
        ));
        assert!(!broker.is_registered());
    }
}
