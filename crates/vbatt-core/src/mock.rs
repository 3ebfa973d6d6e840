//! Mock host adapters for testing without sockets
//!
//! `MockHost` stands in for both the control endpoint and the reporting
//! subsystem. It records every acquire and release in a journal and can be
//! told to fail any step, which makes rollback ordering observable.
//!
//! # Usage
//!
//! ```
//! use vbatt_core::mock::MockHost;
//! use vbatt_core::{DeviceName, Lifecycle, SupplyDescriptor, SupplyType};
//!
//! let host = MockHost::new();
//! let descriptor = SupplyDescriptor::new(DeviceName::new("pipower5").unwrap(), SupplyType::Battery);
//! let mut lifecycle = Lifecycle::new(descriptor);
//! lifecycle.start(&mut host.binder(), &mut host.subsystem()).unwrap();
//! assert!(host.is_bound());
//! ```

use crate::broker::Broker;
use crate::error::BrokerError;
use crate::lifecycle::{ChannelBinder, ReportingSubsystem, Resource};
use crate::query::{Property, PropertyValue, SupplyDescriptor};
use std::sync::{Arc, RwLock};

/// Which step a mock should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Bind,
    Register,
    ReleaseChannel,
    ReleaseRegistration,
}

/// Shared state behind every mock handle
#[derive(Debug, Default)]
pub struct MockHostState {
    pub journal: Vec<String>,
    pub failures: Vec<MockFailure>,
    pub bound: Option<Arc<Broker>>,
    pub registered: Option<(SupplyDescriptor, Arc<Broker>)>,
}

impl MockHostState {
    fn fails(&self, failure: MockFailure) -> bool {
        self.failures.contains(&failure)
    }
}

/// Mock host environment
#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<RwLock<MockHostState>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given step fail
    pub fn fail(&self, failure: MockFailure) {
        if let Ok(mut state) = self.state.write() {
            state.failures.push(failure);
        }
    }

    pub fn binder(&self) -> MockBinder {
        MockBinder {
            state: Arc::clone(&self.state),
        }
    }

    pub fn subsystem(&self) -> MockSubsystem {
        MockSubsystem {
            state: Arc::clone(&self.state),
        }
    }

    /// Acquire/release history
    pub fn journal(&self) -> Vec<String> {
        self.state
            .read()
            .map(|state| state.journal.clone())
            .unwrap_or_default()
    }

    pub fn is_bound(&self) -> bool {
        self.state
            .read()
            .map(|state| state.bound.is_some())
            .unwrap_or(false)
    }

    pub fn is_registered(&self) -> bool {
        self.state
            .read()
            .map(|state| state.registered.is_some())
            .unwrap_or(false)
    }

    /// Descriptor currently advertised, if any
    pub fn advertised(&self) -> Option<SupplyDescriptor> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.registered.as_ref().map(|(d, _)| d.clone()))
    }

    /// Query a property the way a consumer of the subsystem would
    pub fn query(&self, property: Property) -> Result<PropertyValue, BrokerError> {
        let broker = self
            .state
            .read()
            .map_err(|_| BrokerError::InternalInconsistency("mock state poisoned".into()))?
            .registered
            .as_ref()
            .map(|(_, broker)| Arc::clone(broker))
            .ok_or(BrokerError::NotAvailable)?;
        broker.get_property(property)
    }

    /// Send a raw control frame through the bound endpoint
    pub fn control(&self, opcode: u32, payload: &[u8]) -> Result<(), BrokerError> {
        let broker = self
            .state
            .read()
            .map_err(|_| BrokerError::InternalInconsistency("mock state poisoned".into()))?
            .bound
            .clone()
            .ok_or(BrokerError::NotAvailable)?;
        broker.handle_frame(opcode, payload)
    }
}

/// Mock control endpoint factory
pub struct MockBinder {
    state: Arc<RwLock<MockHostState>>,
}

impl ChannelBinder for MockBinder {
    fn bind(&mut self, broker: Arc<Broker>) -> Result<Box<dyn Resource>, BrokerError> {
        let mut state = lock(&self.state)?;
        if state.fails(MockFailure::Bind) {
            state.journal.push("bind failed".into());
            return Err(BrokerError::acquisition("mock channel", "bind refused"));
        }
        state.journal.push("bind channel".into());
        state.bound = Some(broker);
        Ok(Box::new(MockChannel {
            state: Arc::clone(&self.state),
        }))
    }
}

/// Mock reporting subsystem
pub struct MockSubsystem {
    state: Arc<RwLock<MockHostState>>,
}

impl ReportingSubsystem for MockSubsystem {
    fn register(
        &mut self,
        descriptor: &SupplyDescriptor,
        broker: Arc<Broker>,
    ) -> Result<Box<dyn Resource>, BrokerError> {
        let mut state = lock(&self.state)?;
        if state.fails(MockFailure::Register) {
            state.journal.push("register failed".into());
            return Err(BrokerError::InternalInconsistency(
                "power supply class refused registration".into(),
            ));
        }
        state.journal.push(format!("register {}", descriptor.name));
        state.registered = Some((descriptor.clone(), broker));
        Ok(Box::new(MockRegistration {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockChannel {
    state: Arc<RwLock<MockHostState>>,
}

impl Resource for MockChannel {
    fn describe(&self) -> String {
        "mock control channel".into()
    }

    fn release(self: Box<Self>) -> Result<(), BrokerError> {
        let mut state = lock(&self.state)?;
        state.bound = None;
        state.journal.push("release channel".into());
        if state.fails(MockFailure::ReleaseChannel) {
            return Err(BrokerError::InternalInconsistency("channel busy".into()));
        }
        Ok(())
    }
}

struct MockRegistration {
    state: Arc<RwLock<MockHostState>>,
}

impl Resource for MockRegistration {
    fn describe(&self) -> String {
        "mock power supply registration".into()
    }

    fn release(self: Box<Self>) -> Result<(), BrokerError> {
        let mut state = lock(&self.state)?;
        state.registered = None;
        state.journal.push("unregister interface".into());
        if state.fails(MockFailure::ReleaseRegistration) {
            return Err(BrokerError::InternalInconsistency("sysfs busy".into()));
        }
        Ok(())
    }
}

fn lock(
    state: &Arc<RwLock<MockHostState>>,
) -> Result<std::sync::RwLockWriteGuard<'_, MockHostState>, BrokerError> {
    state
        .write()
        .map_err(|_| BrokerError::InternalInconsistency("mock state poisoned".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DeviceName, SupplyType};

    fn descriptor() -> SupplyDescriptor {
        SupplyDescriptor::new(DeviceName::new("pipower5").unwrap(), SupplyType::Battery)
    }

    #[test]
    fn test_mock_bind_and_release() {
        let host = MockHost::new();
        let channel = host.binder().bind(Arc::new(Broker::new())).unwrap();
        assert!(host.is_bound());
        channel.release().unwrap();
        assert!(!host.is_bound());
        assert_eq!(host.journal(), vec!["bind channel", "release channel"]);
    }

    #[test]
    fn test_mock_register_advertises_descriptor() {
        let host = MockHost::new();
        let registration = host
            .subsystem()
            .register(&descriptor(), Arc::new(Broker::new()))
            .unwrap();
        assert_eq!(host.advertised(), Some(descriptor()));
        assert!(matches!(
            host.query(Property::Capacity),
            Err(BrokerError::NotAvailable)
        ));
        registration.release().unwrap();
        assert!(host.advertised().is_none());
    }

    #[test]
    fn test_mock_failures() {
        let host = MockHost::new();
        host.fail(MockFailure::Bind);
        assert!(host.binder().bind(Arc::new(Broker::new())).is_err());
        assert!(!host.is_bound());
        assert_eq!(host.journal(), vec!["bind failed"]);
    }
}
