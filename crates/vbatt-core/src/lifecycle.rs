//! Broker lifecycle
//!
//! Brings the broker up in a fixed order and tears it down in reverse:
//!
//! 1. Bind the control endpoint
//! 2. Register the query interface with the reporting subsystem
//! 3. Go active
//!
//! Every acquired endpoint is pushed onto a [`ResourceStack`]. A failed
//! startup and a normal shutdown both unwind that stack, so nothing acquired
//! is ever left behind.

use crate::broker::Broker;
use crate::error::BrokerError;
use crate::query::SupplyDescriptor;
use std::fmt;
use std::sync::Arc;

/// Lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    ChannelReady,
    InterfaceRegistered,
    Active,
    ShuttingDown,
    Terminated,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::ChannelReady => "channel-ready",
            LifecycleState::InterfaceRegistered => "interface-registered",
            LifecycleState::Active => "active",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Terminated => "terminated",
        }
    }
}

/// Something acquired during startup that must be given back
pub trait Resource: Send {
    /// Short label for logs
    fn describe(&self) -> String;

    /// Give the resource back; must not wait on in-flight callers
    fn release(self: Box<Self>) -> Result<(), BrokerError>;
}

/// Creates the control-channel endpoint
pub trait ChannelBinder {
    fn bind(&mut self, broker: Arc<Broker>) -> Result<Box<dyn Resource>, BrokerError>;
}

/// External framework that surfaces battery properties to consumers
pub trait ReportingSubsystem {
    fn register(
        &mut self,
        descriptor: &SupplyDescriptor,
        broker: Arc<Broker>,
    ) -> Result<Box<dyn Resource>, BrokerError>;
}

/// Acquired resources, released last-in first-out
#[derive(Default)]
pub struct ResourceStack {
    entries: Vec<Box<dyn Resource>>,
}

impl ResourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: Box<dyn Resource>) {
        tracing::debug!("Acquired {}", resource.describe());
        self.entries.push(resource);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release everything in reverse order; returns the number of failures
    pub fn unwind(&mut self) -> usize {
        let mut failures = 0;
        while let Some(resource) = self.entries.pop() {
            let label = resource.describe();
            match resource.release() {
                Ok(()) => tracing::debug!("Released {}", label),
                Err(e) => {
                    failures += 1;
                    tracing::warn!("Failed to release {}: {}", label, e);
                }
            }
        }
        failures
    }
}

impl Drop for ResourceStack {
    fn drop(&mut self) {
        self.unwind();
    }
}

/// Owns broker setup and teardown
pub struct Lifecycle {
    state: LifecycleState,
    broker: Arc<Broker>,
    descriptor: SupplyDescriptor,
    resources: ResourceStack,
}

impl Lifecycle {
    pub fn new(descriptor: SupplyDescriptor) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            broker: Arc::new(Broker::new()),
            descriptor,
            resources: ResourceStack::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn descriptor(&self) -> &SupplyDescriptor {
        &self.descriptor
    }

    /// Acquire the control endpoint and query registration, then go active
    ///
    /// On failure everything acquired so far is released before returning
    /// and the lifecycle ends in `Terminated`.
    pub fn start(
        &mut self,
        binder: &mut dyn ChannelBinder,
        subsystem: &mut dyn ReportingSubsystem,
    ) -> Result<(), BrokerError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(BrokerError::InternalInconsistency(format!(
                "cannot start from state {}",
                self.state.name()
            )));
        }

        tracing::info!("Starting virtual battery broker for {}", self.descriptor.name);

        match binder.bind(Arc::clone(&self.broker)) {
            Ok(channel) => {
                self.resources.push(channel);
                self.transition(LifecycleState::ChannelReady);
            }
            Err(e) => {
                tracing::error!("Failed to create control endpoint: {}", e);
                return Err(self.abort("control endpoint", e));
            }
        }

        match subsystem.register(&self.descriptor, Arc::clone(&self.broker)) {
            Ok(registration) => {
                self.resources.push(registration);
                self.transition(LifecycleState::InterfaceRegistered);
            }
            Err(e) => {
                tracing::error!("Failed to register power supply: {}", e);
                return Err(self.abort("query interface", e));
            }
        }

        self.transition(LifecycleState::Active);
        tracing::info!("Virtual battery broker loaded");
        Ok(())
    }

    /// Close the broker and release resources in reverse order
    pub fn shutdown(&mut self) {
        match self.state {
            LifecycleState::Terminated | LifecycleState::ShuttingDown => return,
            _ => {}
        }

        self.transition(LifecycleState::ShuttingDown);
        self.broker.close();
        let failures = self.resources.unwind();
        self.transition(LifecycleState::Terminated);

        if failures == 0 {
            tracing::info!("Virtual battery broker unloaded");
        } else {
            tracing::warn!(
                "Virtual battery broker unloaded with {} release failure(s)",
                failures
            );
        }
    }

    fn abort(&mut self, resource: &str, cause: BrokerError) -> BrokerError {
        self.broker.close();
        let failures = self.resources.unwind();
        if failures > 0 {
            tracing::warn!("Rollback left {} release failure(s)", failures);
        }
        self.transition(LifecycleState::Terminated);

        match cause {
            e @ BrokerError::ResourceAcquisitionFailed { .. } => e,
            other => BrokerError::acquisition(resource, other),
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!("Lifecycle {} -> {}", self.state.name(), next.name());
        self.state = next;
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state)
            .field("descriptor", &self.descriptor)
            .field("resources", &self.resources.len())
            .finish()
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Noted {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Resource for Noted {
        fn describe(&self) -> String {
            self.label.to_string()
        }

        fn release(self: Box<Self>) -> Result<(), BrokerError> {
            self.log.lock().unwrap().push(self.label.to_string());
            if self.fail {
                Err(BrokerError::InternalInconsistency("stuck".into()))
            } else {
                Ok(())
            }
        }
    }

    fn noted(label: &'static str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Box<dyn Resource> {
        Box::new(Noted {
            label,
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn test_stack_unwinds_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ResourceStack::new();
        stack.push(noted("first", &log, false));
        stack.push(noted("second", &log, true));
        stack.push(noted("third", &log, false));
        assert_eq!(stack.len(), 3);

        assert_eq!(stack.unwind(), 1);
        assert!(stack.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_stack_unwinds_on_drop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let mut stack = ResourceStack::new();
            stack.push(noted("only", &log, false));
        }
        assert_eq!(*log.lock().unwrap(), vec!["only"]);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(LifecycleState::Active.name(), "active");
        assert_eq!(LifecycleState::ChannelReady.name(), "channel-ready");
    }

    #[test]
    fn test_debug_shows_state_and_device() {
        use crate::record::{DeviceName, SupplyType};

        let lifecycle = Lifecycle::new(SupplyDescriptor::new(
            DeviceName::new("pipower5").unwrap(),
            SupplyType::Battery,
        ));
        let text = format!("{:?}", lifecycle);
        assert!(text.contains("Uninitialized"));
        assert!(text.contains("pipower5"));
    }
}
