//! Control socket client

use crate::AgentError;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;
use vbatt_core::wire::{REPLY_LEN, encode_frame};
use vbatt_core::{BatteryRecord, BrokerError, ControlRequest};

/// Timeout for a single request/reply exchange
pub const CLIENT_TIMEOUT_MS: u64 = 1000;

/// Connection to the broker's control channel
pub struct ControlClient {
    stream: UnixStream,
}

impl ControlClient {
    /// Connect to the control socket
    pub fn connect(path: &Path) -> Result<Self, AgentError> {
        if !path.exists() {
            tracing::error!("Virtual battery control socket not found at {}", path.display());
            return Err(AgentError::SocketNotFound(path.to_path_buf()));
        }

        let stream = UnixStream::connect(path)?;
        let timeout = Duration::from_millis(CLIENT_TIMEOUT_MS);
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        tracing::info!("Control socket opened: {}", path.display());
        Ok(Self { stream })
    }

    pub fn register(&mut self, record: &BatteryRecord) -> Result<(), AgentError> {
        self.send(&ControlRequest::Register(*record))
    }

    pub fn update(&mut self, record: &BatteryRecord) -> Result<(), AgentError> {
        self.send(&ControlRequest::Update(*record))
    }

    pub fn unregister(&mut self) -> Result<(), AgentError> {
        self.send(&ControlRequest::Unregister)
    }

    /// Send a request and wait for its status
    pub fn send(&mut self, request: &ControlRequest) -> Result<(), AgentError> {
        let (opcode, payload) = request.to_frame();
        self.send_raw(opcode, &payload)
    }

    /// Send an arbitrary frame; exposed for protocol testing
    pub fn send_raw(&mut self, opcode: u32, payload: &[u8]) -> Result<(), AgentError> {
        self.stream.write_all(&encode_frame(opcode, payload))?;

        let mut reply = [0u8; REPLY_LEN];
        self.stream.read_exact(&mut reply)?;
        let status = i32::from_le_bytes(reply);

        match BrokerError::from_errno(status, opcode) {
            None => Ok(()),
            Some(e) => Err(AgentError::Rejected(e)),
        }
    }
}
