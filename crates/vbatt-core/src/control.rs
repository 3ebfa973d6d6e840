//! Control channel requests

use crate::error::BrokerError;
use crate::record::BatteryRecord;
use crate::wire::{self, OP_REGISTER, OP_UNREGISTER, OP_UPDATE};
use std::time::SystemTime;

/// The three control operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOp {
    Register,
    Update,
    Unregister,
}

impl ControlOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlOp::Register => "register",
            ControlOp::Update => "update",
            ControlOp::Unregister => "unregister",
        }
    }

    /// Wire opcode
    pub fn opcode(&self) -> u32 {
        match self {
            ControlOp::Register => OP_REGISTER,
            ControlOp::Update => OP_UPDATE,
            ControlOp::Unregister => OP_UNREGISTER,
        }
    }

    pub fn from_opcode(opcode: u32) -> Option<Self> {
        match opcode {
            OP_REGISTER => Some(ControlOp::Register),
            OP_UPDATE => Some(ControlOp::Update),
            OP_UNREGISTER => Some(ControlOp::Unregister),
            _ => None,
        }
    }
}

/// A validated control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    Register(BatteryRecord),
    Update(BatteryRecord),
    Unregister,
}

impl ControlRequest {
    /// Decode a raw frame
    ///
    /// The unregister argument carries no meaning and is ignored.
    pub fn from_frame(opcode: u32, payload: &[u8]) -> Result<Self, BrokerError> {
        let op = ControlOp::from_opcode(opcode).ok_or(BrokerError::UnsupportedOperation(opcode))?;
        match op {
            ControlOp::Register => Ok(ControlRequest::Register(decode(payload)?)),
            ControlOp::Update => Ok(ControlRequest::Update(decode(payload)?)),
            ControlOp::Unregister => Ok(ControlRequest::Unregister),
        }
    }

    /// Encode as (opcode, payload)
    pub fn to_frame(&self) -> (u32, Vec<u8>) {
        match self {
            ControlRequest::Register(record) => (OP_REGISTER, wire::encode_record(record).to_vec()),
            ControlRequest::Update(record) => (OP_UPDATE, wire::encode_record(record).to_vec()),
            ControlRequest::Unregister => (OP_UNREGISTER, 1i32.to_le_bytes().to_vec()),
        }
    }

    pub fn op(&self) -> ControlOp {
        match self {
            ControlRequest::Register(_) => ControlOp::Register,
            ControlRequest::Update(_) => ControlOp::Update,
            ControlRequest::Unregister => ControlOp::Unregister,
        }
    }
}

fn decode(payload: &[u8]) -> Result<BatteryRecord, BrokerError> {
    wire::decode_record(payload).map_err(|e| BrokerError::InvalidInput(e.to_string()))
}

/// Observable trace of a successful control call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub op: ControlOp,
    pub at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ChargeStatus, DeviceName};

    #[test]
    fn test_opcode_mapping() {
        for op in [ControlOp::Register, ControlOp::Update, ControlOp::Unregister] {
            assert_eq!(ControlOp::from_opcode(op.opcode()), Some(op));
        }
        assert_eq!(ControlOp::from_opcode(0x5413), None);
    }

    #[test]
    fn test_from_frame() {
        let record = BatteryRecord {
            name: DeviceName::new("pipower5").unwrap(),
            status: ChargeStatus::Charging,
            capacity: 42,
            ..Default::default()
        };
        let (opcode, payload) = ControlRequest::Register(record).to_frame();
        assert_eq!(
            ControlRequest::from_frame(opcode, &payload).unwrap(),
            ControlRequest::Register(record)
        );

        let (opcode, payload) = ControlRequest::Unregister.to_frame();
        assert_eq!(
            ControlRequest::from_frame(opcode, &payload).unwrap(),
            ControlRequest::Unregister
        );
        assert_eq!(
            ControlRequest::from_frame(OP_UNREGISTER, &[]).unwrap(),
            ControlRequest::Unregister
        );
    }

    #[test]
    fn test_from_frame_rejects_bad_input() {
        assert!(matches!(
            ControlRequest::from_frame(OP_UPDATE, &[0u8; 12]),
            Err(BrokerError::InvalidInput(_))
        ));
        assert!(matches!(
            ControlRequest::from_frame(0xdead_beef, &[]),
            Err(BrokerError::UnsupportedOperation(0xdead_beef))
        ));
    }
}
