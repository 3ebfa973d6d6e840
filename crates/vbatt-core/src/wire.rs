//! Control wire format
//!
//! # Payload layout
//!
//! ```text
//! offset  size  field
//!      0    32  name (NUL padded)
//!     32     4  type            i32
//!     36     4  technology      i32
//!     40     4  status          i32
//!     44     4  capacity        i32
//!     48     4  capacity_level  i32
//!     52     4  present         i32 (non-zero = true)
//!     56     4  online          i32 (non-zero = true)
//!     60     4  reserved        ignored on decode, zero on encode
//!     64    64  voltage_max_design, voltage_min_design, voltage_now,
//!               current_now, energy_full, energy_now,
//!               energy_full_design, power_now      i64 each
//! ```
//!
//! All integers are little-endian. The reserved word is the alignment hole
//! a C compiler leaves on LP64 targets, so the layout matches a C
//! `struct virtual_battery_props`.
//!
//! # Frames
//!
//! A request frame is `opcode: u32`, `len: u32`, then `len` payload bytes.
//! The reply is a single `i32` status: zero or a negative errno.

use crate::record::{
    BatteryRecord, CapacityLevel, ChargeStatus, DeviceName, NAME_LEN, SupplyType, Technology,
};
use thiserror::Error;

/// Size of an encoded [`BatteryRecord`]
pub const PAYLOAD_LEN: usize = 128;

/// Size of the unregister argument (an unused C `int`)
pub const UNREGISTER_ARG_LEN: usize = 4;

/// Size of a frame header
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest payload a frame may announce
pub const MAX_FRAME_PAYLOAD: usize = 4096;

/// Size of a reply frame
pub const REPLY_LEN: usize = 4;

/// Magic byte shared by all control opcodes
pub const OPCODE_MAGIC: u8 = b'V';

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;
const IOC_SIZEMASK: u32 = (1 << 14) - 1;
const IOC_WRITE: u32 = 1;

/// `_IOW(type, nr, size)` as the kernel headers compute it
pub const fn iow(kind: u8, nr: u8, size: usize) -> u32 {
    (IOC_WRITE << IOC_DIRSHIFT)
        | ((kind as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | (((size as u32) & IOC_SIZEMASK) << IOC_SIZESHIFT)
}

pub const OP_REGISTER: u32 = iow(OPCODE_MAGIC, 0x10, PAYLOAD_LEN);
pub const OP_UNREGISTER: u32 = iow(OPCODE_MAGIC, 0x11, UNREGISTER_ARG_LEN);
pub const OP_UPDATE: u32 = iow(OPCODE_MAGIC, 0x12, PAYLOAD_LEN);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("payload is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("{field} code {code} is out of range")]
    BadCode { field: &'static str, code: i32 },

    #[error("frame announces {0} payload bytes")]
    Oversized(usize),
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub opcode: u32,
    pub len: usize,
}

impl FrameHeader {
    pub fn parse(bytes: [u8; FRAME_HEADER_LEN]) -> Result<Self, WireError> {
        let opcode = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        if len > MAX_FRAME_PAYLOAD {
            return Err(WireError::Oversized(len));
        }
        Ok(Self { opcode, len })
    }

    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut out = [0u8; FRAME_HEADER_LEN];
        out[..4].copy_from_slice(&self.opcode.to_le_bytes());
        out[4..].copy_from_slice(&(self.len as u32).to_le_bytes());
        out
    }
}

/// Encode a full request frame
pub fn encode_frame(opcode: u32, payload: &[u8]) -> Vec<u8> {
    let header = FrameHeader {
        opcode,
        len: payload.len(),
    };
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    out
}

/// Encode a record into its fixed wire layout
pub fn encode_record(record: &BatteryRecord) -> [u8; PAYLOAD_LEN] {
    let mut out = [0u8; PAYLOAD_LEN];
    out[..NAME_LEN].copy_from_slice(record.name.as_bytes());

    let words = [
        record.supply_type.code(),
        record.technology.code(),
        record.status.code(),
        record.capacity,
        record.capacity_level.code(),
        i32::from(record.present),
        i32::from(record.online),
        0,
    ];
    for (i, word) in words.iter().enumerate() {
        let at = NAME_LEN + i * 4;
        out[at..at + 4].copy_from_slice(&word.to_le_bytes());
    }

    let wide = [
        record.voltage_max_design,
        record.voltage_min_design,
        record.voltage_now,
        record.current_now,
        record.energy_full,
        record.energy_now,
        record.energy_full_design,
        record.power_now,
    ];
    for (i, value) in wide.iter().enumerate() {
        let at = 64 + i * 8;
        out[at..at + 8].copy_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decode and validate a payload
pub fn decode_record(payload: &[u8]) -> Result<BatteryRecord, WireError> {
    if payload.len() != PAYLOAD_LEN {
        return Err(WireError::Length {
            expected: PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let mut name = [0u8; NAME_LEN];
    name.copy_from_slice(&payload[..NAME_LEN]);

    let word = |i: usize| {
        let at = NAME_LEN + i * 4;
        i32::from_le_bytes([
            payload[at],
            payload[at + 1],
            payload[at + 2],
            payload[at + 3],
        ])
    };
    let wide = |i: usize| {
        let at = 64 + i * 8;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&payload[at..at + 8]);
        i64::from_le_bytes(buf)
    };

    let supply_type = SupplyType::from_code(word(0)).ok_or(WireError::BadCode {
        field: "type",
        code: word(0),
    })?;
    let technology = Technology::from_code(word(1)).ok_or(WireError::BadCode {
        field: "technology",
        code: word(1),
    })?;
    let status = ChargeStatus::from_code(word(2)).ok_or(WireError::BadCode {
        field: "status",
        code: word(2),
    })?;
    let capacity_level = CapacityLevel::from_code(word(4)).ok_or(WireError::BadCode {
        field: "capacity_level",
        code: word(4),
    })?;

    Ok(BatteryRecord {
        name: DeviceName::from_bytes(name),
        supply_type,
        technology,
        status,
        capacity: word(3),
        capacity_level,
        present: word(5) != 0,
        online: word(6) != 0,
        voltage_max_design: wide(0),
        voltage_min_design: wide(1),
        voltage_now: wide(2),
        current_now: wide(3),
        energy_full: wide(4),
        energy_now: wide(5),
        energy_full_design: wide(6),
        power_now: wide(7),
    })
}
