//! Broker error taxonomy

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Battery not available")]
    NotAvailable,

    #[error("Unsupported property: {0}")]
    UnsupportedProperty(String),

    #[error("Unsupported operation: {0:#010x}")]
    UnsupportedOperation(u32),

    #[error("Failed to acquire {resource}: {reason}")]
    ResourceAcquisitionFailed { resource: String, reason: String },

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrokerError {
    /// Build a `ResourceAcquisitionFailed` from any displayable cause
    pub fn acquisition(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        BrokerError::ResourceAcquisitionFailed {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Negative errno reported on the control wire
    pub fn errno(&self) -> i32 {
        let code = match self {
            BrokerError::InvalidInput(_) | BrokerError::UnsupportedProperty(_) => libc::EINVAL,
            BrokerError::NotAvailable => libc::ENODEV,
            BrokerError::UnsupportedOperation(_) => libc::ENOTTY,
            BrokerError::ResourceAcquisitionFailed { .. }
            | BrokerError::InternalInconsistency(_)
            | BrokerError::Io(_) => libc::EIO,
        };
        -code
    }

    /// Symbolic code used by the query line protocol
    pub fn code_name(&self) -> &'static str {
        match self.errno().abs() {
            libc::EINVAL => "EINVAL",
            libc::ENODEV => "ENODEV",
            libc::ENOTTY => "ENOTTY",
            _ => "EIO",
        }
    }

    /// Rebuild an error from the status returned for `opcode`; `None` for success
    pub fn from_errno(status: i32, opcode: u32) -> Option<Self> {
        match -status {
            0 => None,
            libc::EINVAL => Some(BrokerError::InvalidInput("rejected by broker".into())),
            libc::ENODEV => Some(BrokerError::NotAvailable),
            libc::ENOTTY => Some(BrokerError::UnsupportedOperation(opcode)),
            other => Some(BrokerError::InternalInconsistency(format!(
                "broker returned status {}",
                -other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(BrokerError::NotAvailable.errno(), -libc::ENODEV);
        assert_eq!(
            BrokerError::InvalidInput("short".into()).errno(),
            -libc::EINVAL
        );
        assert_eq!(BrokerError::UnsupportedOperation(7).errno(), -libc::ENOTTY);
        assert_eq!(
            BrokerError::InternalInconsistency("poisoned".into()).errno(),
            -libc::EIO
        );
    }

    #[test]
    fn test_from_errno() {
        assert!(BrokerError::from_errno(0, 0).is_none());
        assert!(matches!(
            BrokerError::from_errno(-libc::ENODEV, 0),
            Some(BrokerError::NotAvailable)
        ));
        assert!(matches!(
            BrokerError::from_errno(-libc::EINVAL, 0),
            Some(BrokerError::InvalidInput(_))
        ));
        assert!(matches!(
            BrokerError::from_errno(-libc::ENOTTY, 0x1234),
            Some(BrokerError::UnsupportedOperation(0x1234))
        ));
    }

    #[test]
    fn test_error_display() {
        let err = BrokerError::acquisition("control endpoint", "address in use");
        let text = format!("{}", err);
        assert!(text.contains("control endpoint"));
        assert!(text.contains("address in use"));
        assert_eq!(err.code_name(), "EIO");
    }
}
