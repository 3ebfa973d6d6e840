//! Host adapters for the virtual battery broker
//!
//! Exposes the control channel and the query interface as Unix stream
//! sockets:
//!
//! - Control socket (default `/run/vbatt/pipower5.ctl`, mode 0600): binary
//!   frames, see [`vbatt_core::wire`]
//! - Query socket (default `/run/vbatt/pipower5.query`, mode 0666): one
//!   property name per line, answered with `OK <value>` or
//!   `ERR <code> <message>`

mod control_socket;
mod query_socket;

pub use control_socket::UnixControlBinder;
pub use query_socket::{SocketReportingSubsystem, answer};

use std::path::{Path, PathBuf};
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use vbatt_config::{SocketConfig, VbattConfig};
use vbatt_core::{BrokerError, Lifecycle, Resource, SupplyDescriptor};

/// Build the lifecycle from configuration and bring it up
///
/// Must be called from within a tokio runtime.
pub fn start(config: &VbattConfig) -> Result<Lifecycle, BrokerError> {
    let name = config
        .device_name()
        .map_err(|e| BrokerError::InvalidInput(e.to_string()))?;
    let descriptor = SupplyDescriptor::new(name, config.broker.device.supply_type);

    let mut binder = UnixControlBinder::new(config.broker.control.clone());
    let mut subsystem = SocketReportingSubsystem::new(config.broker.query.clone());

    let mut lifecycle = Lifecycle::new(descriptor);
    lifecycle.start(&mut binder, &mut subsystem)?;
    Ok(lifecycle)
}

/// Bind a listener, replacing a stale socket, and apply its mode
///
/// Anything other than a socket already at the path is left alone and
/// reported as `AlreadyExists`.
fn bind_socket(config: &SocketConfig) -> std::io::Result<UnixListener> {
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};

    let path = config.socket_path.as_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            tracing::warn!("Removing stale socket at {}", path.display());
            std::fs::remove_file(path)?;
        }
        Ok(_) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a socket", path.display()),
            ));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let listener = UnixListener::bind(path)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(config.mode))?;

    Ok(listener)
}

/// A bound socket and the task accepting on it
struct SocketEndpoint {
    label: &'static str,
    path: PathBuf,
    accept_task: JoinHandle<()>,
}

impl Resource for SocketEndpoint {
    fn describe(&self) -> String {
        format!("{} socket {}", self.label, self.path.display())
    }

    fn release(self: Box<Self>) -> Result<(), BrokerError> {
        // Connections already accepted keep running until their peer hangs up
        self.accept_task.abort();
        remove_socket_file(&self.path)
    }
}

fn remove_socket_file(path: &Path) -> Result<(), BrokerError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BrokerError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bind_socket_replaces_stale_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("stale.ctl");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        // A listener dropped without cleanup leaves its socket file behind
        drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let config = SocketConfig {
            socket_path: path.clone(),
            mode: 0o600,
        };
        let _listener = bind_socket(&config).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.file_type().is_socket());
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_bind_socket_keeps_regular_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vbatt.toml");
        std::fs::write(&path, b"[broker]\n").unwrap();

        let config = SocketConfig {
            socket_path: path.clone(),
            mode: 0o600,
        };
        let err = bind_socket(&config).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);

        let meta = std::fs::symlink_metadata(&path).unwrap();
        assert!(meta.file_type().is_file());
        assert_eq!(std::fs::read(&path).unwrap(), b"[broker]\n");
    }

    #[test]
    fn test_remove_missing_socket_is_ok() {
        let dir = TempDir::new().unwrap();
        assert!(remove_socket_file(&dir.path().join("gone")).is_ok());
    }
}
