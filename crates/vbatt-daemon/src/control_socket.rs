//! Control channel over a Unix stream socket

use crate::{SocketEndpoint, bind_socket};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use vbatt_config::SocketConfig;
use vbatt_core::wire::{FRAME_HEADER_LEN, FrameHeader};
use vbatt_core::{Broker, BrokerError, ChannelBinder, Resource};

/// Binds the control endpoint as a Unix socket
pub struct UnixControlBinder {
    config: SocketConfig,
}

impl UnixControlBinder {
    pub fn new(config: SocketConfig) -> Self {
        Self { config }
    }
}

impl ChannelBinder for UnixControlBinder {
    fn bind(&mut self, broker: Arc<Broker>) -> Result<Box<dyn Resource>, BrokerError> {
        let listener = bind_socket(&self.config).map_err(|e| {
            BrokerError::acquisition(
                format!("control socket {}", self.config.socket_path.display()),
                e,
            )
        })?;
        tracing::info!(
            "Control socket listening on {}",
            self.config.socket_path.display()
        );

        let accept_task = tokio::spawn(accept_loop(listener, broker));
        Ok(Box::new(SocketEndpoint {
            label: "control",
            path: self.config.socket_path.clone(),
            accept_task,
        }))
    }
}

async fn accept_loop(listener: UnixListener, broker: Arc<Broker>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let broker = Arc::clone(&broker);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, broker).await {
                        tracing::warn!("Control connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept control connection: {}", e);
            }
        }
    }
}

/// Answer frames until the peer hangs up
async fn serve_connection(mut stream: UnixStream, broker: Arc<Broker>) -> std::io::Result<()> {
    loop {
        let mut header = [0u8; FRAME_HEADER_LEN];
        match stream.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }

        let header = match FrameHeader::parse(header) {
            Ok(header) => header,
            Err(e) => {
                // The payload cannot be skipped safely, so the connection ends here
                tracing::warn!("Dropping control connection: {}", e);
                let status = BrokerError::InvalidInput(e.to_string()).errno();
                stream.write_all(&status.to_le_bytes()).await?;
                return Ok(());
            }
        };

        let mut payload = vec![0u8; header.len];
        stream.read_exact(&mut payload).await?;

        let status = match broker.handle_frame(header.opcode, &payload) {
            Ok(()) => 0,
            Err(e) => {
                tracing::debug!("Control request {:#010x} rejected: {}", header.opcode, e);
                e.errno()
            }
        };
        stream.write_all(&status.to_le_bytes()).await?;
    }
}
