//! Reporting subsystem backed by a line-oriented Unix socket

use crate::{SocketEndpoint, bind_socket};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use vbatt_config::SocketConfig;
use vbatt_core::{Broker, BrokerError, Property, ReportingSubsystem, Resource, SupplyDescriptor};

/// Longest request line accepted before the connection is dropped
const MAX_LINE_LEN: usize = 256;

/// Publishes the supply on a query socket once registered
pub struct SocketReportingSubsystem {
    config: SocketConfig,
}

impl SocketReportingSubsystem {
    pub fn new(config: SocketConfig) -> Self {
        Self { config }
    }
}

impl ReportingSubsystem for SocketReportingSubsystem {
    fn register(
        &mut self,
        descriptor: &SupplyDescriptor,
        broker: Arc<Broker>,
    ) -> Result<Box<dyn Resource>, BrokerError> {
        let listener = bind_socket(&self.config).map_err(|e| {
            BrokerError::acquisition(
                format!("query socket {}", self.config.socket_path.display()),
                e,
            )
        })?;
        tracing::info!(
            "Supply {} ({} properties) published on {}",
            descriptor.name,
            descriptor.properties.len(),
            self.config.socket_path.display()
        );

        let accept_task = tokio::spawn(accept_loop(listener, descriptor.clone(), broker));
        Ok(Box::new(SocketEndpoint {
            label: "query",
            path: self.config.socket_path.clone(),
            accept_task,
        }))
    }
}

/// Reply line for one request line, newline included
///
/// An unavailable battery answers `ENODEV` before the name is looked at.
/// Properties outside the descriptor's list are refused the same way as
/// unknown names.
pub fn answer(descriptor: &SupplyDescriptor, broker: &Broker, line: &str) -> String {
    let result = match Property::from_name(line) {
        Ok(property) if descriptor.supports(property) => broker.get_property(property),
        Ok(property) => broker
            .check_available()
            .and(Err(BrokerError::UnsupportedProperty(property.name().to_string()))),
        Err(e) => broker.check_available().and(Err(e)),
    };

    match result {
        Ok(value) => format!("OK {}\n", value),
        Err(e) => format!("ERR {} {}\n", e.code_name(), e),
    }
}

async fn accept_loop(listener: UnixListener, descriptor: SupplyDescriptor, broker: Arc<Broker>) {
    let descriptor = Arc::new(descriptor);
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let descriptor = Arc::clone(&descriptor);
                let broker = Arc::clone(&broker);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, &descriptor, &broker).await {
                        tracing::warn!("Query connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept query connection: {}", e);
            }
        }
    }
}

async fn serve_connection(
    stream: UnixStream,
    descriptor: &SupplyDescriptor,
    broker: &Broker,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_line(&mut line)
            .await?;
        if read == 0 {
            return Ok(());
        }
        if line.len() > MAX_LINE_LEN {
            writer.write_all(b"ERR EINVAL request line too long\n").await?;
            return Ok(());
        }

        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        writer
            .write_all(answer(descriptor, broker, request).as_bytes())
            .await?;
    }
}
