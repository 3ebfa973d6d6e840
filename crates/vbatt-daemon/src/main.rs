//! vbattd - virtual battery broker daemon
//!
//! Startup sequence:
//! 1. Load configuration (path from the first argument, else `/etc/vbatt/vbatt.toml`)
//! 2. Check privileges
//! 3. Bind the control socket, then publish the query socket
//! 4. Serve until SIGINT or SIGTERM, then tear down in reverse order

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use vbatt_config::VbattConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => VbattConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => VbattConfig::load_default().context("Failed to load default configuration")?,
    };

    setup_logging(&config.broker.log_level);

    info!("vbattd starting...");
    if let Some(path) = &config_path {
        info!("Using configuration {}", path.display());
    }

    check_privileges(&config)?;

    let mut lifecycle = match vbatt_daemon::start(&config) {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            error!("Startup failed: {}", e);
            return Err(e).context("Failed to start virtual battery broker");
        }
    };

    info!(
        "Broker for {} active in {:?}",
        lifecycle.descriptor().name,
        start.elapsed()
    );

    wait_for_shutdown().await?;

    info!("Shutting down...");
    lifecycle.shutdown();
    info!("vbattd stopped");

    Ok(())
}

/// Setup logging to console
///
/// `RUST_LOG` wins over the configured level.
fn setup_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false))
        .init();
}

fn check_privileges(config: &VbattConfig) -> Result<()> {
    let uid = nix::unistd::Uid::effective();
    if uid.is_root() {
        return Ok(());
    }

    if config.broker.require_root {
        anyhow::bail!("vbattd must run as root (effective uid {})", uid);
    }

    warn!(
        "Running as uid {}, socket paths must be writable by this user",
        uid
    );
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for SIGINT")?;
            info!("Received SIGINT");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
    }

    Ok(())
}
