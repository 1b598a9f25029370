//! babelhelper - babel topology monitor
//!
//! Subscribes to the local babel daemon, logs every topology change and
//! reconnects whenever the control connection is lost.

mod config;

use babelhelper_client::{Client, ClientError, Message, Param};
use config::Config;
use std::convert::Infallible;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if BABELHELPER_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting babelhelper monitor");
    tracing::info!("  Daemon address: {}", config.daemon.addr());
    tracing::info!("  Reconnect interval: {}s", config.reconnect.interval_secs);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = monitor(&config) => {
                let e = match result {
                    Ok(never) => match never {},
                    Err(e) => e,
                };
                tracing::warn!(os_error = ?e.raw_os_error(), "Connection to daemon lost: {}", e);
            }
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal, stopping monitor...");
                break;
            }
        }

        tracing::debug!("Reconnecting in {}s", config.reconnect.interval_secs);
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect.interval()) => {}
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal, stopping monitor...");
                break;
            }
        }
    }

    tracing::info!("Monitor stopped");
    Ok(())
}

/// Runs one monitoring session. Only returns when the connection fails.
async fn monitor(config: &Config) -> Result<Infallible, ClientError> {
    let mut client = Client::connect(config.daemon.connection_config()).await?;
    tracing::info!("Connected to {}", config.daemon.addr());

    let initial = client.monitor().await?;
    for event in &initial {
        tracing::info!(
            verb = %event.event_type,
            object_type = %event.object_type,
            object = %event.object,
            params = %format_params(event.params.iter().map(|(p, v)| (*p, v.as_str()))),
            "initial state"
        );
    }
    tracing::info!("Synced ({} entries)", initial.len());

    loop {
        match client.next_event().await {
            Ok(Message::Event(event)) => {
                tracing::info!(
                    verb = %event.event_type,
                    object_type = %event.object_type,
                    object = %event.object,
                    params = %format_params(event.params()),
                    "topology change"
                );
            }
            Ok(Message::EndOfBatch) => tracing::debug!("synced"),
            Err(e) => return Err(e),
        }
    }
}

/// Renders present parameters as `name=value` pairs.
fn format_params<'a>(params: impl Iterator<Item = (Param, &'a str)>) -> String {
    params
        .map(|(param, value)| format!("{}={}", param, value))
        .collect::<Vec<_>>()
        .join(" ")
}
