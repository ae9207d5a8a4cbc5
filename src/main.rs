//! relay64 - IPv4 to IPv6 TCP relay
//!
//! Listens for IPv4 connections on the configured source ports and relays
//! each one to the matching destination port on the current IPv6 address.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use relay64_api::{ApiServer, ApiServerConfig};
use relay64_server_tcp::{TunnelHealthChecker, TunnelListener, TunnelListenerConfig};
use relay64_store::{AddressStore, FileAddressPersistence};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{Args, RelayConfig};

/// Setup logging with the specified log level
fn setup_logging(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("Invalid log level: {}", log_level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level)?;

    let config = RelayConfig::from_args(&args).context("Failed to build configuration")?;

    let persistence = Arc::new(FileAddressPersistence::new(&config.address_file));
    let store = Arc::new(
        AddressStore::open(
            config.default_address.clone(),
            config.mappings.clone(),
            persistence,
        )
        .await,
    );
    info!("Destination address: {}", store.address().await);

    // Bind every port before serving anything so a taken port aborts startup
    let mut listeners = Vec::with_capacity(config.mappings.len());
    for mapping in &config.mappings {
        let listener_config = TunnelListenerConfig::new(config.tunnel_listen_addr, *mapping);
        let listener = TunnelListener::bind(listener_config, store.clone())
            .await
            .with_context(|| {
                format!(
                    "Error listening on IPv4 address {} port {}",
                    config.tunnel_listen_addr, mapping.source_port
                )
            })?;
        listeners.push(listener);
    }

    let api_server = ApiServer::new(
        ApiServerConfig {
            bind_addr: config.webhook_bind_addr,
            webhook_token: config.webhook_token.clone(),
            health_timeout: TunnelHealthChecker::DEFAULT_TIMEOUT,
        },
        store.clone(),
    );

    let mut tasks = JoinSet::new();
    tasks.spawn(async move { api_server.start().await.context("Webhook server failed") });
    for listener in listeners {
        tasks.spawn(async move {
            let mapping = listener.mapping();
            listener
                .run()
                .await
                .with_context(|| format!("Tunnel {} failed", mapping))
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => info!("Task stopped"),
                Ok(Err(e)) => {
                    error!("{:#}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Task panicked: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    tasks.shutdown().await;
    info!("relay64 stopped");
    Ok(())
}
