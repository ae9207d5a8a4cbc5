//! Tunnel listener
//!
//! Listens on one source port and relays every accepted connection to the
//! destination port of its mapping on the store's current address.

use relay64_store::{AddressStore, Mapping};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::{dial, relay};

/// Tunnel listener errors
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to bind to {address}: {reason}\n\nTroubleshooting:\n  • Check if another process is using this port: lsof -i :{port}\n  • Try using a different address or port")]
    BindError {
        address: String,
        port: u16,
        reason: String,
    },

    #[error("Failed to dial [{address}]:{port}: {source}")]
    DialError {
        address: String,
        port: u16,
        source: std::io::Error,
    },
}

/// Tunnel listener configuration
#[derive(Debug, Clone)]
pub struct TunnelListenerConfig {
    /// Address inbound connections are accepted on
    pub listen_addr: IpAddr,
    pub mapping: Mapping,
}

impl TunnelListenerConfig {
    pub fn new(listen_addr: IpAddr, mapping: Mapping) -> Self {
        Self {
            listen_addr,
            mapping,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.mapping.source_port)
    }
}

/// Connection id generator for log correlation
#[derive(Clone)]
pub struct ConnectionIdGenerator {
    next_id: Arc<AtomicU64>,
}

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn generate(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ConnectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept loop for one source port
pub struct TunnelListener {
    listener: TcpListener,
    mapping: Mapping,
    store: Arc<AddressStore>,
    connection_ids: ConnectionIdGenerator,
}

impl TunnelListener {
    /// Bind the source port
    pub async fn bind(
        config: TunnelListenerConfig,
        store: Arc<AddressStore>,
    ) -> Result<Self, TunnelError> {
        let bind_addr = config.bind_addr();
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| TunnelError::BindError {
                address: bind_addr.ip().to_string(),
                port: bind_addr.port(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            listener,
            mapping: config.mapping,
            store,
            connection_ids: ConnectionIdGenerator::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TunnelError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn mapping(&self) -> Mapping {
        self.mapping
    }

    /// Accept connections forever
    ///
    /// Accept failures are logged and never end the loop. Every connection is
    /// dialed and relayed on its own task.
    pub async fn run(self) -> Result<(), TunnelError> {
        let local_addr = self.local_addr()?;
        info!(
            "Listening on {} for IPv4 connections (destination port {})",
            local_addr, self.mapping.destination_port
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let connection_id = self.connection_ids.generate();
                    debug!(
                        "Accepted connection {} from {} on port {}",
                        connection_id,
                        peer_addr,
                        local_addr.port()
                    );

                    let store = self.store.clone();
                    let destination_port = self.mapping.destination_port;
                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_connection(stream, connection_id, destination_port, store)
                                .await
                        {
                            error!("Connection {} from {}: {}", connection_id, peer_addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection on {}: {}", local_addr, e);
                }
            }
        }
    }

    /// Dial the current destination and relay until either side closes
    ///
    /// The address is read once; an update arriving mid-relay only affects
    /// connections accepted afterwards. A failed dial drops `inbound`.
    async fn handle_connection(
        inbound: TcpStream,
        connection_id: u64,
        destination_port: u16,
        store: Arc<AddressStore>,
    ) -> Result<(), TunnelError> {
        let address = store.address().await;

        let outbound =
            dial(&address, destination_port)
                .await
                .map_err(|source| TunnelError::DialError {
                    address: address.clone(),
                    port: destination_port,
                    source,
                })?;

        debug!(
            "Connection {} relaying to [{}]:{}",
            connection_id, address, destination_port
        );

        let outcome = relay(inbound, outbound).await;
        debug!(
            "Connection {} closed after {} finished",
            connection_id, outcome.finished
        );

        Ok(())
    }
}
