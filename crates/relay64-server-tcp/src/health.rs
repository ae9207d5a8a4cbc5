//! Destination reachability checks

use futures::future::join_all;
use relay64_store::{AddressStore, Mapping};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::dial;

/// Reachability of one mapping's destination port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelStatus {
    pub ipv4_port: u16,
    pub ipv6_port: u16,
    pub ipv6_alive: bool,
}

/// Per-mapping statuses, in configuration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub address: String,
    pub statuses: Vec<TunnelStatus>,
}

impl HealthReport {
    /// True only if every mapping's destination answered
    pub fn is_healthy(&self) -> bool {
        self.statuses.iter().all(|status| status.ipv6_alive)
    }
}

/// Connect-only checks against the current destination
pub struct TunnelHealthChecker {
    store: Arc<AddressStore>,
    timeout: Duration,
}

impl TunnelHealthChecker {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(store: Arc<AddressStore>) -> Self {
        Self {
            store,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check every mapping concurrently against one snapshot of the address
    pub async fn check(&self) -> HealthReport {
        let snapshot = self.store.read().await;

        let statuses = join_all(
            snapshot
                .mappings
                .iter()
                .map(|mapping| self.check_mapping(&snapshot.address, *mapping)),
        )
        .await;

        HealthReport {
            address: snapshot.address,
            statuses,
        }
    }

    /// Establish and immediately close one connection
    async fn check_mapping(&self, address: &str, mapping: Mapping) -> TunnelStatus {
        let port = mapping.destination_port;
        let ipv6_alive = match tokio::time::timeout(self.timeout, dial(address, port)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                warn!("Healthcheck failed for [{}]:{}: {}", address, port, e);
                false
            }
            Err(_) => {
                warn!(
                    "Healthcheck failed for [{}]:{}: no answer within {:?}",
                    address, port, self.timeout
                );
                false
            }
        };

        TunnelStatus {
            ipv4_port: mapping.source_port,
            ipv6_port: port,
            ipv6_alive,
        }
    }
}
