//! TCP side of the relay
//!
//! One [`TunnelListener`] per configured mapping accepts IPv4 connections and
//! relays each of them to the destination address currently held by the
//! [`AddressStore`](relay64_store::AddressStore). The [`TunnelHealthChecker`]
//! checks the destination ports without carrying any traffic.

mod dial;
mod health;
mod relay;
mod server;

pub use dial::dial;
pub use health::{HealthReport, TunnelHealthChecker, TunnelStatus};
pub use relay::{relay, Direction, RelayOutcome};
pub use server::{ConnectionIdGenerator, TunnelError, TunnelListener, TunnelListenerConfig};
