//! Destination state shared by every tunnel listener
//!
//! The relay forwards all inbound connections to a single IPv6 host. That
//! host's address changes over time (it is pushed by a dynamic DNS notifier),
//! while the set of port mappings is fixed at startup.
//!
//! - [`AddressStore`]: the current destination address behind a reader/writer lock
//! - [`Mapping`]: one inbound port paired with one destination port
//! - [`AddressPersistence`]: where the last known address is mirrored to

mod mapping;
mod persistence;
mod store;

pub use mapping::{Mapping, MappingError};
pub use persistence::{AddressPersistence, FileAddressPersistence, MemoryAddressPersistence};
pub use store::{AddressStore, StoreSnapshot};

use thiserror::Error;

/// Errors raised while loading or persisting the destination address
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
