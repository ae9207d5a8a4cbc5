//! Reader/writer guarded destination address

use relay64_extract::is_ipv6_literal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{AddressPersistence, Mapping, StoreError};

/// Consistent view of the store at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub address: String,
    pub mappings: Arc<[Mapping]>,
}

/// Holds the current destination address and the fixed port mappings
///
/// Any number of readers may hold the address at once. A write takes the
/// lock exclusively for both the in-memory swap and the persistence call, so
/// readers never see a half-applied update and two writers never interleave
/// their file writes.
pub struct AddressStore {
    address: RwLock<String>,
    mappings: Arc<[Mapping]>,
    persistence: Arc<dyn AddressPersistence>,
}

impl AddressStore {
    pub fn new(
        address: impl Into<String>,
        mappings: Vec<Mapping>,
        persistence: Arc<dyn AddressPersistence>,
    ) -> Self {
        Self {
            address: RwLock::new(address.into()),
            mappings: mappings.into(),
            persistence,
        }
    }

    /// Build the store, seeding the address from `persistence`
    ///
    /// Falls back to `default_address` when nothing was persisted, the
    /// persisted value can't be read, or it isn't an IPv6 literal.
    pub async fn open(
        default_address: impl Into<String>,
        mappings: Vec<Mapping>,
        persistence: Arc<dyn AddressPersistence>,
    ) -> Self {
        let default_address = default_address.into();

        if !is_ipv6_literal(&default_address) {
            warn!(
                "Default destination address {:?} is not an IPv6 literal",
                default_address
            );
        }

        let address = match persistence.load().await {
            Ok(Some(address)) if is_ipv6_literal(&address) => {
                info!("Loaded persisted destination address {}", address);
                address
            }
            Ok(Some(address)) => {
                warn!(
                    "Persisted destination address {:?} is not an IPv6 literal, using default ({})",
                    address, default_address
                );
                default_address
            }
            Ok(None) => {
                warn!(
                    "No persisted destination address, using default ({})",
                    default_address
                );
                default_address
            }
            Err(e) => {
                warn!(
                    "Failed to load persisted destination address: {}. Using default ({})",
                    e, default_address
                );
                default_address
            }
        };

        Self::new(address, mappings, persistence)
    }

    /// Snapshot of the address together with the mappings
    pub async fn read(&self) -> StoreSnapshot {
        let address = self.address.read().await.clone();
        StoreSnapshot {
            address,
            mappings: self.mappings.clone(),
        }
    }

    /// Current destination address
    pub async fn address(&self) -> String {
        self.address.read().await.clone()
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Replace the destination address and persist it
    ///
    /// The in-memory value is updated even when persisting fails; the error is
    /// still returned so callers can report it.
    pub async fn write(&self, address: &str) -> Result<(), StoreError> {
        let mut current = self.address.write().await;
        *current = address.to_string();
        self.persistence.save(&current).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileAddressPersistence, MemoryAddressPersistence};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FailingPersistence;

    #[async_trait]
    impl AddressPersistence for FailingPersistence {
        async fn load(&self) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io {
                path: "unreadable".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        async fn save(&self, _address: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: "read-only".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    fn mappings() -> Vec<Mapping> {
        vec![Mapping::new(8080, 80), Mapping::new(7070, 443)]
    }

    #[tokio::test]
    async fn test_open_uses_persisted_address() {
        let persistence = Arc::new(MemoryAddressPersistence::with_address("2001:db8::99"));
        let store = AddressStore::open("2001:db8::1", mappings(), persistence).await;

        assert_eq!(store.address().await, "2001:db8::99");
    }

    #[tokio::test]
    async fn test_open_falls_back_to_default() {
        let store = AddressStore::open(
            "2001:db8::1",
            mappings(),
            Arc::new(MemoryAddressPersistence::new()),
        )
        .await;
        assert_eq!(store.address().await, "2001:db8::1");

        let store =
            AddressStore::open("2001:db8::1", mappings(), Arc::new(FailingPersistence)).await;
        assert_eq!(store.address().await, "2001:db8::1");
    }

    #[tokio::test]
    async fn test_open_ignores_corrupted_persisted_address() {
        for corrupted in ["not-an-address", "ipv6.example.com", "2001:db8::1::2"] {
            let persistence = Arc::new(MemoryAddressPersistence::with_address(corrupted));
            let store = AddressStore::open("2001:db8::1", mappings(), persistence).await;

            assert_eq!(store.address().await, "2001:db8::1", "loaded {:?}", corrupted);
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let persistence = Arc::new(MemoryAddressPersistence::new());
        let store = AddressStore::new("2001:db8::1", mappings(), persistence.clone());

        store.write("2001:db8::42").await.unwrap();

        let snapshot = store.read().await;
        assert_eq!(snapshot.address, "2001:db8::42");
        assert_eq!(&*snapshot.mappings, mappings().as_slice());
        assert_eq!(
            persistence.load().await.unwrap(),
            Some("2001:db8::42".to_string())
        );
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_memory_value() {
        let store = AddressStore::new("2001:db8::1", mappings(), Arc::new(FailingPersistence));

        assert!(store.write("2001:db8::42").await.is_err());
        assert_eq!(store.address().await, "2001:db8::42");
    }

    #[tokio::test]
    async fn test_concurrent_writes_leave_one_value_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = Arc::new(FileAddressPersistence::in_data_dir(temp_dir.path()));
        let store = Arc::new(AddressStore::new("::", mappings(), persistence.clone()));

        let first = "2001:db8:aaaa:aaaa:aaaa:aaaa:aaaa:aaaa";
        let second = "fe80::1";

        let mut handles = Vec::new();
        for _ in 0..20 {
            for address in [first, second] {
                let store = store.clone();
                handles.push(tokio::spawn(async move { store.write(address).await }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let on_disk = std::fs::read_to_string(persistence.path()).unwrap();
        assert!(on_disk == first || on_disk == second, "got {:?}", on_disk);
        assert_eq!(store.address().await, on_disk);
    }

    #[tokio::test]
    async fn test_readers_never_see_partial_values() {
        let store = Arc::new(AddressStore::new(
            "2001:db8::1",
            mappings(),
            Arc::new(MemoryAddressPersistence::new()),
        ));
        let values = ["2001:db8::1", "2001:db8::2", "2001:db8:ffff::3"];

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    store.write(values[i % values.len()]).await.unwrap();
                }
            })
        };

        for _ in 0..200 {
            let address = store.address().await;
            assert!(values.contains(&address.as_str()), "got {:?}", address);
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }
}
