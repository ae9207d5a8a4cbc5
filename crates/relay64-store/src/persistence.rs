//! Persisted destination address
//!
//! The last accepted address is mirrored to a single line text file so a
//! restart picks up where the previous process left off.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::StoreError;

/// Backend the [`AddressStore`](crate::AddressStore) mirrors the address to
///
/// `save` is only ever called while the store holds its write lock, so
/// implementations do not need their own write serialization.
#[async_trait]
pub trait AddressPersistence: Send + Sync {
    /// Read the persisted address, `None` if nothing has been stored yet
    async fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the persisted address
    async fn save(&self, address: &str) -> Result<(), StoreError>;
}

/// Stores the address as the only content of a text file
pub struct FileAddressPersistence {
    path: PathBuf,
}

impl FileAddressPersistence {
    /// File name used inside the data directory
    pub const FILE_NAME: &'static str = "ipv6_address.txt";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist to `<data_dir>/ipv6_address.txt`
    pub fn in_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl AddressPersistence for FileAddressPersistence {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No persisted address at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        Ok(contents.split_whitespace().next().map(str::to_string))
    }

    async fn save(&self, address: &str) -> Result<(), StoreError> {
        tokio::fs::write(&self.path, address)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!("Persisted address {} to {}", address, self.path.display());
        Ok(())
    }
}

/// Keeps the address in memory only
#[derive(Default)]
pub struct MemoryAddressPersistence {
    address: Mutex<Option<String>>,
}

impl MemoryAddressPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Mutex::new(Some(address.into())),
        }
    }
}

#[async_trait]
impl AddressPersistence for MemoryAddressPersistence {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .address
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    async fn save(&self, address: &str) -> Result<(), StoreError> {
        *self
            .address
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(address.to_string());
        Ok(())
    }
}
