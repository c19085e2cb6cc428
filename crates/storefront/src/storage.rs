//! Client-side persistence of cart identifiers.
//!
//! Two string slots exist: the long-lived cart id and the pending-payment cart
//! id stashed across a hosted payment page round-trip. Both are opaque
//! identifiers with no further structure.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

/// Persisted identifier slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageSlot {
    /// The customer's active cart.
    Cart,
    /// Cart awaiting out-of-band payment confirmation.
    PendingPayment,
}

impl StorageSlot {
    /// Key under which the slot is stored.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Cart => session_keys::CART_ID,
            Self::PendingPayment => session_keys::PENDING_PAYMENT_CART_ID,
        }
    }
}

/// Storage keys.
pub mod session_keys {
    pub const CART_ID: &str = "dorsal_cart_id";
    pub const PENDING_PAYMENT_CART_ID: &str = "pending_payment_cart_id";
}

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Key/value persistence for cart identifiers.
pub trait CartStorage: Send + Sync {
    /// Read a slot. A missing value is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn load(&self, slot: StorageSlot) -> Result<Option<String>, StorageError>;

    /// Write a slot, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be written.
    fn store(&self, slot: StorageSlot, value: &str) -> Result<(), StorageError>;

    /// Remove a slot. Clearing an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be written.
    fn clear(&self, slot: StorageSlot) -> Result<(), StorageError>;
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<StorageSlot, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self, slot: StorageSlot) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(&slot).cloned())
    }

    fn store(&self, slot: StorageSlot, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(slot, value.to_string());
        Ok(())
    }

    fn clear(&self, slot: StorageSlot) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.remove(&slot);
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// JSON key/value file (`storage.json`) inside a state directory.
///
/// Every operation reads and rewrites the whole file; the file holds two short
/// strings. Writes go through a temporary file and a rename. A file that does
/// not parse reads as empty and is replaced by the next write.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub const FILE_NAME: &'static str = "storage.json";

    /// Storage rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(values) => Ok(values),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Ignoring unreadable storage file");
                    Ok(HashMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_all(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl CartStorage for FileStorage {
    fn load(&self, slot: StorageSlot) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_all()?.remove(slot.key()))
    }

    fn store(&self, slot: StorageSlot, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut values = self.read_all()?;
        values.insert(slot.key().to_string(), value.to_string());
        self.write_all(&values)
    }

    fn clear(&self, slot: StorageSlot) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut values = self.read_all()?;
        if values.remove(slot.key()).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}
