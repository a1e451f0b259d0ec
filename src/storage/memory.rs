use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::{SessionStorage, StorageError};

/// In-memory session storage.
///
/// Lives as long as the value does, which matches session semantics for a
/// single process. A quota and a disabled switch let callers reproduce the
/// failure modes of real browser storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: RefCell<HashMap<String, Vec<u8>>>,
    quota: Option<usize>,
    disabled: Cell<bool>,
}

impl MemoryStorage {
    /// Empty, enabled storage with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty storage that rejects writes past `quota` bytes.
    ///
    /// # Arguments
    ///
    /// * `quota` - Maximum total size of all slot names plus stored values, in
    ///   bytes. The value a write replaces does not count against it.
    ///
    /// # Examples
    ///
    /// ```
    /// use feedstate::storage::{MemoryStorage, SessionStorage, StorageError};
    ///
    /// let storage = MemoryStorage::with_quota(16);
    /// assert!(storage.set_item("slot", b"1234").is_ok());
    /// assert!(storage.set_item("slot", b"abcdefgh").is_ok());
    /// assert!(matches!(
    ///     storage.set_item("other", b"x"),
    ///     Err(StorageError::QuotaExceeded { .. })
    /// ));
    /// ```
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Simulate storage being switched off (private mode, blocked cookies).
    ///
    /// While disabled every call fails with [`StorageError::Unavailable`].
    /// Stored values survive and are visible again once re-enabled.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if self.disabled.get() {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.check_enabled()?;
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.check_enabled()?;
        let mut slots = self.slots.borrow_mut();

        if let Some(quota) = self.quota {
            // The slot being replaced does not count against the new value
            let others: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        slots.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}
