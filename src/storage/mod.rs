//! Session-scoped key/value storage.
//!
//! The feed state cache keeps its whole store in one slot of a [`SessionStorage`].
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`]: in-process map with optional quota, for tests and
//!   embedders that own their own persistence
//! - [`FileStorage`]: one file per slot under a session directory, used by the CLI

mod file;
mod memory;

use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// ============================================================================
// Error Types
// ============================================================================

/// Storage failures. The cache logs these and degrades; it never surfaces them
/// to the render path.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage is disabled or not present on this platform
    #[error("Session storage is unavailable")]
    Unavailable,

    /// The write would exceed the storage quota
    #[error("Session storage quota exceeded: {needed} bytes needed, {quota} bytes allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    /// Slot name cannot be used by this backend
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether `name` can be used as a slot name by every shipped backend.
///
/// Slot names are non-empty ASCII letters, digits, `_`, `-` and `.`, and do not
/// start with `.`. [`FileStorage`] uses them directly as file names.
///
/// ```
/// use feedstate::storage::is_valid_slot_name;
///
/// assert!(is_valid_slot_name("feed_state_cache"));
/// assert!(!is_valid_slot_name("feed state"));
/// assert!(!is_valid_slot_name("../escape"));
/// ```
pub fn is_valid_slot_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

// ============================================================================
// SessionStorage
// ============================================================================

/// Synchronous key/value storage scoped to one browsing session.
///
/// Mirrors the shape of the browser's `sessionStorage`: whole values are read
/// and overwritten, there are no partial updates. Calls run on the UI thread
/// and must not suspend.
pub trait SessionStorage {
    /// Read a slot. `Ok(None)` when the slot was never written.
    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Overwrite a slot.
    fn set_item(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove a slot. Removing a missing slot is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
