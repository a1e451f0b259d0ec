use std::rc::Rc;

use thiserror::Error;

use super::tracking::{TrackingGate, TrackingGuard};
use super::types::{FeedStateData, FeedStore, StoredFeedState};
use crate::codec::{CodecError, JsonCodec, StoreCodec};
use crate::key::FeedKey;
use crate::platform::Platform;
use crate::storage::StorageError;

/// Storage slot holding the serialized store.
pub const DEFAULT_STORAGE_KEY: &str = "feed_state_cache";

/// Maximum number of distinct feed views kept.
pub const MAX_FEEDS: usize = 10;

/// Maximum number of entries kept per feed view.
pub const MAX_ENTRIES_PER_FEED: usize = 300;

// ============================================================================
// Error / Outcome Types
// ============================================================================

#[derive(Debug, Error)]
enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result of a save. Failures are already logged; callers may ignore this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Tracking gate closed, nothing written
    Skipped,
    /// Written; lists keys evicted to make room
    Saved { evicted: Vec<FeedKey> },
    /// Storage or encoding failed, nothing written
    Failed,
}

/// Bounds applied on every save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    pub max_feeds: usize,
    pub max_entries_per_feed: usize,
}

impl CacheLimits {
    /// Raise zero bounds to 1. A save always leaves its own key in the store,
    /// so a bound below 1 cannot hold.
    pub fn at_least_one(self) -> Self {
        Self {
            max_feeds: self.max_feeds.max(1),
            max_entries_per_feed: self.max_entries_per_feed.max(1),
        }
    }
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_feeds: MAX_FEEDS,
            max_entries_per_feed: MAX_ENTRIES_PER_FEED,
        }
    }
}

// ============================================================================
// FeedStateCache
// ============================================================================

/// Bounded, session-scoped cache of feed view state.
///
/// The whole store lives in one storage slot and is read, modified and
/// rewritten on each operation. Every failure degrades: unreadable storage
/// reads as empty, failed writes are dropped with a warning.
pub struct FeedStateCache {
    platform: Rc<dyn Platform>,
    codec: Box<dyn StoreCodec>,
    gate: TrackingGate,
    limits: CacheLimits,
    storage_key: String,
}

impl FeedStateCache {
    /// Create a cache over the platform's session storage.
    ///
    /// Zero limits are raised to 1 with a warning.
    pub fn new(platform: Rc<dyn Platform>, limits: CacheLimits) -> Self {
        let clamped = limits.at_least_one();
        if clamped != limits {
            tracing::warn!(?limits, "Zero cache limit raised to 1");
        }
        Self {
            platform,
            codec: Box::new(JsonCodec),
            gate: TrackingGate::new(),
            limits: clamped,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Replace the store serializer.
    pub fn with_codec(mut self, codec: Box<dyn StoreCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Use a different storage slot.
    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    /// Bounds in effect, after zero limits were raised.
    pub fn limits(&self) -> CacheLimits {
        self.limits
    }

    /// Slot the serialized store is written to.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    // ========================================================================
    // Tracking Gate
    // ========================================================================

    /// The shared tracking counter.
    pub fn gate(&self) -> &TrackingGate {
        &self.gate
    }

    /// A list view mounted. See [`TrackingGate::start`].
    pub fn start_tracking_feed(&self) {
        self.gate.start();
    }

    /// A list view unmounted. See [`TrackingGate::stop`].
    pub fn stop_tracking_feed(&self) {
        self.gate.stop();
    }

    /// Keep writes enabled for the lifetime of the returned guard.
    pub fn track(&self) -> TrackingGuard {
        self.gate.track()
    }

    // ========================================================================
    // Save / Restore
    // ========================================================================

    /// Persist a feed view's state.
    ///
    /// Ignored while no view is tracking. When the key is new and the store
    /// is full, the oldest state is evicted first. Entries beyond the
    /// per-feed cap are dropped from the tail.
    pub fn save_feed_state(&self, data: FeedStateData) -> SaveOutcome {
        if !self.gate.is_open() {
            tracing::debug!(key = %data.feed_key, "Feed tracking inactive, skipping save");
            return SaveOutcome::Skipped;
        }

        let mut store = self.load_store();
        let key = data.feed_key.clone();
        let state = StoredFeedState::capture(
            data,
            self.limits.max_entries_per_feed,
            self.platform.now_millis(),
        );
        let entries = state.entries.len();
        let evicted = store.insert_bounded(state, self.limits.max_feeds);
        for old in &evicted {
            tracing::debug!(key = %old, "Evicted oldest feed state");
        }

        match self.write_store(&store) {
            Ok(()) => {
                tracing::debug!(key = %key, entries, "Saved feed state");
                SaveOutcome::Saved { evicted }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to save feed state");
                SaveOutcome::Failed
            }
        }
    }

    /// Look up a saved state without consuming it.
    pub fn get_feed_state(&self, key: &FeedKey) -> Option<StoredFeedState> {
        self.load_store().get(key).cloned()
    }

    /// Remove a saved state. Missing keys are a no-op.
    pub fn clear_feed_state(&self, key: &FeedKey) {
        let mut store = self.load_store();
        if store.remove(key).is_none() {
            return;
        }
        match self.write_store(&store) {
            Ok(()) => tracing::debug!(key = %key, "Cleared feed state"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to clear feed state"),
        }
    }

    /// Read a saved state and clear it, so it is restored at most once.
    pub fn take_feed_state(&self, key: &FeedKey) -> Option<StoredFeedState> {
        let state = self.get_feed_state(key)?;
        self.clear_feed_state(key);
        Some(state)
    }

    /// Drop every saved state.
    pub fn clear_all(&self) {
        if let Err(e) = self.platform.storage().remove_item(&self.storage_key) {
            tracing::warn!(error = %e, "Failed to clear feed state store");
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// The current store; empty when storage is missing, unavailable or corrupt.
    pub fn load_store(&self) -> FeedStore {
        match self.read_store() {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(
                    storage_key = %self.storage_key,
                    error = %e,
                    "Feed state store unreadable, treating as empty"
                );
                FeedStore::new()
            }
        }
    }

    pub fn feed_keys(&self) -> Vec<FeedKey> {
        self.load_store().keys().cloned().collect()
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn read_store(&self) -> Result<FeedStore, CacheError> {
        match self.platform.storage().get_item(&self.storage_key)? {
            Some(raw) => Ok(self.codec.decode(&raw)?),
            None => Ok(FeedStore::new()),
        }
    }

    fn write_store(&self, store: &FeedStore) -> Result<(), CacheError> {
        let storage = self.platform.storage();
        if store.is_empty() {
            storage.remove_item(&self.storage_key)?;
            return Ok(());
        }
        let raw = self.codec.encode(store)?;
        storage.set_item(&self.storage_key, &raw)?;
        Ok(())
    }
}

impl std::fmt::Debug for FeedStateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedStateCache")
            .field("storage_key", &self.storage_key)
            .field("limits", &self.limits)
            .field("tracking", &self.gate.count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
