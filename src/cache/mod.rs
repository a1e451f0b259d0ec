//! Feed state cache.
//!
//! - [`types`]: entries, save payloads, stored states and the bounded store
//! - [`tracking`]: the reference-counted gate that enables writes
//! - [`store`]: [`FeedStateCache`], save/get/clear over a storage slot

mod store;
mod tracking;
mod types;

pub use store::{
    CacheLimits, FeedStateCache, SaveOutcome, DEFAULT_STORAGE_KEY, MAX_ENTRIES_PER_FEED,
    MAX_FEEDS,
};
pub use tracking::{TrackingGate, TrackingGuard};
pub use types::{FeedEntry, FeedStateData, FeedStore, StoredFeedState};
