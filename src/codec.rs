//! Store serialization.
//!
//! The cache encodes its whole [`FeedStore`] into one storage slot. The format is
//! chosen by a [`StoreCodec`] so it can change without touching eviction logic.
use thiserror::Error;

use crate::cache::FeedStore;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode feed store: {0}")]
    Encode(String),

    #[error("Failed to decode feed store: {0}")]
    Decode(String),
}

/// Converts a [`FeedStore`] to and from the bytes kept in session storage.
pub trait StoreCodec {
    fn encode(&self, store: &FeedStore) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, raw: &[u8]) -> Result<FeedStore, CodecError>;
}

/// JSON blob: `{ "<feed key>": { "feedKey": ..., "entries": [...], ... } }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl StoreCodec for JsonCodec {
    fn encode(&self, store: &FeedStore) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(store).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, raw: &[u8]) -> Result<FeedStore, CodecError> {
        serde_json::from_slice(raw).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
