use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::FeedKey;

// ============================================================================
// Feed Entries
// ============================================================================

/// One item of a feed (paper, post, bounty, ...).
///
/// The cache never looks inside entries; they are stored and handed back as
/// produced by the data-fetching layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedEntry(serde_json::Value);

impl FeedEntry {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The entry's `id` field, when it has one.
    ///
    /// Numeric ids are rendered as strings so they compare with
    /// `last_clicked_entry_id`.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for FeedEntry {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

// ============================================================================
// Save Payload
// ============================================================================

/// What a list view hands to the cache when it saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStateData {
    pub feed_key: FeedKey,
    /// Most relevant first; truncation keeps the head.
    pub entries: Vec<FeedEntry>,
    pub scroll_position: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_clicked_entry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl FeedStateData {
    pub fn new(feed_key: FeedKey, entries: Vec<FeedEntry>, scroll_position: f64) -> Self {
        Self {
            feed_key,
            entries,
            scroll_position,
            last_clicked_entry_id: None,
            page: None,
            has_more: None,
        }
    }
}

// ============================================================================
// Stored State
// ============================================================================

/// A saved feed view, as persisted in the store blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFeedState {
    pub feed_key: FeedKey,
    pub entries: Vec<FeedEntry>,
    pub scroll_position: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_clicked_entry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl StoredFeedState {
    /// Build the stored form of `data`, keeping at most `max_entries` entries.
    ///
    /// A NaN or infinite scroll position is stored as 0.0. JSON has no
    /// representation for it and would write `null`, which no longer decodes.
    pub fn capture(data: FeedStateData, max_entries: usize, timestamp: i64) -> Self {
        let FeedStateData {
            feed_key,
            mut entries,
            scroll_position,
            last_clicked_entry_id,
            page,
            has_more,
        } = data;
        entries.truncate(max_entries);

        let scroll_position = if scroll_position.is_finite() {
            scroll_position
        } else {
            tracing::warn!(
                key = %feed_key,
                scroll = scroll_position,
                "Non-finite scroll position, storing 0"
            );
            0.0
        };

        Self {
            feed_key,
            entries,
            scroll_position,
            last_clicked_entry_id,
            page,
            has_more,
            timestamp,
        }
    }

    /// Index of the last clicked entry within `entries`, if it is still there.
    pub fn last_clicked_index(&self) -> Option<usize> {
        let wanted = self.last_clicked_entry_id.as_deref()?;
        self.entries
            .iter()
            .position(|e| e.id().as_deref() == Some(wanted))
    }

    /// Capture time as a UTC datetime, for display.
    pub fn captured_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
    }
}

// ============================================================================
// Store
// ============================================================================

/// The whole cache: every saved view, keyed by feed key.
///
/// Serialized as a single object mapping keys to states.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedStore {
    feeds: BTreeMap<FeedKey, StoredFeedState>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn get(&self, key: &FeedKey) -> Option<&StoredFeedState> {
        self.feeds.get(key)
    }

    pub fn contains(&self, key: &FeedKey) -> bool {
        self.feeds.contains_key(key)
    }

    pub fn remove(&mut self, key: &FeedKey) -> Option<StoredFeedState> {
        self.feeds.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FeedKey> {
        self.feeds.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeedKey, &StoredFeedState)> {
        self.feeds.iter()
    }

    /// Key of the oldest saved state. Ties go to the smallest key so eviction
    /// is deterministic.
    pub fn oldest_key(&self) -> Option<&FeedKey> {
        self.feeds
            .iter()
            .min_by_key(|(_, state)| state.timestamp)
            .map(|(key, _)| key)
    }

    /// Insert `state` under its own key, evicting oldest states first when a
    /// new key would push the store past `max_feeds`.
    ///
    /// Replacing an existing key never evicts. Returns the evicted keys.
    pub fn insert_bounded(&mut self, state: StoredFeedState, max_feeds: usize) -> Vec<FeedKey> {
        let mut evicted = Vec::new();

        if !self.feeds.contains_key(&state.feed_key) {
            while !self.feeds.is_empty() && self.feeds.len() >= max_feeds {
                let Some(oldest) = self.oldest_key().cloned() else {
                    break;
                };
                self.feeds.remove(&oldest);
                evicted.push(oldest);
            }
        }

        self.feeds.insert(state.feed_key.clone(), state);
        evicted
    }
}

// ============================================================================
// Tests
// ============================================================================
