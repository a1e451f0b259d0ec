//! Optional TOML settings for the cache limits and the CLI session store.
//!
//! Read from `~/.config/feedstate/config.toml` unless `--config` points
//! elsewhere. No file, or a blank one, means defaults. Keys the crate does not
//! know are ignored with a warning so typos show up in the log.
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::{CacheLimits, DEFAULT_STORAGE_KEY, MAX_ENTRIES_PER_FEED, MAX_FEEDS};
use crate::storage::is_valid_slot_name;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large (limit {limit} bytes)")]
    TooLarge { limit: u64 },

    /// A value parsed but cannot be used.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Feed state cache configuration. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of distinct feed views kept in the store.
    pub max_feeds: usize,

    /// Maximum number of entries kept per feed view.
    pub max_entries_per_feed: usize,

    /// Name of the storage slot holding the serialized store.
    pub storage_key: String,

    /// Session directory for the file-backed store. Overridden by `--store`.
    pub store_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_feeds: MAX_FEEDS,
            max_entries_per_feed: MAX_ENTRIES_PER_FEED,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            store_dir: None,
        }
    }
}

const SIZE_LIMIT: u64 = 1024 * 1024;

const RECOGNIZED: &[&str] = &["max_feeds", "max_entries_per_feed", "storage_key", "store_dir"];

impl Config {
    /// Read and validate the config at `path`.
    ///
    /// A missing or blank file gives the defaults. Files over 1 MB, bad TOML
    /// and unusable values are errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(source) = read_bounded(path)? else {
            tracing::debug!(path = %path.display(), "Config not present, using defaults");
            return Ok(Self::default());
        };
        if source.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config is blank, using defaults");
            return Ok(Self::default());
        }

        let config = Self::parse(&source)?;
        tracing::info!(
            path = %path.display(),
            max_feeds = config.max_feeds,
            max_entries_per_feed = config.max_entries_per_feed,
            storage_key = %config.storage_key,
            "Config loaded"
        );
        Ok(config)
    }

    /// Parse and validate TOML source.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        if let Ok(table) = source.parse::<toml::Table>() {
            table
                .keys()
                .filter(|key| !RECOGNIZED.contains(&key.as_str()))
                .for_each(|key| tracing::warn!(key = %key, "Ignoring unrecognized config key"));
        }

        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the cache cannot work with.
    ///
    /// Both limits must be at least 1. `storage_key` must be a valid slot name
    /// (see [`is_valid_slot_name`]) so the file-backed store can use it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_feeds == 0 {
            return Err(ConfigError::Invalid("max_feeds must be at least 1".to_string()));
        }
        if self.max_entries_per_feed == 0 {
            return Err(ConfigError::Invalid(
                "max_entries_per_feed must be at least 1".to_string(),
            ));
        }
        if !is_valid_slot_name(&self.storage_key) {
            return Err(ConfigError::Invalid(format!(
                "storage_key {:?} must be ASCII letters, digits, '_', '-' or '.' and not start with '.'",
                self.storage_key
            )));
        }
        Ok(())
    }

    /// Cache bounds from this config.
    pub fn limits(&self) -> CacheLimits {
        CacheLimits {
            max_feeds: self.max_feeds,
            max_entries_per_feed: self.max_entries_per_feed,
        }
    }
}

/// Read at most `SIZE_LIMIT` bytes. `None` when the file does not exist.
fn read_bounded(path: &Path) -> Result<Option<String>, ConfigError> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::Io(e)),
    };

    let mut bytes = Vec::new();
    file.take(SIZE_LIMIT + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > SIZE_LIMIT {
        return Err(ConfigError::TooLarge { limit: SIZE_LIMIT });
    }
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| ConfigError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

// ============================================================================
// Tests
// ============================================================================
