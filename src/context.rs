//! Application-root context.
//!
//! [`FeedStateContext`] owns the feed state cache and the back/forward
//! detector for one tab. The application root builds it once, hands references
//! to list views, and calls [`FeedStateContext::teardown`] when it unmounts.
use std::rc::Rc;

use crate::cache::{FeedStateCache, FeedStateData, SaveOutcome, StoredFeedState};
use crate::config::Config;
use crate::key::FeedKey;
use crate::navigation::BackForwardDetector;
use crate::platform::Platform;
use crate::restore::{restore_feed_state, FeedSession, FeedView, RestorePolicy};

pub struct FeedStateContext {
    cache: FeedStateCache,
    detector: BackForwardDetector,
}

impl FeedStateContext {
    /// Build the cache from `config` and attach the navigation detector.
    pub fn new(platform: Rc<dyn Platform>, config: &Config) -> Self {
        let cache = FeedStateCache::new(Rc::clone(&platform), config.limits())
            .with_storage_key(config.storage_key.clone());
        let detector = BackForwardDetector::attach(platform);
        Self { cache, detector }
    }

    pub fn cache(&self) -> &FeedStateCache {
        &self.cache
    }

    // ========================================================================
    // Cache Operations
    // ========================================================================

    pub fn start_tracking_feed(&self) {
        self.cache.start_tracking_feed();
    }

    pub fn stop_tracking_feed(&self) {
        self.cache.stop_tracking_feed();
    }

    pub fn save_feed_state(&self, data: FeedStateData) -> SaveOutcome {
        self.cache.save_feed_state(data)
    }

    pub fn get_feed_state(&self, key: &FeedKey) -> Option<StoredFeedState> {
        self.cache.get_feed_state(key)
    }

    pub fn clear_feed_state(&self, key: &FeedKey) {
        self.cache.clear_feed_state(key);
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn is_back_navigation(&self) -> bool {
        self.detector.is_back_forward()
    }

    pub fn reset_back_navigation(&self) {
        self.detector.reset();
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Restore `view` using the current back/forward flag. The flag is left
    /// as is; reset it once every view on the page has had its chance.
    pub fn restore_view<P>(&self, view: &FeedView, policy: &P) -> Option<StoredFeedState>
    where
        P: RestorePolicy + ?Sized,
    {
        restore_feed_state(&self.cache, view, self.is_back_navigation(), policy)
    }

    /// Open a session for a mounted view; writes stay enabled while it lives.
    pub fn open_session(&self, view: FeedView) -> FeedSession<'_> {
        FeedSession::new(&self.cache, view)
    }

    /// Remove platform listeners. Saved state is left in storage.
    pub fn teardown(&mut self) {
        self.detector.teardown();
        tracing::debug!("Feed state context torn down");
    }
}

impl std::fmt::Debug for FeedStateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedStateContext")
            .field("cache", &self.cache)
            .field("detector", &self.detector)
            .finish()
    }
}
