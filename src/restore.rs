//! Restoration decisions and per-view feed sessions.
//!
//! A list view asks two things of the cache: "should I restore, and if so what?"
//! when it mounts, and "remember this" when the user navigates away. The first
//! is [`restore_feed_state`], gated by a [`RestorePolicy`]. Both are wrapped by
//! [`FeedSession`], which a view holds for as long as it is mounted.
use std::collections::BTreeMap;

use url::Url;

use crate::cache::{
    FeedEntry, FeedStateCache, FeedStateData, SaveOutcome, StoredFeedState, TrackingGuard,
};
use crate::key::FeedKey;

// ============================================================================
// Restore Policy
// ============================================================================

/// Decides whether a view attempts restoration at all.
pub trait RestorePolicy {
    fn should_restore(&self, is_back_forward: bool) -> bool;
}

/// Restore only after back/forward navigation. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackForwardOnly;

impl RestorePolicy for BackForwardOnly {
    fn should_restore(&self, is_back_forward: bool) -> bool {
        is_back_forward
    }
}

/// Restore whenever saved state exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl RestorePolicy for Always {
    fn should_restore(&self, _is_back_forward: bool) -> bool {
        true
    }
}

/// Never restore, e.g. for content types that must always load fresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl RestorePolicy for Never {
    fn should_restore(&self, _is_back_forward: bool) -> bool {
        false
    }
}

impl<F> RestorePolicy for F
where
    F: Fn(bool) -> bool,
{
    fn should_restore(&self, is_back_forward: bool) -> bool {
        self(is_back_forward)
    }
}

// ============================================================================
// Feed View
// ============================================================================

/// The inputs a feed key is derived from: route, tab and filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedView {
    pub pathname: String,
    pub tab: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl FeedView {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            ..Self::default()
        }
    }

    pub fn with_tab(mut self, tab: impl Into<String>) -> Self {
        self.tab = Some(tab.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// View for a URL. A repeated query parameter keeps its last value.
    pub fn from_url(url: &Url, tab: Option<&str>) -> Self {
        Self {
            pathname: url.path().to_string(),
            tab: tab.map(str::to_string),
            params: url.query_pairs().into_owned().collect(),
        }
    }

    pub fn key(&self) -> FeedKey {
        FeedKey::derive(&self.pathname, self.tab.as_deref(), Some(&self.params))
    }
}

// ============================================================================
// Restoration Decision
// ============================================================================

/// Decide whether to restore `view`, and if so consume its saved state.
///
/// Storage is not touched when the policy declines. A found state is cleared
/// before it is returned, so the next visit starts fresh.
pub fn restore_feed_state<P>(
    cache: &FeedStateCache,
    view: &FeedView,
    is_back_forward: bool,
    policy: &P,
) -> Option<StoredFeedState>
where
    P: RestorePolicy + ?Sized,
{
    if !policy.should_restore(is_back_forward) {
        return None;
    }

    let key = view.key();
    let state = cache.take_feed_state(&key);
    match &state {
        Some(s) => tracing::debug!(key = %key, entries = s.entries.len(), "Restored feed state"),
        None => tracing::trace!(key = %key, "No saved feed state to restore"),
    }
    state
}

// ============================================================================
// Feed Session
// ============================================================================

/// What a view captures when the user leaves it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub entries: Vec<FeedEntry>,
    pub scroll_position: f64,
    pub page: Option<u32>,
    pub has_more: Option<bool>,
}

/// A mounted list view's handle on the cache.
///
/// Holding a session keeps cache writes enabled. The key always follows the
/// current view: call [`FeedSession::set_view`] whenever the route, tab or
/// filters change.
#[derive(Debug)]
pub struct FeedSession<'a> {
    cache: &'a FeedStateCache,
    view: FeedView,
    key: FeedKey,
    last_clicked_entry_id: Option<String>,
    _tracking: TrackingGuard,
}

impl<'a> FeedSession<'a> {
    pub fn new(cache: &'a FeedStateCache, view: FeedView) -> Self {
        let key = view.key();
        Self {
            _tracking: cache.track(),
            cache,
            view,
            key,
            last_clicked_entry_id: None,
        }
    }

    pub fn view(&self) -> &FeedView {
        &self.view
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    pub fn last_clicked_entry_id(&self) -> Option<&str> {
        self.last_clicked_entry_id.as_deref()
    }

    /// Switch to a new route, tab or filter set. A click recorded for the old
    /// view is dropped.
    pub fn set_view(&mut self, view: FeedView) {
        if view == self.view {
            return;
        }
        self.key = view.key();
        self.view = view;
        self.last_clicked_entry_id = None;
    }

    /// Remember the entry the user opened, to highlight it on return.
    pub fn record_click(&mut self, entry_id: impl Into<String>) {
        self.last_clicked_entry_id = Some(entry_id.into());
    }

    /// Restore the current view's saved state, if the policy allows.
    pub fn restore<P>(&self, is_back_forward: bool, policy: &P) -> Option<StoredFeedState>
    where
        P: RestorePolicy + ?Sized,
    {
        restore_feed_state(self.cache, &self.view, is_back_forward, policy)
    }

    /// Save the current view's state.
    pub fn save(&self, snapshot: FeedSnapshot) -> SaveOutcome {
        let FeedSnapshot {
            entries,
            scroll_position,
            page,
            has_more,
        } = snapshot;
        self.cache.save_feed_state(FeedStateData {
            feed_key: self.key.clone(),
            entries,
            scroll_position,
            last_clicked_entry_id: self.last_clicked_entry_id.clone(),
            page,
            has_more,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLimits;
    use crate::platform::HeadlessPlatform;
    use serde_json::json;
    use std::rc::Rc;

    fn cache() -> FeedStateCache {
        FeedStateCache::new(Rc::new(HeadlessPlatform::new()), CacheLimits::default())
    }

    fn snapshot(n: usize) -> FeedSnapshot {
        FeedSnapshot {
            entries: (0..n).map(|i| FeedEntry::new(json!({ "id": i }))).collect(),
            scroll_position: 640.0,
            page: Some(1),
            has_more: Some(true),
        }
    }

    #[test]
    fn test_policies() {
        assert!(BackForwardOnly.should_restore(true));
        assert!(!BackForwardOnly.should_restore(false));
        assert!(Always.should_restore(false));
        assert!(!Never.should_restore(true));
        let closure = |is_back: bool| !is_back;
        assert!(closure.should_restore(false));
    }

    #[test]
    fn test_view_key_matches_derive() {
        let view = FeedView::new("/feed")
            .with_tab("popular")
            .with_param("hub", "biology");
        assert_eq!(
            view.key(),
            FeedKey::derive("/feed", Some("popular"), Some([("hub", "biology")]))
        );
    }

    #[test]
    fn test_view_from_url() {
        let url = Url::parse("https://example.com/fund?sort=new&status=open").unwrap();
        let view = FeedView::from_url(&url, Some("grants"));
        assert_eq!(view.pathname, "/fund");
        assert_eq!(view.tab.as_deref(), Some("grants"));
        assert_eq!(view.params.get("status").map(String::as_str), Some("open"));
        assert_eq!(view.key(), FeedKey::from_url(&url, Some("grants")));
    }

    #[test]
    fn test_restore_declined_returns_none_and_keeps_state() {
        let cache = cache();
        let view = FeedView::new("/feed");
        let session = FeedSession::new(&cache, view.clone());
        session.save(snapshot(2));

        assert!(restore_feed_state(&cache, &view, false, &BackForwardOnly).is_none());
        assert!(cache.get_feed_state(&view.key()).is_some());
    }

    #[test]
    fn test_restore_consumes_state() {
        let cache = cache();
        let view = FeedView::new("/feed");
        let session = FeedSession::new(&cache, view.clone());
        session.save(snapshot(2));

        let restored = restore_feed_state(&cache, &view, true, &BackForwardOnly).unwrap();
        assert_eq!(restored.entries.len(), 2);
        assert!(restore_feed_state(&cache, &view, true, &BackForwardOnly).is_none());
    }

    #[test]
    fn test_never_policy_overrides_back_navigation() {
        let cache = cache();
        let view = FeedView::new("/notebook");
        let session = FeedSession::new(&cache, view.clone());
        session.save(snapshot(1));

        assert!(session.restore(true, &Never).is_none());
        assert!(cache.get_feed_state(&view.key()).is_some());
    }

    #[test]
    fn test_session_keeps_gate_open() {
        let cache = cache();
        assert!(!cache.gate().is_open());
        {
            let _session = FeedSession::new(&cache, FeedView::new("/feed"));
            assert!(cache.gate().is_open());
        }
        assert!(!cache.gate().is_open());
    }

    #[test]
    fn test_session_saves_last_click() {
        let cache = cache();
        let mut session = FeedSession::new(&cache, FeedView::new("/feed"));
        session.record_click("3");
        session.save(snapshot(5));

        let stored = cache.get_feed_state(session.key()).unwrap();
        assert_eq!(stored.last_clicked_entry_id.as_deref(), Some("3"));
        assert_eq!(stored.last_clicked_index(), Some(3));
        assert_eq!(stored.page, Some(1));
        assert_eq!(stored.has_more, Some(true));
    }

    #[test]
    fn test_set_view_rekeys_from_current_values() {
        let cache = cache();
        let mut session = FeedSession::new(&cache, FeedView::new("/feed").with_tab("best"));
        session.record_click("1");

        session.set_view(FeedView::new("/feed").with_tab("new"));
        assert_eq!(
            session.key(),
            &FeedView::new("/feed").with_tab("new").key()
        );
        assert_eq!(session.last_clicked_entry_id(), None);

        session.save(snapshot(1));
        assert!(cache
            .get_feed_state(&FeedView::new("/feed").with_tab("new").key())
            .is_some());
        assert!(cache
            .get_feed_state(&FeedView::new("/feed").with_tab("best").key())
            .is_none());
    }

    #[test]
    fn test_set_same_view_keeps_click() {
        let cache = cache();
        let mut session = FeedSession::new(&cache, FeedView::new("/feed"));
        session.record_click("7");
        session.set_view(FeedView::new("/feed"));
        assert_eq!(session.last_clicked_entry_id(), Some("7"));
    }

    #[test]
    fn test_two_sessions_same_key_last_write_wins() {
        let cache = cache();
        let first = FeedSession::new(&cache, FeedView::new("/feed"));
        let second = FeedSession::new(&cache, FeedView::new("/feed"));
        first.save(snapshot(1));
        second.save(snapshot(4));

        let stored = cache.get_feed_state(first.key()).unwrap();
        assert_eq!(stored.entries.len(), 4);
    }
}
