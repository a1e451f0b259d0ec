//! Integration tests for the restoration flow: a list view saves on the way
//! out, the user navigates back, and the view restores exactly once.
//!
//! The file-backed tests rebuild the context over the same session directory
//! to mirror a page reload within one browsing session.

use std::path::PathBuf;
use std::rc::Rc;

use feedstate::platform::{HeadlessPlatform, NavigationType};
use feedstate::restore::{
    restore_feed_state, Always, BackForwardOnly, FeedSnapshot, FeedView, Never,
};
use feedstate::storage::{FileStorage, SessionStorage};
use feedstate::{Config, FeedEntry, FeedStateContext};
use pretty_assertions::assert_eq;
use serde_json::json;

fn snapshot(n: usize, scroll: f64) -> FeedSnapshot {
    FeedSnapshot {
        entries: (0..n)
            .map(|i| FeedEntry::new(json!({ "id": format!("bounty-{i}") })))
            .collect(),
        scroll_position: scroll,
        page: Some(2),
        has_more: Some(false),
    }
}

fn session_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("feedstate_restoration_{name}"));
    std::fs::remove_dir_all(&dir).ok();
    dir
}

// ============================================================================
// Decision Gating
// ============================================================================

#[test]
fn test_no_restore_without_back_navigation() {
    let platform = Rc::new(HeadlessPlatform::new());
    let ctx = FeedStateContext::new(platform, &Config::default());
    let view = FeedView::new("/bounties").with_tab("open");

    ctx.open_session(view.clone()).save(snapshot(3, 90.0));

    assert!(!ctx.is_back_navigation());
    assert!(ctx.restore_view(&view, &BackForwardOnly).is_none());
    // Declined restoration leaves the state for a later back navigation
    assert!(ctx.get_feed_state(&view.key()).is_some());
}

#[test]
fn test_back_navigation_restores_then_clears() {
    let platform = Rc::new(HeadlessPlatform::new());
    let ctx = FeedStateContext::new(platform.clone(), &Config::default());
    let view = FeedView::new("/bounties").with_tab("open");

    {
        let mut session = ctx.open_session(view.clone());
        session.record_click("bounty-1");
        session.save(snapshot(3, 90.0));
    }

    platform.dispatch_pop_state();
    let restored = ctx.restore_view(&view, &BackForwardOnly).unwrap();
    assert_eq!(restored.entries.len(), 3);
    assert_eq!(restored.scroll_position, 90.0);
    assert_eq!(restored.page, Some(2));
    assert_eq!(restored.has_more, Some(false));
    assert_eq!(restored.last_clicked_index(), Some(1));

    assert!(ctx.restore_view(&view, &BackForwardOnly).is_none());
}

#[test]
fn test_bfcache_page_show_enables_restore() {
    let platform = Rc::new(HeadlessPlatform::new());
    let ctx = FeedStateContext::new(platform.clone(), &Config::default());
    let view = FeedView::new("/lists");
    ctx.open_session(view.clone()).save(snapshot(1, 10.0));

    platform.dispatch_page_show(false);
    assert!(ctx.restore_view(&view, &BackForwardOnly).is_none());

    platform.dispatch_page_show(true);
    assert!(ctx.restore_view(&view, &BackForwardOnly).is_some());
}

#[test]
fn test_reset_after_restore_blocks_next_fresh_navigation() {
    let platform = Rc::new(HeadlessPlatform::new());
    let ctx = FeedStateContext::new(platform.clone(), &Config::default());
    let view = FeedView::new("/feed");

    ctx.open_session(view.clone()).save(snapshot(1, 0.0));
    platform.dispatch_pop_state();
    assert!(ctx.restore_view(&view, &BackForwardOnly).is_some());
    ctx.reset_back_navigation();

    // A fresh navigation later in the session does not replay new saves
    ctx.open_session(view.clone()).save(snapshot(2, 0.0));
    assert!(ctx.restore_view(&view, &BackForwardOnly).is_none());
}

#[test]
fn test_policy_overrides() {
    let platform = Rc::new(HeadlessPlatform::new());
    let ctx = FeedStateContext::new(platform.clone(), &Config::default());
    let notebooks = FeedView::new("/notebooks");
    let papers = FeedView::new("/papers");
    ctx.open_session(notebooks.clone()).save(snapshot(1, 0.0));
    ctx.open_session(papers.clone()).save(snapshot(1, 0.0));

    platform.dispatch_pop_state();
    assert!(ctx.restore_view(&notebooks, &Never).is_none());
    assert!(ctx.get_feed_state(&notebooks.key()).is_some());

    let only_on_fresh = |is_back: bool| !is_back;
    assert!(ctx.restore_view(&papers, &only_on_fresh).is_none());
    assert!(ctx.restore_view(&papers, &Always).is_some());
}

#[test]
fn test_restore_uses_current_filters() {
    let platform = Rc::new(HeadlessPlatform::new());
    platform.set_navigation_type(NavigationType::BackForward);
    let ctx = FeedStateContext::new(platform, &Config::default());

    let best = FeedView::new("/feed").with_tab("best").with_param("hub", "bio");
    let new = FeedView::new("/feed").with_tab("new").with_param("hub", "bio");

    let mut session = ctx.open_session(best.clone());
    session.save(snapshot(1, 10.0));
    // User switches tab before leaving; the save follows the new tab
    session.set_view(new.clone());
    session.save(snapshot(4, 40.0));
    drop(session);

    let restored =
        restore_feed_state(ctx.cache(), &new, ctx.is_back_navigation(), &BackForwardOnly)
            .unwrap();
    assert_eq!(restored.entries.len(), 4);
    let restored = ctx.restore_view(&best, &BackForwardOnly).unwrap();
    assert_eq!(restored.entries.len(), 1);
}

// ============================================================================
// File-backed Session
// ============================================================================

#[test]
fn test_state_survives_reload_in_same_session() {
    let dir = session_dir("reload");
    let config = Config::default();
    let view = FeedView::new("/fund").with_param("status", "open");

    {
        let storage = Rc::new(FileStorage::open(&dir).unwrap());
        let platform = Rc::new(HeadlessPlatform::with_storage(storage));
        let mut ctx = FeedStateContext::new(platform, &config);
        ctx.open_session(view.clone()).save(snapshot(5, 512.0));
        ctx.teardown();
    }

    // New page load arrives via the back button
    let storage = Rc::new(FileStorage::open(&dir).unwrap());
    let platform = Rc::new(HeadlessPlatform::with_storage(storage.clone()));
    platform.set_navigation_type(NavigationType::BackForward);
    let ctx = FeedStateContext::new(platform, &config);

    let restored = ctx.restore_view(&view, &BackForwardOnly).unwrap();
    assert_eq!(restored.entries.len(), 5);
    assert_eq!(restored.scroll_position, 512.0);
    // Last key cleared, so the slot is gone
    assert_eq!(storage.get_item(&config.storage_key).unwrap(), None);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_corrupt_session_file_recovers() {
    let dir = session_dir("corrupt");
    let config = Config::default();
    let storage = Rc::new(FileStorage::open(&dir).unwrap());
    storage
        .set_item(&config.storage_key, b"\x00\x01 definitely not json")
        .unwrap();

    let platform = Rc::new(HeadlessPlatform::with_storage(storage.clone()));
    platform.set_navigation_type(NavigationType::BackForward);
    let ctx = FeedStateContext::new(platform, &config);
    let view = FeedView::new("/feed");

    assert!(ctx.restore_view(&view, &BackForwardOnly).is_none());

    ctx.open_session(view.clone()).save(snapshot(2, 0.0));
    let raw = storage.get_item(&config.storage_key).unwrap().unwrap();
    assert!(serde_json::from_slice::<serde_json::Value>(&raw).is_ok());
    assert!(ctx.get_feed_state(&view.key()).is_some());

    std::fs::remove_dir_all(&dir).ok();
}
