//! Session-scoped feed state cache.
//!
//! List views ("feeds") save their loaded entries, pagination cursor and scroll
//! position when the user navigates away. When the user comes back through
//! browser history, the view restores that state once instead of refetching.
//!
//! # Architecture
//!
//! - [`key`] - stable [`FeedKey`] per route, tab and filter set
//! - [`cache`] - bounded store, tracking gate, save/get/clear
//! - [`codec`] - store serialization (JSON by default)
//! - [`storage`] - session storage backends
//! - [`platform`] - host environment abstraction (storage, history events, clock)
//! - [`navigation`] - back/forward navigation detector
//! - [`restore`] - restore policies and per-view sessions
//! - [`context`] - the root object tying the above together
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use feedstate::platform::HeadlessPlatform;
//! use feedstate::restore::{BackForwardOnly, FeedSnapshot, FeedView};
//! use feedstate::{Config, FeedStateContext};
//!
//! let platform = Rc::new(HeadlessPlatform::new());
//! let ctx = FeedStateContext::new(platform.clone(), &Config::default());
//! let view = FeedView::new("/feed").with_tab("popular");
//!
//! {
//!     let mut session = ctx.open_session(view.clone());
//!     session.record_click("paper-7");
//!     session.save(FeedSnapshot {
//!         scroll_position: 1200.0,
//!         ..FeedSnapshot::default()
//!     });
//! }
//!
//! // User presses Back
//! platform.dispatch_pop_state();
//! let restored = ctx.restore_view(&view, &BackForwardOnly).unwrap();
//! assert_eq!(restored.scroll_position, 1200.0);
//! assert!(ctx.restore_view(&view, &BackForwardOnly).is_none());
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod context;
pub mod key;
pub mod navigation;
pub mod platform;
pub mod restore;
pub mod storage;
pub mod util;

pub use cache::{FeedEntry, FeedStateCache, FeedStateData, SaveOutcome, StoredFeedState};
pub use config::{Config, ConfigError};
pub use context::FeedStateContext;
pub use key::FeedKey;
