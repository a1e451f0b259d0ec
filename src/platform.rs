//! Platform provider interface.
//!
//! Everything the cache and the navigation detector need from the host
//! environment (session storage, navigation timing, history events and the
//! clock) goes through [`Platform`]. A browser build wires it to `window`,
//! `performance` and `sessionStorage`; [`HeadlessPlatform`] drives the same
//! logic from tests and the CLI.
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::storage::{MemoryStorage, SessionStorage};

// ============================================================================
// Navigation Types
// ============================================================================

/// How the current page load came about, as reported by navigation timing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationType {
    #[default]
    Navigate,
    Reload,
    BackForward,
    Prerender,
}

impl NavigationType {
    /// Parse the navigation timing name (`"navigate"`, `"reload"`,
    /// `"back_forward"`, `"prerender"`). Unknown names read as `Navigate`.
    pub fn from_timing_name(name: &str) -> Self {
        match name {
            "reload" => Self::Reload,
            "back_forward" => Self::BackForward,
            "prerender" => Self::Prerender,
            _ => Self::Navigate,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Reload => "reload",
            Self::BackForward => "back_forward",
            Self::Prerender => "prerender",
        }
    }
}

/// Payload of a `pageshow` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageShowEvent {
    /// True when the page came out of the back/forward cache.
    pub persisted: bool,
}

/// Handle returned when a listener is registered, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ============================================================================
// Platform
// ============================================================================

pub trait Platform {
    /// Session-scoped storage for this tab.
    fn storage(&self) -> Rc<dyn SessionStorage>;

    /// Navigation type of the current page load.
    fn navigation_type(&self) -> NavigationType;

    /// Register a `popstate` listener.
    fn on_pop_state(&self, callback: Box<dyn Fn()>) -> ListenerId;

    /// Register a `pageshow` listener.
    fn on_page_show(&self, callback: Box<dyn Fn(PageShowEvent)>) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

// ============================================================================
// HeadlessPlatform
// ============================================================================

#[derive(Clone)]
enum Listener {
    PopState(Rc<dyn Fn()>),
    PageShow(Rc<dyn Fn(PageShowEvent)>),
}

/// In-process platform: events are dispatched by hand and time can be pinned.
pub struct HeadlessPlatform {
    storage: Rc<dyn SessionStorage>,
    navigation_type: Cell<NavigationType>,
    pinned_now: Cell<Option<i64>>,
    next_listener_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
}

impl HeadlessPlatform {
    /// Platform backed by fresh in-memory storage.
    pub fn new() -> Self {
        Self::with_storage(Rc::new(MemoryStorage::new()))
    }

    pub fn with_storage(storage: Rc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            navigation_type: Cell::new(NavigationType::Navigate),
            pinned_now: Cell::new(None),
            next_listener_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn set_navigation_type(&self, navigation_type: NavigationType) {
        self.navigation_type.set(navigation_type);
    }

    /// Pin the clock to `millis`. `None` returns to wall-clock time.
    pub fn set_now(&self, millis: Option<i64>) {
        self.pinned_now.set(millis);
    }

    /// Fire `popstate` on every registered listener.
    pub fn dispatch_pop_state(&self) {
        for listener in self.snapshot_listeners() {
            if let Listener::PopState(callback) = listener {
                callback();
            }
        }
    }

    /// Fire `pageshow` on every registered listener.
    pub fn dispatch_page_show(&self, persisted: bool) {
        let event = PageShowEvent { persisted };
        for listener in self.snapshot_listeners() {
            if let Listener::PageShow(callback) = listener {
                callback(event);
            }
        }
    }

    /// Number of listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    // Callbacks may register or remove listeners; never hold the borrow while
    // calling them.
    fn snapshot_listeners(&self) -> Vec<Listener> {
        self.listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    fn register(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.get());
        self.next_listener_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeadlessPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessPlatform")
            .field("navigation_type", &self.navigation_type.get())
            .field("pinned_now", &self.pinned_now.get())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl Platform for HeadlessPlatform {
    fn storage(&self) -> Rc<dyn SessionStorage> {
        Rc::clone(&self.storage)
    }

    fn navigation_type(&self) -> NavigationType {
        self.navigation_type.get()
    }

    fn on_pop_state(&self, callback: Box<dyn Fn()>) -> ListenerId {
        self.register(Listener::PopState(Rc::from(callback)))
    }

    fn on_page_show(&self, callback: Box<dyn Fn(PageShowEvent)>) -> ListenerId {
        self.register(Listener::PageShow(Rc::from(callback)))
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    fn now_millis(&self) -> i64 {
        self.pinned_now
            .get()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
    }
}
