//! Back/forward navigation detection.
//!
//! The detector answers one question: did the user arrive here through browser
//! history? It is set by any of three signals and stays set until a consumer
//! calls [`BackForwardDetector::reset`]:
//!
//! - navigation timing reports `back_forward` when the detector attaches
//! - a `popstate` event fires
//! - a `pageshow` event fires with `persisted == true`
use std::cell::Cell;
use std::rc::Rc;

use crate::platform::{ListenerId, NavigationType, Platform};

pub struct BackForwardDetector {
    platform: Rc<dyn Platform>,
    flag: Rc<Cell<bool>>,
    listeners: Vec<ListenerId>,
}

impl BackForwardDetector {
    /// Check navigation timing and subscribe to history events.
    ///
    /// Attach once, at the application root.
    pub fn attach(platform: Rc<dyn Platform>) -> Self {
        let navigation_type = platform.navigation_type();
        let flag = Rc::new(Cell::new(navigation_type == NavigationType::BackForward));
        tracing::debug!(
            navigation_type = navigation_type.name(),
            "Attached back/forward detector"
        );

        let on_pop = Rc::clone(&flag);
        let pop_id = platform.on_pop_state(Box::new(move || {
            tracing::trace!("popstate received");
            on_pop.set(true);
        }));

        let on_show = Rc::clone(&flag);
        let show_id = platform.on_page_show(Box::new(move |event| {
            if event.persisted {
                tracing::trace!("pageshow from back/forward cache");
                on_show.set(true);
            }
        }));

        Self {
            platform,
            flag,
            listeners: vec![pop_id, show_id],
        }
    }

    /// True once any back/forward signal has been seen since the last reset.
    pub fn is_back_forward(&self) -> bool {
        self.flag.get()
    }

    /// Clear the flag after it has been acted on.
    pub fn reset(&self) {
        self.flag.set(false);
    }

    /// Remove the event listeners. The flag keeps its value but no longer
    /// changes. Safe to call more than once.
    pub fn teardown(&mut self) {
        for id in self.listeners.drain(..) {
            self.platform.remove_listener(id);
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }
}

impl Drop for BackForwardDetector {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for BackForwardDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackForwardDetector")
            .field("is_back_forward", &self.flag.get())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessPlatform;

    fn platform() -> Rc<HeadlessPlatform> {
        Rc::new(HeadlessPlatform::new())
    }

    #[test]
    fn test_starts_false_on_fresh_navigation() {
        let platform = platform();
        let detector = BackForwardDetector::attach(platform.clone());
        assert!(!detector.is_back_forward());
    }

    #[test]
    fn test_navigation_timing_sets_flag() {
        let platform = platform();
        platform.set_navigation_type(NavigationType::BackForward);
        let detector = BackForwardDetector::attach(platform.clone());
        assert!(detector.is_back_forward());
    }

    #[test]
    fn test_reload_does_not_set_flag() {
        let platform = platform();
        platform.set_navigation_type(NavigationType::Reload);
        let detector = BackForwardDetector::attach(platform.clone());
        assert!(!detector.is_back_forward());
    }

    #[test]
    fn test_pop_state_sets_flag() {
        let platform = platform();
        let detector = BackForwardDetector::attach(platform.clone());
        platform.dispatch_pop_state();
        assert!(detector.is_back_forward());
    }

    #[test]
    fn test_page_show_only_when_persisted() {
        let platform = platform();
        let detector = BackForwardDetector::attach(platform.clone());

        platform.dispatch_page_show(false);
        assert!(!detector.is_back_forward());

        platform.dispatch_page_show(true);
        assert!(detector.is_back_forward());
    }

    #[test]
    fn test_flag_sticks_until_reset() {
        let platform = platform();
        let detector = BackForwardDetector::attach(platform.clone());
        platform.dispatch_pop_state();
        assert!(detector.is_back_forward());
        assert!(detector.is_back_forward());

        detector.reset();
        assert!(!detector.is_back_forward());

        platform.dispatch_pop_state();
        assert!(detector.is_back_forward());
    }

    #[test]
    fn test_teardown_removes_listeners() {
        let platform = platform();
        let mut detector = BackForwardDetector::attach(platform.clone());
        assert_eq!(platform.listener_count(), 2);

        detector.teardown();
        assert_eq!(platform.listener_count(), 0);
        assert!(!detector.is_attached());

        platform.dispatch_pop_state();
        assert!(!detector.is_back_forward());

        detector.teardown();
    }

    #[test]
    fn test_drop_removes_listeners() {
        let platform = platform();
        {
            let _detector = BackForwardDetector::attach(platform.clone());
            assert_eq!(platform.listener_count(), 2);
        }
        assert_eq!(platform.listener_count(), 0);
    }
}
