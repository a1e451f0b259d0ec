use std::cell::Cell;
use std::rc::Rc;

/// Reference-counted switch that enables cache writes.
///
/// Every list view that wants its state persisted starts tracking when it
/// mounts and stops when it unmounts. Writes are accepted while at least one
/// view is tracking. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct TrackingGate {
    count: Rc<Cell<usize>>,
}

impl TrackingGate {
    /// Create a closed gate with no tracking views.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more tracking view and open the gate.
    ///
    /// Calls nest: the gate stays open until every `start` has been matched
    /// by a [`stop`](Self::stop).
    ///
    /// # Examples
    ///
    /// ```
    /// use feedstate::cache::TrackingGate;
    ///
    /// let gate = TrackingGate::new();
    /// gate.start();
    /// gate.start();
    /// gate.stop();
    /// assert!(gate.is_open());
    /// gate.stop();
    /// assert!(!gate.is_open());
    /// ```
    pub fn start(&self) {
        self.count.set(self.count.get() + 1);
        tracing::trace!(count = self.count.get(), "Feed tracking started");
    }

    /// Unregister one tracking view.
    ///
    /// The counter is floored at zero. An extra `stop` logs a warning and
    /// changes nothing, so it cannot close the gate for a view that started
    /// later.
    pub fn stop(&self) {
        match self.count.get() {
            0 => tracing::warn!("Feed tracking stopped more times than it was started"),
            n => {
                self.count.set(n - 1);
                tracing::trace!(count = n - 1, "Feed tracking stopped");
            }
        }
    }

    /// Start tracking for as long as the returned guard lives.
    ///
    /// # Returns
    ///
    /// A [`TrackingGuard`] that calls [`stop`](Self::stop) when dropped.
    /// Binding it to `_` drops it immediately.
    ///
    /// # Examples
    ///
    /// ```
    /// use feedstate::cache::TrackingGate;
    ///
    /// let gate = TrackingGate::new();
    /// {
    ///     let _tracking = gate.track();
    ///     assert!(gate.is_open());
    /// }
    /// assert!(!gate.is_open());
    /// ```
    pub fn track(&self) -> TrackingGuard {
        self.start();
        TrackingGuard { gate: self.clone() }
    }

    /// Whether saves are currently accepted (at least one view is tracking).
    pub fn is_open(&self) -> bool {
        self.count.get() > 0
    }

    /// Number of views currently tracking.
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

/// Keeps the tracking gate open until dropped.
///
/// A guard only exists after a matching start, so its stop can never unbalance
/// the counter.
#[derive(Debug)]
#[must_use = "tracking stops as soon as the guard is dropped"]
pub struct TrackingGuard {
    gate: TrackingGate,
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        self.gate.stop();
    }
}
