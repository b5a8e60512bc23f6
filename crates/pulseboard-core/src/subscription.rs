//! RAII unsubscribe handle.
//!
//! Producers return a [`Subscription`] from their subscribe operation. The
//! handle runs its teardown exactly once: on an explicit
//! [`unsubscribe`](Subscription::unsubscribe) or when it is dropped,
//! whichever comes first. Unsubscribing twice is a no-op.

use std::fmt;

/// Disposable handle that detaches a callback from its producer.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a teardown action.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Run the teardown now. Later calls and the eventual drop do nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// Whether the teardown has not run yet.
    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    /// Give up the teardown without running it, leaving the callback attached.
    pub fn forget(mut self) {
        self.teardown = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
