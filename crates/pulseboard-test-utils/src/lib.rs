//! Test utilities and mock endpoints for Pulseboard development.
//!
//! Provides a [`MockInput`] producer that fires pulses on demand, a
//! [`MockOutput`] subscriber that keeps the probe it was given, and seeded
//! random topologies in [`fixtures`] with a reference model to compare the
//! board against.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pulseboard_arena::Probe;
use pulseboard_core::{Subscription, Timestamp};
use pulseboard_engine::{InputRef, OutputRef, PulseFn, RelayInput, RelayOutput};

/// Producer mock implementing [`RelayInput`].
///
/// Each [`notify`](MockInput::notify) advances a private clock by one tick
/// and fires every attached listener with it.
pub struct MockInput {
    name: String,
    listeners: Rc<RefCell<Vec<Option<PulseFn>>>>,
    clock: Cell<u64>,
}

impl MockInput {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            listeners: Rc::new(RefCell::new(Vec::new())),
            clock: Cell::new(0),
        })
    }

    /// Type-erased handle for [`RelayBoard::connect`](pulseboard_engine::RelayBoard::connect).
    pub fn handle(self: &Rc<Self>) -> InputRef {
        Rc::clone(self) as InputRef
    }

    /// Fire with the next clock tick. Returns the timestamp used.
    pub fn notify(&self) -> Timestamp {
        let at = Timestamp(self.clock.get() + 1);
        self.notify_at(at);
        at
    }

    /// Fire with an explicit timestamp; the clock jumps forward to it.
    pub fn notify_at(&self, at: Timestamp) {
        self.clock.set(self.clock.get().max(at.ticks()));
        for listener in self.listeners.borrow_mut().iter_mut().flatten() {
            listener(at);
        }
    }

    /// Listeners currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().iter().filter(|l| l.is_some()).count()
    }
}

impl RelayInput for MockInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, on_pulse: PulseFn) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        let slot = listeners.len();
        listeners.push(Some(on_pulse));
        let listeners = Rc::clone(&self.listeners);
        Subscription::new(move || {
            if let Some(entry) = listeners.borrow_mut().get_mut(slot) {
                *entry = None;
            }
        })
    }
}

/// Subscriber mock implementing [`RelayOutput`].
///
/// Keeps the last injected probe. A missing or stale probe reads as not
/// flagged.
pub struct MockOutput {
    name: String,
    probe: RefCell<Option<Probe>>,
    injections: Cell<usize>,
}

impl MockOutput {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            probe: RefCell::new(None),
            injections: Cell::new(0),
        })
    }

    pub fn handle(self: &Rc<Self>) -> OutputRef {
        Rc::clone(self) as OutputRef
    }

    pub fn probe(&self) -> Option<Probe> {
        self.probe.borrow().clone()
    }

    pub fn is_flagged(&self) -> bool {
        self.probe
            .borrow()
            .as_ref()
            .is_some_and(|p| p.is_set().unwrap_or(false))
    }

    /// Clear this output's flag. A stale probe is ignored.
    pub fn reset(&self) {
        if let Some(probe) = self.probe.borrow().as_ref() {
            let _ = probe.clear();
        }
    }

    /// Read the flag and clear it.
    pub fn check_and_reset(&self) -> bool {
        let flagged = self.is_flagged();
        self.reset();
        flagged
    }

    /// Latest pulse among linked inputs, `None` without a live probe.
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.probe
            .borrow()
            .as_ref()
            .and_then(|p| p.last_timestamp().ok())
    }

    /// Number of probes received so far.
    pub fn inject_count(&self) -> usize {
        self.injections.get()
    }
}

impl RelayOutput for MockOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn inject(&self, probe: Probe) {
        *self.probe.borrow_mut() = Some(probe);
        self.injections.set(self.injections.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_advances_clock() {
        let input = MockInput::new("I");
        assert_eq!(input.notify(), Timestamp(1));
        input.notify_at(Timestamp(10));
        assert_eq!(input.notify(), Timestamp(11));
    }

    #[test]
    fn dropped_subscription_detaches() {
        let input = MockInput::new("I");
        let hits = Rc::new(Cell::new(0));
        let sub = {
            let hits = Rc::clone(&hits);
            input.subscribe(Box::new(move |_: Timestamp| hits.set(hits.get() + 1)))
        };
        input.notify();
        assert_eq!(input.subscriber_count(), 1);
        drop(sub);
        input.notify();
        assert_eq!(input.subscriber_count(), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn output_without_probe_is_quiet() {
        let output = MockOutput::new("O");
        assert!(!output.is_flagged());
        assert!(!output.check_and_reset());
        assert_eq!(output.last_timestamp(), None);
        assert_eq!(output.inject_count(), 0);
    }
}
