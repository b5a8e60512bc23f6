//! Capability contracts required of producers and subscribers.

use std::rc::Rc;

use pulseboard_arena::Probe;
use pulseboard_core::{Subscription, Timestamp};

/// Closure the board hands to a producer; call it on every fire.
pub type PulseFn = Box<dyn FnMut(Timestamp)>;

/// Connection callback, run from [`RelayBoard::poll`](crate::RelayBoard::poll)
/// with the poll time.
///
/// Callbacks are compared by `Rc` identity when a batch is compiled, so
/// registering the same `Rc` on two connections of one input runs it once.
pub type Callback = Rc<dyn Fn(Timestamp)>;

/// A named producer.
pub trait RelayInput {
    /// Unique name; inputs are keyed by it.
    fn name(&self) -> &str;

    /// Attach `on_pulse`, to be invoked whenever the producer fires.
    ///
    /// Called once per input per rebuild. Dropping the returned
    /// [`Subscription`] must detach the closure.
    fn subscribe(&self, on_pulse: PulseFn) -> Subscription;
}

/// A named subscriber.
pub trait RelayOutput {
    /// Unique name; outputs are keyed by it.
    fn name(&self) -> &str;

    /// Receive the probe for this output's flag bit.
    ///
    /// Called once per output per rebuild; the previous probe is stale from
    /// then on.
    fn inject(&self, probe: Probe);
}

/// Shared handle to a producer.
pub type InputRef = Rc<dyn RelayInput>;

/// Shared handle to a subscriber.
pub type OutputRef = Rc<dyn RelayOutput>;
