//! Per-input runtime bindings.
//!
//! A binding is what the producer actually calls. It is compiled once per
//! rebuild in one of two shapes: pulse-only when the input has no
//! callbacks, or pulse-and-enqueue when it does. The binding owns the
//! producer [`Subscription`]; dropping it detaches the producer.

use std::cell::Cell;
use std::fmt;

use pulseboard_arena::PulseSource;
use pulseboard_core::{Subscription, Timestamp};

use crate::dispatch::{Batch, DispatchQueue};
use crate::traits::{InputRef, PulseFn};

/// Live subscription of one input for one arena generation.
pub(crate) struct RuntimeBinding {
    subscription: Subscription,
    batch_len: usize,
}

impl RuntimeBinding {
    /// Subscribe `input` with a closure pulsing `source`.
    ///
    /// An empty `batch` compiles the pulse-only shape; otherwise the closure
    /// also queues the batch once per dispatch cycle.
    pub(crate) fn attach(
        input: &InputRef,
        source: PulseSource,
        batch: Batch,
        queue: &DispatchQueue,
    ) -> Self {
        let batch_len = batch.len();
        let name = input.name().to_owned();
        let on_pulse: PulseFn = if batch.is_empty() {
            Box::new(move |at: Timestamp| {
                if let Err(error) = source.pulse(at) {
                    tracing::warn!(input = %name, %error, "pulse ignored");
                }
            })
        } else {
            let queue = queue.clone();
            let last_cycle = Cell::new(None);
            Box::new(move |at: Timestamp| match source.pulse(at) {
                Ok(()) => {
                    queue.enqueue_once(&batch, &last_cycle);
                }
                Err(error) => {
                    tracing::warn!(input = %name, %error, "pulse ignored");
                }
            })
        };
        Self {
            subscription: input.subscribe(on_pulse),
            batch_len,
        }
    }

    /// Number of callbacks the binding queues, zero for pulse-only.
    pub(crate) fn batch_len(&self) -> usize {
        self.batch_len
    }

    /// Whether the producer subscription is still attached.
    pub(crate) fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }
}

impl fmt::Debug for RuntimeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBinding")
            .field("batch_len", &self.batch_len)
            .field("attached", &self.is_attached())
            .finish()
    }
}
