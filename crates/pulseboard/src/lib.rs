//! Pulseboard: low-overhead pulse propagation for tick-driven systems.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Pulseboard sub-crates. For most users, adding `pulseboard` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use pulseboard::prelude::*;
//!
//! // A producer that remembers the pulse closure it was given.
//! struct Button {
//!     name: String,
//!     on_pulse: Rc<RefCell<Option<PulseFn>>>,
//! }
//! impl RelayInput for Button {
//!     fn name(&self) -> &str { &self.name }
//!     fn subscribe(&self, on_pulse: PulseFn) -> Subscription {
//!         *self.on_pulse.borrow_mut() = Some(on_pulse);
//!         let slot = Rc::clone(&self.on_pulse);
//!         Subscription::new(move || { slot.borrow_mut().take(); })
//!     }
//! }
//!
//! // A subscriber that keeps its probe.
//! struct Lamp {
//!     name: String,
//!     probe: RefCell<Option<Probe>>,
//! }
//! impl RelayOutput for Lamp {
//!     fn name(&self) -> &str { &self.name }
//!     fn inject(&self, probe: Probe) { *self.probe.borrow_mut() = Some(probe); }
//! }
//!
//! let button = Rc::new(Button { name: "button".into(), on_pulse: Default::default() });
//! let lamp = Rc::new(Lamp { name: "lamp".into(), probe: RefCell::new(None) });
//! let input: InputRef = button.clone();
//! let output: OutputRef = lamp.clone();
//!
//! let mut board = RelayBoard::new();
//! let connection = board.connect(&input, &output).unwrap().unwrap();
//! board.subscribe(&connection, |now| println!("pressed at {now}")).unwrap();
//! board.initialize().unwrap();
//!
//! // The producer fires: the lamp's flag is set, the callback is queued.
//! if let Some(pulse) = button.on_pulse.borrow_mut().as_mut() {
//!     pulse(Timestamp(1));
//! }
//! let probe = lamp.probe.borrow().clone().unwrap();
//! assert!(probe.is_set().unwrap());
//! assert_eq!(board.poll(Timestamp(2)), 1);
//!
//! probe.clear().unwrap();
//! assert!(!probe.is_set().unwrap());
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `pulseboard-core` | `Timestamp`, `Subscription`, `GrowBuffer`, bit helpers |
//! | [`arena`] | `pulseboard-arena` | Layout planner, flag arena, pulse sources and probes |
//! | [`engine`] | `pulseboard-engine` | Relay board, lazy rebuilds, dispatch queue |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types shared by every crate (`pulseboard-core`).
///
/// Contains the [`types::Timestamp`] carried by pulses, the RAII
/// [`types::Subscription`] returned by producers, and bit helpers.
pub use pulseboard_core as types;

/// Flag arena, sources and probes (`pulseboard-arena`).
///
/// Most users only need [`arena::Probe`] from this module; it is also
/// available in the [`prelude`].
pub use pulseboard_arena as arena;

/// The relay board (`pulseboard-engine`).
///
/// [`engine::RelayBoard`] connects inputs to outputs, rebuilds the arena and
/// runs deferred callbacks on [`engine::RelayBoard::poll`].
pub use pulseboard_engine as engine;

/// Common imports for typical Pulseboard usage.
///
/// ```rust
/// use pulseboard::prelude::*;
/// ```
///
/// This imports the board, the two endpoint traits, the handles outputs
/// receive, and the error types.
pub mod prelude {
    // Core types
    pub use pulseboard_core::{Subscription, Timestamp};

    // Arena handles
    pub use pulseboard_arena::{ArenaError, Probe, PulseSource};

    // Engine
    pub use pulseboard_engine::{
        BatchScope, BoardConfig, BoardError, BoardMetrics, Callback, Connection, InputRef,
        OutputRef, PulseFn, RelayBoard, RelayInput, RelayOutput, SubscriptionId,
    };
}
