//! Relay board orchestrating Pulseboard inputs, outputs and callbacks.
//!
//! [`RelayBoard`] owns the connection graph and the live flag arena. Inputs
//! ([`RelayInput`]) are subscribed with a pulse closure; outputs
//! ([`RelayOutput`]) receive a [`Probe`](pulseboard_arena::Probe) on every
//! rebuild and test or clear their own flag bit. Callbacks registered on a
//! [`Connection`] are queued once per poll cycle and run by
//! [`RelayBoard::poll`].
//!
//! Topology edits rebuild the arena. Group edits in a
//! [`BatchScope`] to rebuild once at the end.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod board;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod lazy;
pub mod metrics;
mod registry;
pub mod report;
mod runtime;
pub mod traits;

pub use board::{InputLinks, OutputLinks, RelayBoard};
pub use config::{BoardConfig, ConfigError};
pub use connection::{Connection, SubscriptionId};
pub use dispatch::{Batch, DispatchQueue};
pub use error::BoardError;
pub use lazy::BatchScope;
pub use metrics::BoardMetrics;
pub use report::ArenaReport;
pub use traits::{Callback, InputRef, OutputRef, PulseFn, RelayInput, RelayOutput};
