//! Core types and utilities for the Pulseboard pulse-propagation engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! small shared vocabulary used throughout the workspace: the
//! [`Timestamp`] carried by every pulse, the RAII [`Subscription`] handle
//! returned by producers, the reusable [`GrowBuffer`], and bit
//! serialization helpers for diagnostics.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bits;
pub mod buffer;
pub mod id;
pub mod subscription;

pub use buffer::GrowBuffer;
pub use id::Timestamp;
pub use subscription::Subscription;

/// Number of bits in one flag byte.
pub const BITS_PER_BYTE: usize = 8;
