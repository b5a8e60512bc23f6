//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use crate::handle::ArenaGeneration;

/// Errors raised while planning, wiring or accessing a flag arena.
///
/// Every construction-time variant indicates a planner bug or an
/// over-capacity topology; none of them is clamped or retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// More outputs than the 16-bit mask length can address.
    TooManyOutputs {
        /// Outputs requested.
        outputs: usize,
        /// Maximum addressable outputs.
        max: usize,
    },
    /// A mask run longer than its 16-bit length field.
    MaskTooLong {
        /// Requested mask length in bytes.
        len: usize,
        /// Maximum mask length in bytes.
        max: usize,
    },
    /// A probe mask that does not have exactly one bit set.
    InvalidMask {
        /// The offending mask.
        mask: u8,
    },
    /// A probe whose flag byte is further away than its offset field holds.
    ProbeOffsetOutOfRange {
        /// Distance in bytes between probe record and flag byte.
        offset: usize,
        /// Maximum encodable distance.
        max: usize,
    },
    /// A record that would reference memory outside the flag region.
    OutsideFlagRegion {
        /// The offending byte offset.
        offset: usize,
        /// First byte of the flag region.
        start: usize,
        /// One past the last byte of the flag region.
        end: usize,
    },
    /// A mask update whose bit pattern does not match the record's span.
    MaskLengthMismatch {
        /// Span length recorded in the arena.
        expected: usize,
        /// Length of the supplied pattern.
        actual: usize,
    },
    /// A record index beyond the planned table.
    RecordOutOfRange {
        /// Requested record index.
        index: usize,
        /// Number of records in the table.
        count: usize,
    },
    /// The planned arena does not fit the 32-bit record offsets.
    CapacityExceeded {
        /// Bytes requested.
        requested: usize,
        /// Largest supported arena in bytes.
        capacity: usize,
    },
    /// A handle from a generation that is no longer live.
    StaleHandle {
        /// The generation encoded in the handle.
        handle_generation: ArenaGeneration,
        /// The live generation, if an arena is installed.
        live: Option<ArenaGeneration>,
    },
    /// The arena was accessed re-entrantly while already borrowed.
    Busy,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyOutputs { outputs, max } => {
                write!(f, "too many outputs: {outputs}, max {max}")
            }
            Self::MaskTooLong { len, max } => {
                write!(f, "mask run of {len} bytes exceeds the {max}-byte limit")
            }
            Self::InvalidMask { mask } => {
                write!(f, "probe mask {mask:#010b} must have exactly one bit set")
            }
            Self::ProbeOffsetOutOfRange { offset, max } => {
                write!(f, "probe offset {offset} exceeds encodable maximum {max}")
            }
            Self::OutsideFlagRegion { offset, start, end } => {
                write!(f, "offset {offset} lies outside flag region [{start}, {end})")
            }
            Self::MaskLengthMismatch { expected, actual } => {
                write!(f, "mask pattern has {actual} bytes, record expects {expected}")
            }
            Self::RecordOutOfRange { index, count } => {
                write!(f, "record {index} out of range for table of {count}")
            }
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes, capacity {capacity} bytes"
                )
            }
            Self::StaleHandle {
                handle_generation,
                live: Some(live),
            } => {
                write!(f, "stale handle: generation {handle_generation}, live {live}")
            }
            Self::StaleHandle {
                handle_generation,
                live: None,
            } => {
                write!(f, "stale handle: generation {handle_generation}, arena released")
            }
            Self::Busy => write!(f, "arena accessed re-entrantly"),
        }
    }
}

impl Error for ArenaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_stale_released() {
        let e = ArenaError::StaleHandle {
            handle_generation: ArenaGeneration(3),
            live: None,
        };
        assert_eq!(e.to_string(), "stale handle: generation 3, arena released");
    }

    #[test]
    fn display_invalid_mask_shows_bits() {
        let e = ArenaError::InvalidMask { mask: 0b11 };
        assert!(e.to_string().contains("0b00000011"));
    }
}
