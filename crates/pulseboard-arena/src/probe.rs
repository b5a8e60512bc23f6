//! Per-output probes.
//!
//! Each output owns one 4-byte probe record holding a packed word that
//! locates its flag bit relative to the record itself:
//!
//! ```text
//!  31   29 28 27                                    0
//! ┌───────┬──┬──────────────────────────────────────┐
//! │ bit   │s │ |flag_byte - probe_offset|           │
//! └───────┴──┴──────────────────────────────────────┘
//! ```
//!
//! `s` is set when the flag byte lies before the probe, which is always the
//! case for arenas built by [`ArenaBuilder`](crate::ArenaBuilder).

use std::fmt;

use pulseboard_core::{bits, Timestamp};

use crate::arena::ArenaSlot;
use crate::error::ArenaError;
use crate::handle::{ArenaGeneration, RecordHandle};
use crate::layout::Region;

/// Size of one probe record in bytes.
pub const PROBE_RECORD_BYTES: usize = 4;

const BIT_SHIFT: u32 = 29;
const SIGN: u32 = 1 << 28;
const MAGNITUDE: u32 = 0x0FFF_FFFF;

/// Largest distance a probe word can encode between record and flag byte.
pub const MAX_PROBE_DISTANCE: usize = MAGNITUDE as usize;

/// Packed self-relative locator for one flag bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProbeWord(u32);

impl ProbeWord {
    /// Encode the word for a probe at `probe_offset` watching `mask` in
    /// `flag_byte` (both absolute).
    ///
    /// Rejects masks without exactly one bit, flag bytes outside `flags`,
    /// and distances beyond [`MAX_PROBE_DISTANCE`].
    pub fn encode(
        probe_offset: usize,
        flag_byte: usize,
        mask: u8,
        flags: Region,
    ) -> Result<Self, ArenaError> {
        if mask.count_ones() != 1 {
            return Err(ArenaError::InvalidMask { mask });
        }
        if !flags.contains(flag_byte) {
            return Err(ArenaError::OutsideFlagRegion {
                offset: flag_byte,
                start: flags.start,
                end: flags.end(),
            });
        }
        let (sign, distance) = if flag_byte >= probe_offset {
            (0, flag_byte - probe_offset)
        } else {
            (SIGN, probe_offset - flag_byte)
        };
        if distance > MAX_PROBE_DISTANCE {
            return Err(ArenaError::ProbeOffsetOutOfRange {
                offset: distance,
                max: MAX_PROBE_DISTANCE,
            });
        }
        let word = Self((mask.trailing_zeros() << BIT_SHIFT) | sign | distance as u32);
        debug_assert_eq!(word.target(probe_offset), flag_byte);
        debug_assert_eq!(word.mask(), mask);
        Ok(word)
    }

    /// Raw packed value.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Bit position inside the flag byte, 0..8.
    pub fn bit_index(self) -> u32 {
        self.0 >> BIT_SHIFT
    }

    /// Single-bit mask selecting the flag.
    pub fn mask(self) -> u8 {
        1u8 << self.bit_index()
    }

    /// Whether the flag byte precedes the probe record.
    pub fn is_negative(self) -> bool {
        self.0 & SIGN != 0
    }

    /// Absolute flag byte for a probe stored at `probe_offset`.
    pub fn target(self, probe_offset: usize) -> usize {
        let distance = (self.0 & MAGNITUDE) as usize;
        if self.is_negative() {
            probe_offset - distance
        } else {
            probe_offset + distance
        }
    }

    /// Read a word from the first four bytes of `bytes`.
    pub fn read(bytes: &[u8]) -> Self {
        let mut raw = [0u8; PROBE_RECORD_BYTES];
        raw.copy_from_slice(&bytes[..PROBE_RECORD_BYTES]);
        Self(u32::from_le_bytes(raw))
    }

    /// Write the word into the first four bytes of `out`.
    pub fn write(self, out: &mut [u8]) {
        out[..PROBE_RECORD_BYTES].copy_from_slice(&self.0.to_le_bytes());
    }
}

/// Live handle to one output's flag bit.
///
/// Cheap to clone. Valid only for the arena generation that issued it.
#[derive(Clone)]
pub struct Probe {
    slot: ArenaSlot,
    handle: RecordHandle,
}

impl Probe {
    pub(crate) fn new(slot: ArenaSlot, handle: RecordHandle) -> Self {
        Self { slot, handle }
    }

    /// Whether any input feeding this output pulsed since the last clear.
    pub fn is_set(&self) -> Result<bool, ArenaError> {
        let offset = self.handle.offset();
        self.slot.with_bytes(self.handle.generation, |bytes| {
            let word = ProbeWord::read(&bytes[offset..]);
            bytes[word.target(offset)] & word.mask() != 0
        })
    }

    /// Clear only this output's bit; neighbours in the same byte keep theirs.
    pub fn clear(&self) -> Result<(), ArenaError> {
        let offset = self.handle.offset();
        self.slot.with_bytes_mut(self.handle.generation, |bytes| {
            let word = ProbeWord::read(&bytes[offset..]);
            bytes[word.target(offset)] &= !word.mask();
        })
    }

    /// Latest pulse time across the inputs feeding this output.
    ///
    /// `Timestamp::ZERO` when none of them has pulsed.
    pub fn last_timestamp(&self) -> Result<Timestamp, ArenaError> {
        let offset = self.handle.offset();
        self.slot.with_arena(self.handle.generation, |arena| {
            match arena.layout().output_of_probe(offset) {
                Some(output) => arena
                    .fan_in()
                    .latest(output, arena.layout().sources, arena.bytes()),
                None => Timestamp::ZERO,
            }
        })
    }

    /// Dense index of the output this probe belongs to.
    pub fn output_index(&self) -> Result<usize, ArenaError> {
        let offset = self.handle.offset();
        self.slot.with_arena(self.handle.generation, |arena| {
            arena
                .layout()
                .output_of_probe(offset)
                .ok_or(ArenaError::RecordOutOfRange {
                    index: offset,
                    count: arena.layout().output_count,
                })
        })?
    }

    /// Decoded probe word.
    pub fn word(&self) -> Result<ProbeWord, ArenaError> {
        let offset = self.handle.offset();
        self.slot
            .with_bytes(self.handle.generation, |bytes| ProbeWord::read(&bytes[offset..]))
    }

    /// Render the watched flag byte and the probe mask as bit strings.
    pub fn describe(&self) -> Result<String, ArenaError> {
        let offset = self.handle.offset();
        self.slot.with_bytes(self.handle.generation, |bytes| {
            let word = ProbeWord::read(&bytes[offset..]);
            let target = word.target(offset);
            format!(
                "Flags: {}, Mask: {}",
                bits::serialize_bits(&bytes[target..=target]),
                bits::serialize_bits(&[word.mask()]),
            )
        })
    }

    /// Generation this handle was issued for.
    pub fn generation(&self) -> ArenaGeneration {
        self.handle.generation
    }

    /// Record location.
    pub fn handle(&self) -> RecordHandle {
        self.handle
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe").field("handle", &self.handle).finish()
    }
}
