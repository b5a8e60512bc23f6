//! Per-input pulse sources.
//!
//! A source record lives in the arena's source table and describes which
//! flag bytes an input touches and where its private mask run is. Pulsing
//! ORs the mask into the flag bytes and stamps the record with the pulse
//! time. The OR loop works a machine word at a time and finishes the tail
//! byte by byte; the result is bit-identical to a plain byte loop.

use std::fmt;

use pulseboard_core::{bits, Timestamp};

use crate::arena::ArenaSlot;
use crate::error::ArenaError;
use crate::handle::{ArenaGeneration, RecordHandle};
use crate::layout::MAX_MASK_BYTES;

/// Size of one packed source record in bytes.
///
/// Little-endian, no padding:
///
/// | bytes   | field        |
/// |---------|--------------|
/// | 0..4    | `flag_start` (absolute, u32) |
/// | 4..8    | `mask_start` (absolute, u32) |
/// | 8..10   | `mask_len` (u16)             |
/// | 10..18  | `last_pulse` (u64 ticks)     |
pub const SOURCE_RECORD_BYTES: usize = 18;

const FLAG_START: std::ops::Range<usize> = 0..4;
const MASK_START: std::ops::Range<usize> = 4..8;
const MASK_LEN: std::ops::Range<usize> = 8..10;
const LAST_PULSE: std::ops::Range<usize> = 10..18;

const WORD: usize = std::mem::size_of::<u64>();

/// Decoded contents of a source record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceRecord {
    /// First flag byte the source touches, from the arena base.
    pub flag_start: u32,
    /// First byte of the source's mask run, from the arena base.
    pub mask_start: u32,
    /// Length of both the flag span and the mask run.
    pub mask_len: u16,
    /// Time of the most recent pulse, `Timestamp::ZERO` if none.
    pub last_pulse: Timestamp,
}

impl SourceRecord {
    /// Build a fresh record, rejecting lengths beyond the 16-bit field.
    pub fn initialize(
        flag_start: usize,
        mask_start: usize,
        mask_len: usize,
    ) -> Result<Self, ArenaError> {
        let mask_len = u16::try_from(mask_len).map_err(|_| ArenaError::MaskTooLong {
            len: mask_len,
            max: MAX_MASK_BYTES,
        })?;
        let to_u32 = |offset: usize| {
            u32::try_from(offset).map_err(|_| ArenaError::CapacityExceeded {
                requested: offset,
                capacity: u32::MAX as usize,
            })
        };
        Ok(Self {
            flag_start: to_u32(flag_start)?,
            mask_start: to_u32(mask_start)?,
            mask_len,
            last_pulse: Timestamp::ZERO,
        })
    }

    /// Read a record from the first [`SOURCE_RECORD_BYTES`] of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than a record.
    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            flag_start: u32::from_le_bytes(array(&bytes[FLAG_START])),
            mask_start: u32::from_le_bytes(array(&bytes[MASK_START])),
            mask_len: u16::from_le_bytes(array(&bytes[MASK_LEN])),
            last_pulse: Timestamp(u64::from_le_bytes(array(&bytes[LAST_PULSE]))),
        }
    }

    /// Write the record into the first [`SOURCE_RECORD_BYTES`] of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than a record.
    pub fn encode(&self, out: &mut [u8]) {
        out[FLAG_START].copy_from_slice(&self.flag_start.to_le_bytes());
        out[MASK_START].copy_from_slice(&self.mask_start.to_le_bytes());
        out[MASK_LEN].copy_from_slice(&self.mask_len.to_le_bytes());
        out[LAST_PULSE].copy_from_slice(&self.last_pulse.0.to_le_bytes());
    }

    /// Flag bytes this source ORs into.
    pub fn flag_range(&self) -> std::ops::Range<usize> {
        let start = self.flag_start as usize;
        start..start + self.mask_len as usize
    }

    /// The source's mask run.
    pub fn mask_range(&self) -> std::ops::Range<usize> {
        let start = self.mask_start as usize;
        start..start + self.mask_len as usize
    }
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// OR `mask` into `flags`, one `u64` at a time, then the tail bytewise.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn or_mask_into(flags: &mut [u8], mask: &[u8]) {
    assert_eq!(flags.len(), mask.len(), "flag span and mask differ in length");
    let mut flag_words = flags.chunks_exact_mut(WORD);
    let mut mask_words = mask.chunks_exact(WORD);
    for (f, m) in (&mut flag_words).zip(&mut mask_words) {
        let merged = u64::from_ne_bytes(array(f)) | u64::from_ne_bytes(array(m));
        f.copy_from_slice(&merged.to_ne_bytes());
    }
    for (f, m) in flag_words
        .into_remainder()
        .iter_mut()
        .zip(mask_words.remainder())
    {
        *f |= *m;
    }
}

/// Pulse the source record at `record` inside an arena's bytes.
pub(crate) fn pulse_record(bytes: &mut [u8], record: usize, at: Timestamp) {
    let rec_bytes = &mut bytes[record..record + SOURCE_RECORD_BYTES];
    rec_bytes[LAST_PULSE].copy_from_slice(&at.0.to_le_bytes());
    let rec = SourceRecord::decode(rec_bytes);
    if rec.mask_len == 0 {
        return;
    }
    let flags = rec.flag_range();
    let mask = rec.mask_range();
    // Mask runs always follow the flag region.
    debug_assert!(flags.end <= mask.start);
    let (head, tail) = bytes.split_at_mut(mask.start);
    or_mask_into(&mut head[flags], &tail[..mask.len()]);
}

/// Copy `pattern` into the mask run of the record at `record`.
pub(crate) fn write_mask(bytes: &mut [u8], record: usize, pattern: &[u8]) -> Result<(), ArenaError> {
    let rec = SourceRecord::decode(&bytes[record..record + SOURCE_RECORD_BYTES]);
    if pattern.len() != rec.mask_len as usize {
        return Err(ArenaError::MaskLengthMismatch {
            expected: rec.mask_len as usize,
            actual: pattern.len(),
        });
    }
    bytes[rec.mask_range()].copy_from_slice(pattern);
    Ok(())
}

/// Live handle to one input's source record.
///
/// Cheap to clone. Valid only for the arena generation that issued it.
#[derive(Clone)]
pub struct PulseSource {
    slot: ArenaSlot,
    handle: RecordHandle,
}

impl PulseSource {
    pub(crate) fn new(slot: ArenaSlot, handle: RecordHandle) -> Self {
        Self { slot, handle }
    }

    /// Set every flag this source's mask covers and record the pulse time.
    ///
    /// Touches only the source's own flag span and record; never allocates.
    pub fn pulse(&self, at: Timestamp) -> Result<(), ArenaError> {
        let offset = self.handle.offset();
        self.slot
            .with_bytes_mut(self.handle.generation, |bytes| pulse_record(bytes, offset, at))
    }

    /// Replace the mask run with an externally computed pattern.
    pub fn update_mask(&self, pattern: &[u8]) -> Result<(), ArenaError> {
        let offset = self.handle.offset();
        self.slot
            .with_bytes_mut(self.handle.generation, |bytes| write_mask(bytes, offset, pattern))?
    }

    /// Time of the most recent pulse, `Timestamp::ZERO` if none.
    pub fn last_pulse(&self) -> Result<Timestamp, ArenaError> {
        Ok(self.record()?.last_pulse)
    }

    /// Decoded record as currently stored.
    pub fn record(&self) -> Result<SourceRecord, ArenaError> {
        let offset = self.handle.offset();
        self.slot.with_bytes(self.handle.generation, |bytes| {
            SourceRecord::decode(&bytes[offset..offset + SOURCE_RECORD_BYTES])
        })
    }

    /// Render the covered flag bytes and the mask run as bit strings.
    pub fn describe(&self) -> Result<String, ArenaError> {
        let offset = self.handle.offset();
        self.slot.with_bytes(self.handle.generation, |bytes| {
            let rec = SourceRecord::decode(&bytes[offset..offset + SOURCE_RECORD_BYTES]);
            format!(
                "Flags: {}, Mask: {}",
                bits::serialize_bits(&bytes[rec.flag_range()]),
                bits::serialize_bits(&bytes[rec.mask_range()]),
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

impl fmt::Debug for PulseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PulseSource")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trip() {
        let mut rec = SourceRecord::initialize(40, 52, 3).unwrap();
        rec.last_pulse = Timestamp(99);
        let mut buf = [0u8; SOURCE_RECORD_BYTES];
        rec.encode(&mut buf);
        assert_eq!(SourceRecord::decode(&buf), rec);
        assert_eq!(rec.flag_range(), 40..43);
        assert_eq!(rec.mask_range(), 52..55);
    }

    #[test]
    fn initialize_rejects_16_bit_overflow() {
        let err = SourceRecord::initialize(0, 0, MAX_MASK_BYTES + 1).unwrap_err();
        assert!(matches!(err, ArenaError::MaskTooLong { len, .. } if len == MAX_MASK_BYTES + 1));
        assert!(SourceRecord::initialize(0, 0, MAX_MASK_BYTES).is_ok());
    }

    #[test]
    fn or_mask_sets_only_mask_bits() {
        let mut flags = [0b0000_0001, 0, 0];
        or_mask_into(&mut flags, &[0b1000_0000, 0, 0b0000_0010]);
        assert_eq!(flags, [0b1000_0001, 0, 0b0000_0010]);
    }

    #[test]
    fn or_mask_handles_word_and_tail() {
        let mut flags = vec![0u8; 19];
        let mask: Vec<u8> = (0..19).map(|i| 1u8 << (i % 8)).collect();
        or_mask_into(&mut flags, &mask);
        assert_eq!(flags, mask);
    }

    #[test]
    fn pulse_record_stamps_time_and_ors() {
        // [record 18][flags 4][mask 2]
        let mut bytes = vec![0u8; SOURCE_RECORD_BYTES + 4 + 2];
        let flags_at = SOURCE_RECORD_BYTES;
        let mask_at = flags_at + 4;
        SourceRecord::initialize(flags_at + 1, mask_at, 2)
            .unwrap()
            .encode(&mut bytes);
        bytes[mask_at] = 0b0101;
        bytes[mask_at + 1] = 0b1000_0000;

        pulse_record(&mut bytes, 0, Timestamp(7));

        assert_eq!(&bytes[flags_at..flags_at + 4], &[0, 0b0101, 0b1000_0000, 0]);
        assert_eq!(SourceRecord::decode(&bytes).last_pulse, Timestamp(7));
    }

    #[test]
    fn write_mask_rejects_length_mismatch() {
        let mut bytes = vec![0u8; SOURCE_RECORD_BYTES + 8];
        SourceRecord::initialize(SOURCE_RECORD_BYTES, SOURCE_RECORD_BYTES + 4, 2)
            .unwrap()
            .encode(&mut bytes);
        let err = write_mask(&mut bytes, 0, &[1, 2, 3]).unwrap_err();
        assert_eq!(err, ArenaError::MaskLengthMismatch { expected: 2, actual: 3 });
        write_mask(&mut bytes, 0, &[1, 2]).unwrap();
        assert_eq!(&bytes[SOURCE_RECORD_BYTES + 4..SOURCE_RECORD_BYTES + 6], &[1, 2]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn wide_or_matches_bytewise_or(
                pair in (0usize..80).prop_flat_map(|n| (
                    proptest::collection::vec(any::<u8>(), n),
                    proptest::collection::vec(any::<u8>(), n),
                )),
            ) {
                let (flags, mask) = pair;
                let mut wide = flags.clone();
                or_mask_into(&mut wide, &mask);
                let expected: Vec<u8> = flags.iter().zip(&mask).map(|(f, m)| f | m).collect();
                prop_assert_eq!(wide, expected);
            }
        }
    }
}
