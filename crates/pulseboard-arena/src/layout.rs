//! Memory-layout planning for a flag arena.
//!
//! Planning happens in two steps. First each input computes its
//! [`MaskSpan`] from the dense bit indices of the outputs it feeds; then
//! [`ArenaLayout::plan`] sums the four regions and places them back to back.
//! The plan is pure arithmetic: nothing is allocated until an
//! [`ArenaBuilder`](crate::ArenaBuilder) is created from it.

use pulseboard_core::bits;
use pulseboard_core::BITS_PER_BYTE;

use crate::error::ArenaError;
use crate::probe::PROBE_RECORD_BYTES;
use crate::source::SOURCE_RECORD_BYTES;

/// Largest mask run a source record can describe (16-bit length field).
pub const MAX_MASK_BYTES: usize = u16::MAX as usize;

/// Largest number of outputs one arena can index.
pub const MAX_OUTPUTS: usize = MAX_MASK_BYTES * BITS_PER_BYTE;

/// Alignment of the flag region length in bytes.
pub const FLAG_ALIGN: usize = 4;

/// Number of flag bytes needed for `output_count` outputs, 4-byte aligned.
pub fn flag_bytes_for(output_count: usize) -> usize {
    output_count.div_ceil(BITS_PER_BYTE).next_multiple_of(FLAG_ALIGN)
}

/// Contiguous byte range inside the arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    /// First byte, from the arena base.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Region {
    /// Region of `len` bytes at `start`.
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether `offset` falls inside the region.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }

    /// The region as a `Range<usize>` for slicing.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// Minimal byte-aligned run of flag bytes covering one input's outputs.
///
/// `flag_byte` is relative to the start of the flag region. The run covers
/// `floor(min / 8)` up to `ceil((max + 1) / 8)` of the dependent bit
/// indices, so the pulse loop only touches the bytes its fan-out spans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaskSpan {
    /// First covered flag byte.
    pub flag_byte: usize,
    /// Number of covered bytes.
    pub len: usize,
}

impl MaskSpan {
    /// Span of an input with no outputs.
    pub const EMPTY: Self = Self {
        flag_byte: 0,
        len: 0,
    };

    /// Smallest span covering every bit index in `indices`.
    pub fn covering(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut bounds: Option<(usize, usize)> = None;
        for idx in indices {
            bounds = Some(match bounds {
                None => (idx, idx),
                Some((lo, hi)) => (lo.min(idx), hi.max(idx)),
            });
        }
        match bounds {
            None => Self::EMPTY,
            Some((min, max)) => {
                let first = min / BITS_PER_BYTE;
                let last = max / BITS_PER_BYTE + 1;
                Self {
                    flag_byte: first,
                    len: last - first,
                }
            }
        }
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit index of the span's first bit.
    pub fn first_bit(&self) -> usize {
        self.flag_byte * BITS_PER_BYTE
    }

    /// Whether global bit `index` falls inside the span.
    pub fn covers_bit(&self, index: usize) -> bool {
        let first = self.first_bit();
        index >= first && index < first + self.len * BITS_PER_BYTE
    }

    /// Write the span's mask pattern for `indices` into `out`.
    ///
    /// `out` is resized to exactly `len` bytes and zeroed first, so the
    /// buffer can be reused across rebuilds.
    ///
    /// # Panics
    ///
    /// Panics if an index lies outside the span.
    pub fn fill_mask(&self, indices: impl IntoIterator<Item = usize>, out: &mut Vec<u8>) {
        out.clear();
        out.resize(self.len, 0);
        let first = self.first_bit();
        for idx in indices {
            bits::set_bit(out, idx - first);
        }
    }
}

/// Placement of the four arena regions for one topology generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaLayout {
    /// Number of source records (inputs).
    pub source_count: usize,
    /// Number of flag bits and probe records (outputs).
    pub output_count: usize,
    /// Source table.
    pub sources: Region,
    /// Flag bits, one per output.
    pub flags: Region,
    /// Concatenated mask runs, in source order.
    pub masks: Region,
    /// Probe table.
    pub probes: Region,
}

impl ArenaLayout {
    /// Plan an arena for `output_count` outputs and one source per span.
    ///
    /// Spans are validated against the 16-bit length limit and the flag
    /// region; the total must fit the 32-bit record offsets.
    pub fn plan(output_count: usize, spans: &[MaskSpan]) -> Result<Self, ArenaError> {
        if output_count > MAX_OUTPUTS {
            return Err(ArenaError::TooManyOutputs {
                outputs: output_count,
                max: MAX_OUTPUTS,
            });
        }

        let sources = Region::new(0, spans.len() * SOURCE_RECORD_BYTES);
        let flags = Region::new(sources.end(), flag_bytes_for(output_count));

        let mut mask_total = 0usize;
        for span in spans {
            if span.len > MAX_MASK_BYTES {
                return Err(ArenaError::MaskTooLong {
                    len: span.len,
                    max: MAX_MASK_BYTES,
                });
            }
            if span.flag_byte + span.len > flags.len {
                return Err(ArenaError::OutsideFlagRegion {
                    offset: flags.start + span.flag_byte + span.len,
                    start: flags.start,
                    end: flags.end(),
                });
            }
            mask_total += span.len;
        }

        let masks = Region::new(flags.end(), mask_total);
        let probes = Region::new(masks.end(), output_count * PROBE_RECORD_BYTES);

        if probes.end() > u32::MAX as usize {
            return Err(ArenaError::CapacityExceeded {
                requested: probes.end(),
                capacity: u32::MAX as usize,
            });
        }

        Ok(Self {
            source_count: spans.len(),
            output_count,
            sources,
            flags,
            masks,
            probes,
        })
    }

    /// Total arena size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.probes.end()
    }

    /// Byte offset of source record `index`.
    pub fn source_record(&self, index: usize) -> Result<usize, ArenaError> {
        if index >= self.source_count {
            return Err(ArenaError::RecordOutOfRange {
                index,
                count: self.source_count,
            });
        }
        Ok(self.sources.start + index * SOURCE_RECORD_BYTES)
    }

    /// Byte offset of the probe record for output `index`.
    pub fn probe_record(&self, index: usize) -> Result<usize, ArenaError> {
        if index >= self.output_count {
            return Err(ArenaError::RecordOutOfRange {
                index,
                count: self.output_count,
            });
        }
        Ok(self.probes.start + index * PROBE_RECORD_BYTES)
    }

    /// Output index owning the probe record at `offset`.
    pub fn output_of_probe(&self, offset: usize) -> Option<usize> {
        if !self.probes.contains(offset) {
            return None;
        }
        let rel = offset - self.probes.start;
        (rel % PROBE_RECORD_BYTES == 0).then_some(rel / PROBE_RECORD_BYTES)
    }

    /// Absolute flag byte holding output `index`'s bit, and its mask.
    pub fn flag_location(&self, index: usize) -> (usize, u8) {
        (
            self.flags.start + index / BITS_PER_BYTE,
            1u8 << (index % BITS_PER_BYTE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bytes_round_to_four() {
        assert_eq!(flag_bytes_for(0), 0);
        assert_eq!(flag_bytes_for(1), 4);
        assert_eq!(flag_bytes_for(32), 4);
        assert_eq!(flag_bytes_for(33), 8);
    }

    #[test]
    fn span_of_nothing_is_empty() {
        assert_eq!(MaskSpan::covering(std::iter::empty()), MaskSpan::EMPTY);
        assert!(MaskSpan::EMPTY.is_empty());
    }

    #[test]
    fn span_covers_min_to_max_bytes() {
        let span = MaskSpan::covering([9, 30, 17]);
        assert_eq!(span, MaskSpan { flag_byte: 1, len: 3 });
        assert!(span.covers_bit(8));
        assert!(span.covers_bit(31));
        assert!(!span.covers_bit(7));
        assert!(!span.covers_bit(32));
    }

    #[test]
    fn span_single_bit_boundaries() {
        assert_eq!(MaskSpan::covering([7]), MaskSpan { flag_byte: 0, len: 1 });
        assert_eq!(MaskSpan::covering([8]), MaskSpan { flag_byte: 1, len: 1 });
    }

    #[test]
    fn fill_mask_is_relative_to_span() {
        let span = MaskSpan::covering([9, 17]);
        let mut out = vec![0xFF; 10];
        span.fill_mask([9, 17], &mut out);
        assert_eq!(out, vec![0b0000_0010, 0b0000_0010]);
    }

    #[test]
    fn plan_places_regions_back_to_back() {
        let spans = [MaskSpan::covering([0, 1]), MaskSpan::covering([10])];
        let layout = ArenaLayout::plan(12, &spans).unwrap();
        assert_eq!(layout.sources, Region::new(0, 2 * SOURCE_RECORD_BYTES));
        assert_eq!(layout.flags.start, layout.sources.end());
        assert_eq!(layout.flags.len, 4);
        assert_eq!(layout.masks.start, layout.flags.end());
        assert_eq!(layout.masks.len, 2);
        assert_eq!(layout.probes.start, layout.masks.end());
        assert_eq!(layout.probes.len, 12 * PROBE_RECORD_BYTES);
        assert_eq!(layout.total_bytes(), layout.probes.end());
    }

    #[test]
    fn plan_rejects_too_many_outputs() {
        let err = ArenaLayout::plan(MAX_OUTPUTS + 1, &[]).unwrap_err();
        assert!(matches!(err, ArenaError::TooManyOutputs { .. }));
    }

    #[test]
    fn plan_rejects_long_mask() {
        let span = MaskSpan {
            flag_byte: 0,
            len: MAX_MASK_BYTES + 1,
        };
        let err = ArenaLayout::plan(MAX_OUTPUTS, &[span]).unwrap_err();
        assert!(matches!(err, ArenaError::MaskTooLong { .. }));
    }

    #[test]
    fn plan_rejects_span_past_flags() {
        let span = MaskSpan {
            flag_byte: 3,
            len: 2,
        };
        let err = ArenaLayout::plan(8, &[span]).unwrap_err();
        assert!(matches!(err, ArenaError::OutsideFlagRegion { .. }));
    }

    #[test]
    fn record_lookups() {
        let layout = ArenaLayout::plan(3, &[MaskSpan::covering([0, 2])]).unwrap();
        assert_eq!(layout.source_record(0).unwrap(), 0);
        assert!(layout.source_record(1).is_err());
        let p2 = layout.probe_record(2).unwrap();
        assert_eq!(layout.output_of_probe(p2), Some(2));
        assert_eq!(layout.output_of_probe(p2 + 1), None);
        assert!(layout.probe_record(3).is_err());
        assert_eq!(layout.flag_location(2), (layout.flags.start, 0b100));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn span_is_minimal_and_covering(
                indices in proptest::collection::vec(0usize..4096, 1..64),
            ) {
                let span = MaskSpan::covering(indices.iter().copied());
                let min = *indices.iter().min().unwrap();
                let max = *indices.iter().max().unwrap();
                for &i in &indices {
                    prop_assert!(span.covers_bit(i));
                }
                // Minimal: first byte holds the min, last byte holds the max.
                prop_assert_eq!(span.flag_byte, min / BITS_PER_BYTE);
                prop_assert_eq!(span.flag_byte + span.len - 1, max / BITS_PER_BYTE);
            }

            #[test]
            fn fill_mask_sets_exactly_the_indices(
                indices in proptest::collection::btree_set(0usize..512, 1..32),
            ) {
                let span = MaskSpan::covering(indices.iter().copied());
                let mut out = Vec::new();
                span.fill_mask(indices.iter().copied(), &mut out);
                let set: usize = out.iter().map(|b| b.count_ones() as usize).sum();
                prop_assert_eq!(set, indices.len());
                for &i in &indices {
                    prop_assert!(bits::bit_at(&out, i - span.first_bit()));
                }
            }
        }
    }
}
