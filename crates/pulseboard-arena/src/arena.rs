//! The flag arena, its builder, and the shared slot handles point into.
//!
//! An [`ArenaBuilder`] allocates the whole block once from an
//! [`ArenaLayout`], writes source records, mask runs and probe words, and
//! collects fan-in links. [`ArenaSlot::install`] freezes it into a
//! [`FlagArena`] under a fresh [`ArenaGeneration`]; handles minted afterwards
//! carry that generation and are rejected once the slot moves on.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::ArenaError;
use crate::handle::{ArenaGeneration, RecordHandle};
use crate::layout::{ArenaLayout, MaskSpan};
use crate::metrics::{FanInBuilder, FanInTable};
use crate::probe::{Probe, ProbeWord, PROBE_RECORD_BYTES};
use crate::source::{PulseSource, SourceRecord, SOURCE_RECORD_BYTES};

// ── FlagArena ───────────────────────────────────────────────────

/// One installed topology generation.
pub struct FlagArena {
    generation: ArenaGeneration,
    layout: ArenaLayout,
    bytes: Box<[u8]>,
    fan_in: FanInTable,
}

impl FlagArena {
    /// Generation under which the arena was installed.
    pub fn generation(&self) -> ArenaGeneration {
        self.generation
    }

    /// Region placement.
    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    /// The raw block.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The flag region only.
    pub fn flags(&self) -> &[u8] {
        &self.bytes[self.layout.flags.range()]
    }

    /// Output → feeding sources.
    pub fn fan_in(&self) -> &FanInTable {
        &self.fan_in
    }

    /// Bytes held by the block plus the fan-in table.
    pub fn memory_bytes(&self) -> usize {
        self.bytes.len() + self.fan_in.memory_bytes()
    }
}

impl fmt::Debug for FlagArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagArena")
            .field("generation", &self.generation)
            .field("layout", &self.layout)
            .field("fan_in_edges", &self.fan_in.edge_count())
            .finish()
    }
}

// ── ArenaBuilder ────────────────────────────────────────────────

/// Writes one arena generation before it is installed.
pub struct ArenaBuilder {
    layout: ArenaLayout,
    bytes: Box<[u8]>,
    mask_cursor: usize,
    fan_in: FanInBuilder,
}

impl ArenaBuilder {
    /// Allocate a zeroed block sized by `layout`.
    pub fn new(layout: ArenaLayout) -> Self {
        let bytes = vec![0u8; layout.total_bytes()].into_boxed_slice();
        let mask_cursor = layout.masks.start;
        let fan_in = FanInBuilder::new(layout.output_count);
        Self {
            layout,
            bytes,
            mask_cursor,
            fan_in,
        }
    }

    /// Region placement being written.
    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    /// Write source record `input` with its span and initial mask bits.
    ///
    /// Mask runs are handed out sequentially from the mask region. Returns
    /// the record's byte offset.
    pub fn install_source(
        &mut self,
        input: usize,
        span: MaskSpan,
        mask_bits: &[u8],
    ) -> Result<usize, ArenaError> {
        let record = self.layout.source_record(input)?;
        if mask_bits.len() != span.len {
            return Err(ArenaError::MaskLengthMismatch {
                expected: span.len,
                actual: mask_bits.len(),
            });
        }
        let mask_start = self.mask_cursor;
        if mask_start + span.len > self.layout.masks.end() {
            return Err(ArenaError::CapacityExceeded {
                requested: mask_start + span.len - self.layout.masks.start,
                capacity: self.layout.masks.len,
            });
        }
        let flag_start = self.layout.flags.start + span.flag_byte;
        SourceRecord::initialize(flag_start, mask_start, span.len)?
            .encode(&mut self.bytes[record..record + SOURCE_RECORD_BYTES]);
        self.bytes[mask_start..mask_start + span.len].copy_from_slice(mask_bits);
        self.mask_cursor += span.len;
        Ok(record)
    }

    /// Write the probe word for `output`. Returns the record's byte offset.
    pub fn install_probe(&mut self, output: usize) -> Result<usize, ArenaError> {
        let record = self.layout.probe_record(output)?;
        let (flag_byte, mask) = self.layout.flag_location(output);
        ProbeWord::encode(record, flag_byte, mask, self.layout.flags)?
            .write(&mut self.bytes[record..record + PROBE_RECORD_BYTES]);
        Ok(record)
    }

    /// Record that `input` feeds `output` for timestamp queries.
    pub fn link_fan_in(&mut self, input: usize, output: usize) -> Result<(), ArenaError> {
        if input >= self.layout.source_count {
            return Err(ArenaError::RecordOutOfRange {
                index: input,
                count: self.layout.source_count,
            });
        }
        if output >= self.layout.output_count {
            return Err(ArenaError::RecordOutOfRange {
                index: output,
                count: self.layout.output_count,
            });
        }
        // Fits: the planner caps the source table below u32::MAX bytes.
        self.fan_in.link(output, input as u32);
        Ok(())
    }

    fn finish(self, generation: ArenaGeneration) -> FlagArena {
        FlagArena {
            generation,
            layout: self.layout,
            bytes: self.bytes,
            fan_in: self.fan_in.build(),
        }
    }
}

// ── ArenaSlot ───────────────────────────────────────────────────

#[derive(Default)]
struct SlotState {
    live: Option<FlagArena>,
    next_generation: u32,
}

/// Shared home of the live arena.
///
/// Cloning shares the slot. Every access goes through a generation check
/// and a `RefCell` borrow; re-entrant access reports [`ArenaError::Busy`].
#[derive(Clone, Default)]
pub struct ArenaSlot(Rc<RefCell<SlotState>>);

impl ArenaSlot {
    /// Empty slot with no arena installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze `builder` and make it the live arena, dropping the previous
    /// one. Returns the new generation.
    pub fn install(&self, builder: ArenaBuilder) -> Result<ArenaGeneration, ArenaError> {
        let mut state = self.0.try_borrow_mut().map_err(|_| ArenaError::Busy)?;
        let generation = ArenaGeneration(state.next_generation);
        state.next_generation = state.next_generation.wrapping_add(1);
        state.live = Some(builder.finish(generation));
        Ok(generation)
    }

    /// Drop the live arena. Outstanding handles turn stale.
    pub fn release(&self) -> Result<Option<ArenaGeneration>, ArenaError> {
        let mut state = self.0.try_borrow_mut().map_err(|_| ArenaError::Busy)?;
        Ok(state.live.take().map(|arena| arena.generation))
    }

    /// Generation of the live arena, if any.
    pub fn live_generation(&self) -> Option<ArenaGeneration> {
        self.0
            .try_borrow()
            .ok()
            .and_then(|state| state.live.as_ref().map(FlagArena::generation))
    }

    /// Bytes held by the live arena, zero if none.
    pub fn memory_bytes(&self) -> usize {
        self.0
            .try_borrow()
            .ok()
            .and_then(|state| state.live.as_ref().map(FlagArena::memory_bytes))
            .unwrap_or(0)
    }

    /// Handle to source record `input` of `generation`.
    pub fn source(
        &self,
        generation: ArenaGeneration,
        input: usize,
    ) -> Result<PulseSource, ArenaError> {
        let offset = self.with_arena(generation, |arena| arena.layout.source_record(input))??;
        Ok(PulseSource::new(
            self.clone(),
            RecordHandle::new(generation, offset as u32),
        ))
    }

    /// Handle to the probe for `output` in `generation`.
    pub fn probe(&self, generation: ArenaGeneration, output: usize) -> Result<Probe, ArenaError> {
        let offset = self.with_arena(generation, |arena| arena.layout.probe_record(output))??;
        Ok(Probe::new(
            self.clone(),
            RecordHandle::new(generation, offset as u32),
        ))
    }

    /// Run `f` against the live arena if it matches `generation`.
    pub fn with_arena<R>(
        &self,
        generation: ArenaGeneration,
        f: impl FnOnce(&FlagArena) -> R,
    ) -> Result<R, ArenaError> {
        let state = self.0.try_borrow().map_err(|_| ArenaError::Busy)?;
        match state.live.as_ref() {
            Some(arena) if arena.generation == generation => Ok(f(arena)),
            live => Err(ArenaError::StaleHandle {
                handle_generation: generation,
                live: live.map(FlagArena::generation),
            }),
        }
    }

    pub(crate) fn with_bytes<R>(
        &self,
        generation: ArenaGeneration,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, ArenaError> {
        self.with_arena(generation, |arena| f(&arena.bytes))
    }

    pub(crate) fn with_bytes_mut<R>(
        &self,
        generation: ArenaGeneration,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, ArenaError> {
        let mut state = self.0.try_borrow_mut().map_err(|_| ArenaError::Busy)?;
        match state.live.as_mut() {
            Some(arena) if arena.generation == generation => Ok(f(&mut arena.bytes)),
            live => Err(ArenaError::StaleHandle {
                handle_generation: generation,
                live: live.map(|a| a.generation),
            }),
        }
    }
}

impl fmt::Debug for ArenaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaSlot")
            .field("live", &self.live_generation())
            .finish()
    }
}
