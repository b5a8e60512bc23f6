//! Named endpoint registries.
//!
//! Both registries are insertion-ordered maps from endpoint name to the
//! endpoint's edge set and rebuild bookkeeping. Output bit indices are the
//! outputs' positions in their map, so they follow registration order and
//! close up when an output is removed. An endpoint is created by the first
//! edge that names it and removed with its last edge.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use pulseboard_arena::{ArenaError, MaskSpan, Probe, PulseSource};
use pulseboard_core::bits;

use crate::connection::SubscriptionId;
use crate::dispatch::Batch;
use crate::runtime::RuntimeBinding;
use crate::traits::{Callback, InputRef, OutputRef};

/// Outcome of removing one edge from an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EdgeRemoval {
    /// No such edge.
    Missing,
    /// Edge removed; the endpoint keeps other edges.
    Removed,
    /// Edge removed and the endpoint, now edgeless, was dropped.
    Disposed,
}

// ── Inputs ─────────────────────────────────────────────────────────

pub(crate) struct InputEntry {
    pub(crate) endpoint: InputRef,
    pub(crate) outputs: IndexSet<Rc<str>>,
    pub(crate) callbacks: IndexMap<SubscriptionId, Callback>,
    pub(crate) span: MaskSpan,
    pub(crate) mask: Vec<u8>,
    pub(crate) source: Option<PulseSource>,
    pub(crate) linked: Rc<[OutputRef]>,
    pub(crate) binding: Option<RuntimeBinding>,
}

impl InputEntry {
    fn new(endpoint: InputRef) -> Self {
        Self {
            endpoint,
            outputs: IndexSet::new(),
            callbacks: IndexMap::new(),
            span: MaskSpan::EMPTY,
            mask: Vec::new(),
            source: None,
            linked: Rc::from(Vec::new()),
            binding: None,
        }
    }

    /// Callbacks in subscription order, first occurrence of each `Rc` kept.
    pub(crate) fn compile_batch(&self) -> Batch {
        let mut compiled: Vec<Callback> = Vec::with_capacity(self.callbacks.len());
        for callback in self.callbacks.values() {
            if !compiled.iter().any(|c| Rc::ptr_eq(c, callback)) {
                compiled.push(Rc::clone(callback));
            }
        }
        Rc::from(compiled)
    }

    /// Drop the runtime binding (detaching the producer) and the source.
    pub(crate) fn detach(&mut self) {
        self.binding = None;
        self.source = None;
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.source.is_some()
    }
}

#[derive(Default)]
pub(crate) struct InputRegistry {
    entries: IndexMap<Rc<str>, InputEntry>,
}

impl InputRegistry {
    pub(crate) fn get_or_create(&mut self, endpoint: &InputRef) -> &mut InputEntry {
        let name: Rc<str> = Rc::from(endpoint.name());
        self.entries
            .entry(name)
            .or_insert_with(|| InputEntry::new(Rc::clone(endpoint)))
    }

    pub(crate) fn get(&self, name: &str) -> Option<&InputEntry> {
        self.entries.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut InputEntry> {
        self.entries.get_mut(name)
    }

    /// Register `output` on `input`; false if already present.
    pub(crate) fn add_edge(&mut self, input: &str, output: &str) -> bool {
        match self.entries.get_mut(input) {
            Some(entry) => entry.outputs.insert(Rc::from(output)),
            None => false,
        }
    }

    /// Unregister `output` from `input`.
    ///
    /// When the input is live and `live_bit` is the output's bit in the
    /// current arena, the bit is cleared from the input's mask right away so
    /// pulses stop reaching the output before the next rebuild.
    pub(crate) fn remove_edge(
        &mut self,
        input: &str,
        output: &str,
        live_bit: Option<usize>,
    ) -> Result<EdgeRemoval, ArenaError> {
        let Some(entry) = self.entries.get_mut(input) else {
            return Ok(EdgeRemoval::Missing);
        };
        if !entry.outputs.shift_remove(output) {
            return Ok(EdgeRemoval::Missing);
        }
        if let (Some(source), Some(bit)) = (entry.source.as_ref(), live_bit) {
            if entry.span.covers_bit(bit) {
                bits::clear_bit(&mut entry.mask, bit - entry.span.first_bit());
                source.update_mask(&entry.mask)?;
            }
        }
        if entry.outputs.is_empty() {
            self.entries.shift_remove(input);
            return Ok(EdgeRemoval::Disposed);
        }
        Ok(EdgeRemoval::Removed)
    }

    /// Compute each input's mask span and pattern from current output indices.
    pub(crate) fn prepare_indices(&mut self, outputs: &OutputRegistry) {
        for entry in self.entries.values_mut() {
            let InputEntry {
                outputs: edges,
                span,
                mask,
                ..
            } = entry;
            let indices = || edges.iter().filter_map(|o| outputs.index_of(o));
            *span = MaskSpan::covering(indices());
            span.fill_mask(indices(), mask);
        }
    }

    pub(crate) fn spans(&self) -> Vec<MaskSpan> {
        self.entries.values().map(|e| e.span).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &InputEntry)> {
        self.entries.iter()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut InputEntry> {
        self.entries.values_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

// ── Outputs ────────────────────────────────────────────────────────

pub(crate) struct OutputEntry {
    pub(crate) endpoint: OutputRef,
    pub(crate) inputs: IndexSet<Rc<str>>,
    /// Bit index in the live arena; `None` until the output is wired.
    pub(crate) live_bit: Option<usize>,
    pub(crate) probe: Option<Probe>,
    pub(crate) linked: Rc<[InputRef]>,
}

impl OutputEntry {
    fn new(endpoint: OutputRef) -> Self {
        Self {
            endpoint,
            inputs: IndexSet::new(),
            live_bit: None,
            probe: None,
            linked: Rc::from(Vec::new()),
        }
    }

    pub(crate) fn detach(&mut self) {
        self.probe = None;
        self.live_bit = None;
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.probe.is_some()
    }
}

#[derive(Default)]
pub(crate) struct OutputRegistry {
    entries: IndexMap<Rc<str>, OutputEntry>,
}

impl OutputRegistry {
    pub(crate) fn get_or_create(&mut self, endpoint: &OutputRef) -> &mut OutputEntry {
        let name: Rc<str> = Rc::from(endpoint.name());
        self.entries
            .entry(name)
            .or_insert_with(|| OutputEntry::new(Rc::clone(endpoint)))
    }

    pub(crate) fn get(&self, name: &str) -> Option<&OutputEntry> {
        self.entries.get(name)
    }

    /// Dense bit index the next rebuild assigns to `name`.
    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(name)
    }

    pub(crate) fn add_edge(&mut self, output: &str, input: &str) -> bool {
        match self.entries.get_mut(output) {
            Some(entry) => entry.inputs.insert(Rc::from(input)),
            None => false,
        }
    }

    pub(crate) fn remove_edge(&mut self, output: &str, input: &str) -> EdgeRemoval {
        let Some(entry) = self.entries.get_mut(output) else {
            return EdgeRemoval::Missing;
        };
        if !entry.inputs.shift_remove(input) {
            return EdgeRemoval::Missing;
        }
        if entry.inputs.is_empty() {
            self.entries.shift_remove(output);
            return EdgeRemoval::Disposed;
        }
        EdgeRemoval::Removed
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &OutputEntry)> {
        self.entries.iter()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut OutputEntry> {
        self.entries.values_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
