//! Fan-in tables for per-output timestamp queries.
//!
//! An output's "last timestamp" is the latest pulse across the inputs that
//! feed it. The table stores each output's feeding source indices in one
//! compressed-row block, so a query costs O(fan-in) and the whole table is
//! two flat vectors.

use pulseboard_core::Timestamp;
use smallvec::SmallVec;

use crate::layout::Region;
use crate::source::{SourceRecord, SOURCE_RECORD_BYTES};

/// Accumulates `(output, source)` links before freezing them into a table.
#[derive(Clone, Debug, Default)]
pub struct FanInBuilder {
    lists: Vec<SmallVec<[u32; 4]>>,
}

impl FanInBuilder {
    /// Builder for `output_count` outputs with no links.
    pub fn new(output_count: usize) -> Self {
        Self {
            lists: vec![SmallVec::new(); output_count],
        }
    }

    /// Record that source `source` feeds `output`.
    ///
    /// # Panics
    ///
    /// Panics if `output` is out of range.
    pub fn link(&mut self, output: usize, source: u32) {
        self.lists[output].push(source);
    }

    /// Freeze into a compressed-row table.
    pub fn build(self) -> FanInTable {
        let mut starts = Vec::with_capacity(self.lists.len() + 1);
        let mut sources = Vec::with_capacity(self.lists.iter().map(|l| l.len()).sum());
        starts.push(0);
        for list in &self.lists {
            sources.extend_from_slice(list);
            starts.push(sources.len() as u32);
        }
        FanInTable { starts, sources }
    }
}

/// Frozen output → feeding-sources table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FanInTable {
    starts: Vec<u32>,
    sources: Vec<u32>,
}

impl FanInTable {
    /// Source indices feeding `output`; empty if out of range.
    pub fn sources_of(&self, output: usize) -> &[u32] {
        match (self.starts.get(output), self.starts.get(output + 1)) {
            (Some(&lo), Some(&hi)) => &self.sources[lo as usize..hi as usize],
            _ => &[],
        }
    }

    /// Latest `last_pulse` among the sources feeding `output`.
    pub fn latest(&self, output: usize, sources: Region, bytes: &[u8]) -> Timestamp {
        self.sources_of(output)
            .iter()
            .map(|&src| {
                let at = sources.start + src as usize * SOURCE_RECORD_BYTES;
                SourceRecord::decode(&bytes[at..at + SOURCE_RECORD_BYTES]).last_pulse
            })
            .max()
            .unwrap_or(Timestamp::ZERO)
    }

    /// Number of outputs covered.
    pub fn output_count(&self) -> usize {
        self.starts.len().saturating_sub(1)
    }

    /// Total number of links.
    pub fn edge_count(&self) -> usize {
        self.sources.len()
    }

    /// Heap bytes held by the table.
    pub fn memory_bytes(&self) -> usize {
        (self.starts.capacity() + self.sources.capacity()) * std::mem::size_of::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_has_no_sources() {
        let table = FanInTable::default();
        assert_eq!(table.sources_of(0), &[] as &[u32]);
        assert_eq!(table.output_count(), 0);
        assert_eq!(table.latest(0, Region::default(), &[]), Timestamp::ZERO);
    }

    #[test]
    fn build_groups_by_output() {
        let mut b = FanInBuilder::new(3);
        b.link(2, 0);
        b.link(0, 1);
        b.link(2, 1);
        let table = b.build();
        assert_eq!(table.output_count(), 3);
        assert_eq!(table.edge_count(), 3);
        assert_eq!(table.sources_of(0), &[1]);
        assert_eq!(table.sources_of(1), &[] as &[u32]);
        assert_eq!(table.sources_of(2), &[0, 1]);
        assert_eq!(table.sources_of(3), &[] as &[u32]);
    }

    #[test]
    fn latest_takes_max_over_sources() {
        let mut bytes = vec![0u8; 3 * SOURCE_RECORD_BYTES];
        for (i, t) in [5u64, 11, 2].into_iter().enumerate() {
            let mut rec = SourceRecord::initialize(0, 0, 0).unwrap();
            rec.last_pulse = Timestamp(t);
            rec.encode(&mut bytes[i * SOURCE_RECORD_BYTES..]);
        }
        let region = Region::new(0, bytes.len());
        let mut b = FanInBuilder::new(2);
        b.link(0, 0);
        b.link(0, 2);
        b.link(1, 1);
        let table = b.build();
        assert_eq!(table.latest(0, region, &bytes), Timestamp(5));
        assert_eq!(table.latest(1, region, &bytes), Timestamp(11));
    }
}
