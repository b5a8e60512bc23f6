//! Arena size breakdown.

use std::fmt;

use pulseboard_arena::{ArenaGeneration, FlagArena};

/// Byte breakdown of the live arena, for diagnostics only.
///
/// The `Display` text is meant for humans and may change between releases.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaReport {
    /// Generation described, `None` when no arena is installed.
    pub generation: Option<ArenaGeneration>,
    /// Source records.
    pub inputs: usize,
    /// Flag bits and probe records.
    pub outputs: usize,
    /// Input → output links.
    pub edges: usize,
    /// Source table bytes.
    pub source_bytes: usize,
    /// Flag region bytes.
    pub flag_bytes: usize,
    /// Mask run bytes.
    pub mask_bytes: usize,
    /// Probe table bytes.
    pub probe_bytes: usize,
    /// Fan-in table heap bytes.
    pub fan_in_bytes: usize,
}

impl ArenaReport {
    /// Describe `arena`.
    pub fn of(arena: &FlagArena) -> Self {
        let layout = arena.layout();
        Self {
            generation: Some(arena.generation()),
            inputs: layout.source_count,
            outputs: layout.output_count,
            edges: arena.fan_in().edge_count(),
            source_bytes: layout.sources.len,
            flag_bytes: layout.flags.len,
            mask_bytes: layout.masks.len,
            probe_bytes: layout.probes.len,
            fan_in_bytes: arena.fan_in().memory_bytes(),
        }
    }

    /// Arena block size: the four regions together.
    pub fn total_bytes(&self) -> usize {
        self.source_bytes + self.flag_bytes + self.mask_bytes + self.probe_bytes
    }
}

fn kb(bytes: usize) -> f64 {
    bytes as f64 / 1000.0
}

impl fmt::Display for ArenaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(generation) = self.generation else {
            return writeln!(f, "=== No arena");
        };
        writeln!(
            f,
            "=== Initialize (generation {generation}: {} inputs, {} outputs, {} edges)",
            self.inputs, self.outputs, self.edges
        )?;
        writeln!(f, "Flags         Size: {} Ko", kb(self.flag_bytes))?;
        writeln!(f, "PulseProbe    Size: {} Ko", kb(self.probe_bytes))?;
        writeln!(f, "PulseSource   Size: {} Ko", kb(self.source_bytes))?;
        writeln!(f, "PulseMasks    Size: {} Ko", kb(self.mask_bytes))?;
        writeln!(f, "FanIn         Size: {} Ko", kb(self.fan_in_bytes))?;
        writeln!(f, "--------------------------------")?;
        writeln!(f, "Total         Size: {} Ko", kb(self.total_bytes()))?;
        writeln!(f, "===")
    }
}
