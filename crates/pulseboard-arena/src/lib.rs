//! Bit-packed flag arena, pulse sources and probes for Pulseboard.
//!
//! One topology generation lives in a single contiguous byte block, laid
//! out once per rebuild and never resized while live:
//!
//! ```text
//! FlagArena
//! ├── source table   SOURCE_RECORD_BYTES × inputs   (flag span, mask span, last pulse)
//! ├── flag bits      ceil(outputs / 8), 4-byte aligned
//! ├── mask runs      one minimal byte run per input
//! └── probe table    PROBE_RECORD_BYTES × outputs  (packed self-relative word)
//! ```
//!
//! The arena sits in an [`ArenaSlot`] shared with every handle it issues.
//! [`PulseSource`] and [`Probe`] are small `(slot, generation, record)`
//! triples: each access checks the generation against the live arena, so a
//! handle from a previous rebuild fails with
//! [`ArenaError::StaleHandle`] instead of touching reused memory.
//!
//! Everything here is single-threaded. Handles are `!Send`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod error;
pub mod handle;
pub mod layout;
pub mod metrics;
pub mod probe;
pub mod source;

pub use arena::{ArenaBuilder, ArenaSlot, FlagArena};
pub use error::ArenaError;
pub use handle::{ArenaGeneration, RecordHandle};
pub use layout::{ArenaLayout, MaskSpan, Region, MAX_MASK_BYTES, MAX_OUTPUTS};
pub use metrics::FanInTable;
pub use probe::{Probe, ProbeWord, PROBE_RECORD_BYTES};
pub use source::{PulseSource, SourceRecord, SOURCE_RECORD_BYTES};
