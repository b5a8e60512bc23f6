//! Board counters.
//!
//! [`BoardMetrics`] is updated in place by rebuilds and polls. Durations are
//! in microseconds; counts are cumulative over the board's lifetime.

/// Rebuild and dispatch counters for one board.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardMetrics {
    /// Successful arena rebuilds.
    pub rebuilds: u64,
    /// Wall-clock time of the most recent rebuild, in microseconds.
    pub last_rebuild_us: u64,
    /// Bytes held by the live arena, zero when none is installed.
    pub arena_bytes: usize,
    /// Calls to `poll`, including empty ones.
    pub polls: u64,
    /// Callback batches run by `poll`.
    pub dispatched_batches: u64,
    /// Pending batches discarded because a rebuild reset the queue.
    pub dropped_batches: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = BoardMetrics::default();
        assert_eq!(m.rebuilds, 0);
        assert_eq!(m.last_rebuild_us, 0);
        assert_eq!(m.arena_bytes, 0);
        assert_eq!(m.polls, 0);
        assert_eq!(m.dispatched_batches, 0);
        assert_eq!(m.dropped_batches, 0);
    }
}
