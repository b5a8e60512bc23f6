//! Strongly-typed time values.

use std::fmt;

/// Point in time carried by a pulse, in caller-defined ticks.
///
/// The engine never reads a clock: producers stamp each pulse and `poll`
/// receives `now` from the caller. `Timestamp::ZERO` doubles as
/// "never pulsed" in aggregate queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The earliest representable timestamp.
    pub const ZERO: Self = Self(0);

    /// Raw tick count.
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Timestamp `delta` ticks later, saturating at `u64::MAX`.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_default_and_minimum() {
        assert_eq!(Timestamp::default(), Timestamp::ZERO);
        assert!(Timestamp::ZERO < Timestamp(1));
    }

    #[test]
    fn advance_saturates() {
        assert_eq!(Timestamp(5).advance(3), Timestamp(8));
        assert_eq!(Timestamp(u64::MAX).advance(1), Timestamp(u64::MAX));
    }

    #[test]
    fn display_prefixes_ticks() {
        assert_eq!(Timestamp(42).to_string(), "t42");
    }
}
