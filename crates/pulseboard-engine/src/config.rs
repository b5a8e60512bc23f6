//! Board configuration, validation, and error types.
//!
//! [`BoardConfig`] is the builder-input for
//! [`RelayBoard::with_config`](crate::RelayBoard::with_config).
//! [`validate()`](BoardConfig::validate) rejects values the arena cannot
//! honour before the board is constructed.

use std::error::Error;
use std::fmt;

use pulseboard_arena::MAX_OUTPUTS;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`BoardConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_outputs` is zero.
    NoOutputs,
    /// `max_outputs` exceeds what the 16-bit mask length can address.
    OutputCeilingTooHigh {
        /// The configured ceiling.
        configured: usize,
        /// The hard limit.
        limit: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOutputs => write!(f, "max_outputs must be at least 1"),
            Self::OutputCeilingTooHigh { configured, limit } => {
                write!(f, "max_outputs {configured} exceeds hard limit {limit}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── BoardConfig ────────────────────────────────────────────────────

/// Tunables for a [`RelayBoard`](crate::RelayBoard).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    /// Largest number of outputs `initialize` accepts.
    /// Default and maximum: [`MAX_OUTPUTS`] (524 280).
    pub max_outputs: usize,
    /// Minimum dispatch queue capacity kept across rebuilds. The queue is
    /// always sized to at least the input count. Default: 16.
    pub initial_queue_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            max_outputs: MAX_OUTPUTS,
            initial_queue_capacity: 16,
        }
    }
}

impl BoardConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_outputs == 0 {
            return Err(ConfigError::NoOutputs);
        }
        if self.max_outputs > MAX_OUTPUTS {
            return Err(ConfigError::OutputCeilingTooHigh {
                configured: self.max_outputs,
                limit: MAX_OUTPUTS,
            });
        }
        Ok(())
    }
}
