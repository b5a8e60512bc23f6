//! Board-level error type.

use std::error::Error;
use std::fmt;

use pulseboard_arena::ArenaError;

use crate::config::ConfigError;

/// Errors from building or driving a [`RelayBoard`](crate::RelayBoard).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardError {
    /// More outputs are registered than the board may index.
    ///
    /// Raised by `initialize` before anything is allocated; the board is
    /// left uninitialized and can be initialized again once outputs are
    /// removed.
    CapacityOverflow {
        /// Registered outputs.
        outputs: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// Arena planning, construction or access failed.
    Arena(ArenaError),
    /// The board configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow { outputs, max } => {
                write!(f, "max output capacity reached: max={max} outputs={outputs}")
            }
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::CapacityOverflow { .. } => None,
        }
    }
}

impl From<ArenaError> for BoardError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

impl From<ConfigError> for BoardError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_message_names_both_counts() {
        let e = BoardError::CapacityOverflow {
            outputs: 524_281,
            max: 524_280,
        };
        assert_eq!(
            e.to_string(),
            "max output capacity reached: max=524280 outputs=524281"
        );
        assert!(e.source().is_none());
    }

    #[test]
    fn arena_errors_convert_and_chain() {
        let e: BoardError = ArenaError::Busy.into();
        assert_eq!(e, BoardError::Arena(ArenaError::Busy));
        assert!(e.source().is_some());
    }
}
