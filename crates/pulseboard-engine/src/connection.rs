//! Connection keys and subscription ids.
//!
//! A [`Connection`] is a plain key naming one directed edge. The board keeps
//! the edge's state; the key stays valid as a lookup after the edge is
//! disconnected, where every operation on it becomes a no-op.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

/// Directed edge from one input to one output, keyed by their names.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Connection {
    input: Rc<str>,
    output: Rc<str>,
}

impl Connection {
    pub(crate) fn new(input: &str, output: &str) -> Self {
        Self {
            input: Rc::from(input),
            output: Rc::from(output),
        }
    }

    /// Name of the producing input.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Name of the subscribing output.
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.input, self.output)
    }
}

/// Identifies one callback registered through a connection.
///
/// Ids are handed out in increasing order per board; batches run callbacks
/// in id order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Board-side state of a live connection.
#[derive(Debug, Default)]
pub(crate) struct ConnectorState {
    pub(crate) subscriptions: SmallVec<[SubscriptionId; 2]>,
}
