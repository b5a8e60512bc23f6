//! Seeded topologies and a reference model of flag propagation.
//!
//! - [`Topology::random`] wires inputs to outputs with a fixed edge density.
//! - [`Topology::triangular`] wires output `i` to inputs `0..=i`.
//! - [`Topology::expected_flags`] computes which outputs a set of notified
//!   inputs should flag, independently of the arena.

use std::rc::Rc;

use pulseboard_core::bits;
use pulseboard_engine::{BoardError, Connection, RelayBoard};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{MockInput, MockOutput};

/// Mock endpoints plus the edge list they were wired with.
pub struct Topology {
    pub inputs: Vec<Rc<MockInput>>,
    pub outputs: Vec<Rc<MockOutput>>,
    /// `(input, output)` index pairs, deduplicated, in connect order.
    pub edges: Vec<(usize, usize)>,
}

impl Topology {
    fn endpoints(inputs: usize, outputs: usize) -> (Vec<Rc<MockInput>>, Vec<Rc<MockOutput>>) {
        (
            (0..inputs).map(|i| MockInput::new(format!("in{i}"))).collect(),
            (0..outputs).map(|o| MockOutput::new(format!("out{o}"))).collect(),
        )
    }

    /// Each `(input, output)` pair is an edge with probability `density`.
    ///
    /// Every output gets at least one edge so it survives registration.
    pub fn random(seed: u64, inputs: usize, outputs: usize, density: f64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (input_mocks, output_mocks) = Self::endpoints(inputs, outputs);
        let mut edges = Vec::new();
        for output in 0..outputs {
            let before = edges.len();
            for input in 0..inputs {
                if rng.random_bool(density) {
                    edges.push((input, output));
                }
            }
            if edges.len() == before && inputs > 0 {
                edges.push((rng.random_range(0..inputs), output));
            }
        }
        Self {
            inputs: input_mocks,
            outputs: output_mocks,
            edges,
        }
    }

    /// Output `i` linked to inputs `0..=i` (one input per output).
    pub fn triangular(size: usize) -> Self {
        let (inputs, outputs) = Self::endpoints(size, size);
        let edges = (0..size)
            .flat_map(|output| (0..=output).map(move |input| (input, output)))
            .collect();
        Self {
            inputs,
            outputs,
            edges,
        }
    }

    /// Connect every edge on `board`, in edge order.
    pub fn connect_all(&self, board: &mut RelayBoard) -> Result<Vec<Connection>, BoardError> {
        let mut connections = Vec::with_capacity(self.edges.len());
        for &(input, output) in &self.edges {
            let input = self.inputs[input].handle();
            let output = self.outputs[output].handle();
            if let Some(connection) = board.connect(&input, &output)? {
                connections.push(connection);
            }
        }
        Ok(connections)
    }

    /// Flags each output should show after `notified` inputs fire.
    pub fn expected_flags(&self, notified: &[usize]) -> Vec<bool> {
        let mut flags = vec![false; self.outputs.len()];
        for &(input, output) in &self.edges {
            if notified.contains(&input) {
                flags[output] = true;
            }
        }
        flags
    }

    /// Flags the mock outputs currently read.
    pub fn observed_flags(&self) -> Vec<bool> {
        self.outputs.iter().map(|o| o.is_flagged()).collect()
    }

    /// Observed flags as a `0`/`1` string, output 0 first.
    pub fn flag_string(&self) -> String {
        bits::serialize_bools(&self.observed_flags())
    }

    pub fn reset_all(&self) {
        for output in &self.outputs {
            output.reset();
        }
    }
}
