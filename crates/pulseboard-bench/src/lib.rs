//! Benchmark profiles for the Pulseboard pulse-propagation engine.
//!
//! A [`BenchProfile`] fixes the graph shape; [`BenchProfile::edges`] turns it
//! into a deterministic edge list for a seed:
//!
//! - [`reference_profile`]: 200 inputs × 2,000 outputs, 2% density
//! - [`stress_profile`]: 1,000 inputs × 100,000 outputs, 0.05% density

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Shape of a benchmark topology.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BenchProfile {
    /// Number of producers.
    pub inputs: usize,
    /// Number of subscribers.
    pub outputs: usize,
    /// Probability that a given input feeds a given output.
    pub density: f64,
}

/// Mid-sized graph matching a typical simulation tick.
pub fn reference_profile() -> BenchProfile {
    BenchProfile {
        inputs: 200,
        outputs: 2_000,
        density: 0.02,
    }
}

/// Wide, sparse graph close to the arena's output ceiling.
pub fn stress_profile() -> BenchProfile {
    BenchProfile {
        inputs: 1_000,
        outputs: 100_000,
        density: 0.0005,
    }
}

impl BenchProfile {
    /// Deterministic `(input, output)` pairs for `seed`.
    ///
    /// Each output gets at least one input, drawn uniformly, so every output
    /// is registered on the board.
    pub fn edges(&self, seed: u64) -> Vec<(usize, usize)> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let expected = (self.inputs as f64 * self.outputs as f64 * self.density) as usize;
        let mut edges = Vec::with_capacity(expected.max(self.outputs));
        if self.inputs == 0 {
            return edges;
        }
        for output in 0..self.outputs {
            let before = edges.len();
            for input in 0..self.inputs {
                if rng.random_bool(self.density) {
                    edges.push((input, output));
                }
            }
            if edges.len() == before {
                edges.push((rng.random_range(0..self.inputs), output));
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_deterministic() {
        let profile = BenchProfile {
            inputs: 10,
            outputs: 50,
            density: 0.2,
        };
        assert_eq!(profile.edges(42), profile.edges(42));
    }

    #[test]
    fn every_output_is_covered() {
        let profile = BenchProfile {
            inputs: 5,
            outputs: 200,
            density: 0.0,
        };
        let edges = profile.edges(7);
        assert_eq!(edges.len(), 200);
        for (output, &(input, o)) in edges.iter().enumerate() {
            assert_eq!(o, output);
            assert!(input < 5);
        }
    }

    #[test]
    fn profiles_fit_arena() {
        assert!(reference_profile().outputs < 524_280);
        assert!(stress_profile().outputs < 524_280);
    }
}
