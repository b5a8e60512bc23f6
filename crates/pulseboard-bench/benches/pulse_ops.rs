//! Criterion micro-benchmarks for the pulse hot path: source OR, probe
//! checks and deferred callback dispatch.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use pulseboard_arena::source::or_mask_into;
use pulseboard_bench::{reference_profile, stress_profile, BenchProfile};
use pulseboard_core::Timestamp;
use pulseboard_engine::RelayBoard;
use pulseboard_test_utils::{MockInput, MockOutput};

struct Wired {
    board: RelayBoard,
    inputs: Vec<Rc<MockInput>>,
    outputs: Vec<Rc<MockOutput>>,
}

/// Build and initialize a board for `profile`, one no-op callback per input.
fn wire(profile: BenchProfile, seed: u64) -> Wired {
    let inputs: Vec<_> = (0..profile.inputs)
        .map(|i| MockInput::new(format!("in{i}")))
        .collect();
    let outputs: Vec<_> = (0..profile.outputs)
        .map(|o| MockOutput::new(format!("out{o}")))
        .collect();
    let mut board = RelayBoard::new();
    {
        let mut scope = board.batch();
        for (input, output) in profile.edges(seed) {
            let connection = scope
                .connect(&inputs[input].handle(), &outputs[output].handle())
                .unwrap()
                .unwrap();
            scope
                .subscribe(&connection, |now| {
                    black_box(now);
                })
                .unwrap();
        }
        scope.finish().unwrap();
    }
    board.initialize().unwrap();
    Wired {
        board,
        inputs,
        outputs,
    }
}

/// Benchmark: OR a 64 KiB mask into a 64 KiB flag span.
fn bench_or_mask_64k(c: &mut Criterion) {
    let mut flags = vec![0u8; 65_535];
    let mask = vec![0b1010_0101u8; 65_535];
    c.bench_function("or_mask_64k", |b| {
        b.iter(|| {
            or_mask_into(black_box(&mut flags), black_box(&mask));
        });
    });
}

/// Benchmark: notify every input of the reference profile once.
fn bench_pulse_reference(c: &mut Criterion) {
    let wired = wire(reference_profile(), 42);
    c.bench_function("pulse_reference", |b| {
        b.iter(|| {
            for input in &wired.inputs {
                black_box(input.notify());
            }
        });
    });
}

/// Benchmark: notify a handful of inputs on the stress profile.
fn bench_pulse_stress(c: &mut Criterion) {
    let wired = wire(stress_profile(), 42);
    c.bench_function("pulse_stress_16", |b| {
        b.iter(|| {
            for input in wired.inputs.iter().take(16) {
                black_box(input.notify());
            }
        });
    });
}

/// Benchmark: check and clear every output of the reference profile.
fn bench_probe_check_reference(c: &mut Criterion) {
    let wired = wire(reference_profile(), 42);
    wired.inputs[0].notify();
    c.bench_function("probe_check_reference", |b| {
        b.iter(|| {
            let mut flagged = 0usize;
            for output in &wired.outputs {
                flagged += usize::from(output.check_and_reset());
            }
            black_box(flagged)
        });
    });
}

/// Benchmark: pulse every input, then poll the queued batches.
fn bench_poll_reference(c: &mut Criterion) {
    let mut wired = wire(reference_profile(), 42);
    let mut now = 0u64;
    c.bench_function("poll_reference", |b| {
        b.iter(|| {
            for input in &wired.inputs {
                input.notify();
            }
            now += 1;
            black_box(wired.board.poll(Timestamp(now)))
        });
    });
}

criterion_group!(
    benches,
    bench_or_mask_64k,
    bench_pulse_reference,
    bench_pulse_stress,
    bench_probe_check_reference,
    bench_poll_reference
);
criterion_main!(benches);
