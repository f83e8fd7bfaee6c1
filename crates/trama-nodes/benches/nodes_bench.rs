//! Criterion benchmarks for the built-in node behaviors.
//!
//! Run with: `cargo bench -p trama-nodes`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use trama_core::{AudioConfig, LinkType, ParamValue, Patch};
use trama_nodes::{AudioOscillator, ControlOscillator, Mixer};

fn bench_oscillator_waveforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("nodes/oscillator");
    for (name, wave) in [("sine", 0), ("square", 1), ("triangle", 2), ("sawtooth", 3)] {
        let config = AudioConfig::new(48_000.0, 256, 2);
        let mut patch = Patch::new(config).unwrap();
        let osc = patch.insert(Box::new(AudioOscillator::new()));
        patch.set_sink(osc).unwrap();
        patch.set_param(osc, "wave", ParamValue::Int(wave)).unwrap();
        patch.tick().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &wave, |b, _| {
            b.iter(|| {
                let out = patch.tick().unwrap();
                black_box(out[0].channel(0)[0]);
            });
        });
    }
    group.finish();
}

fn bench_modulated_voice(c: &mut Criterion) {
    let config = AudioConfig::new(48_000.0, 256, 2);
    let mut patch = Patch::new(config).unwrap();
    let lfo = patch.insert(Box::new(ControlOscillator::new()));
    let a = patch.insert(Box::new(AudioOscillator::new()));
    let b = patch.insert(Box::new(AudioOscillator::new()));
    let mixer = patch.insert(Box::new(Mixer::new(4)));
    patch
        .connect(a, LinkType::Control, AudioOscillator::IN_FREQUENCY, Some((lfo, 0)))
        .unwrap();
    patch.connect(mixer, LinkType::Audio, 0, Some((a, 0))).unwrap();
    patch.connect(mixer, LinkType::Audio, 1, Some((b, 0))).unwrap();
    patch.set_sink(mixer).unwrap();
    for _ in 0..64 {
        patch.tick().unwrap();
    }

    c.bench_function("nodes/modulated-voice", |bench| {
        bench.iter(|| {
            let out = patch.tick().unwrap();
            black_box(out[0].channel(0)[0]);
        });
    });
}

criterion_group!(benches, bench_oscillator_waveforms, bench_modulated_voice);
criterion_main!(benches);
