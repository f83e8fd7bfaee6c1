//! Integration tests for the built-in node behaviors.
//!
//! Verifies the oscillator against closed-form signals, the mixer's
//! sum/product semantics through a real patch, and the rack surface end to
//! end.

use trama_core::{AudioConfig, LinkType, ParamValue, Patch};
use trama_nodes::{AudioOscillator, ControlOscillator, Mixer, Rack};

const TAU: f32 = core::f32::consts::TAU;

fn config() -> AudioConfig {
    AudioConfig::new(48_000.0, 64, 2)
}

#[test]
fn default_oscillator_renders_220hz_half_amplitude_sine() {
    let mut patch = Patch::new(config()).unwrap();
    let osc = patch.insert(Box::new(AudioOscillator::new()));
    patch.set_sink(osc).unwrap();

    let out = patch.tick().unwrap();
    assert_eq!(out.len(), 1);
    let buf = &out[0];
    assert_eq!(buf.channels(), 2);
    assert_eq!(buf.len(), 64);

    // Channels are duplicated, not independently synthesized.
    assert_eq!(buf.channel(0), buf.channel(1));

    for (i, &s) in buf.channel(0).iter().enumerate() {
        let expected = 0.5 * libm::sinf(TAU * 220.0 * i as f32 / 48_000.0);
        assert!(
            (s - expected).abs() < 1e-3,
            "sample {i}: got {s}, expected {expected}"
        );
    }
}

#[test]
fn oscillator_phase_is_continuous_across_blocks() {
    let mut patch = Patch::new(config()).unwrap();
    let osc = patch.insert(Box::new(AudioOscillator::new()));
    patch.set_sink(osc).unwrap();

    let mut rendered = Vec::new();
    for _ in 0..8 {
        rendered.extend_from_slice(patch.tick().unwrap()[0].channel(0));
    }
    for (i, &s) in rendered.iter().enumerate() {
        let expected = 0.5 * libm::sinf(TAU * 220.0 * i as f32 / 48_000.0);
        assert!((s - expected).abs() < 1e-3, "sample {i} discontinuous");
    }
}

#[test]
fn waveform_parameter_switches_shape() {
    let mut patch = Patch::new(config()).unwrap();
    let osc = patch.insert(Box::new(AudioOscillator::new()));
    patch.set_sink(osc).unwrap();
    // Square wave at full amplitude.
    patch.set_param(osc, "wave", ParamValue::Int(1)).unwrap();
    patch.set_param(osc, "amplitude", ParamValue::Float(1.0)).unwrap();

    let out = patch.tick().unwrap();
    for &s in out[0].channel(0) {
        assert!(s == 1.0 || s == -1.0, "square sample was {s}");
    }
}

#[test]
fn frequency_parameter_commits_on_next_block() {
    let mut patch = Patch::new(config()).unwrap();
    let osc = patch.insert(Box::new(AudioOscillator::new()));
    patch.set_sink(osc).unwrap();
    patch.tick().unwrap();

    patch.set_param(osc, "frequency", ParamValue::Float(440.0)).unwrap();
    assert_eq!(
        patch.param(osc, "frequency").unwrap(),
        ParamValue::Float(220.0)
    );
    patch.tick().unwrap();
    assert_eq!(
        patch.param(osc, "frequency").unwrap(),
        ParamValue::Float(440.0)
    );
}

#[test]
fn lfo_modulates_oscillator_amplitude() {
    let mut patch = Patch::new(config()).unwrap();
    let lfo = patch.insert(Box::new(ControlOscillator::new()));
    let osc = patch.insert(Box::new(AudioOscillator::new()));
    patch
        .connect(
            osc,
            LinkType::Control,
            AudioOscillator::IN_AMPLITUDE,
            Some((lfo, 0)),
        )
        .unwrap();
    patch.set_sink(osc).unwrap();

    // Raise the LFO rate so it moves visibly within a few blocks.
    patch.set_param(lfo, "frequency", ParamValue::Float(100.0)).unwrap();

    let mut peaks = Vec::new();
    for _ in 0..32 {
        let out = patch.tick().unwrap();
        let peak = out[0]
            .channel(0)
            .iter()
            .fold(0.0f32, |acc, &s| acc.max(s.abs()));
        peaks.push(peak);
    }
    // The amplitude override must actually vary the output level.
    let max = peaks.iter().cloned().fold(0.0f32, f32::max);
    let min = peaks.iter().cloned().fold(f32::INFINITY, f32::min);
    assert!(max - min > 0.05, "peaks did not vary: {min}..{max}");
}

#[test]
fn fm_input_bends_the_pitch() {
    let mut patch = Patch::new(config()).unwrap();
    let lfo = patch.insert(Box::new(ControlOscillator::new()));
    let osc = patch.insert(Box::new(AudioOscillator::new()));
    patch
        .connect(
            osc,
            LinkType::Control,
            AudioOscillator::IN_FREQUENCY,
            Some((lfo, 0)),
        )
        .unwrap();
    patch.set_sink(osc).unwrap();
    patch.set_param(lfo, "frequency", ParamValue::Float(5.0)).unwrap();
    patch.set_param(lfo, "amplitude", ParamValue::Float(0.9)).unwrap();

    // With the modulator swinging the instantaneous frequency by ±90%, the
    // rendered tone must drift away from the unmodulated carrier.
    let mut rendered = Vec::new();
    for _ in 0..40 {
        rendered.extend_from_slice(patch.tick().unwrap()[0].channel(0));
    }
    let divergence = rendered
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let carrier = 0.5 * libm::sinf(TAU * 220.0 * i as f32 / 48_000.0);
            (s - carrier).abs()
        })
        .fold(0.0f32, f32::max);
    assert!(divergence > 0.1, "modulation had no effect: {divergence}");
}

#[test]
fn mixer_sums_two_oscillators() {
    let mut patch = Patch::new(config()).unwrap();
    let a = patch.insert(Box::new(AudioOscillator::new()));
    let b = patch.insert(Box::new(AudioOscillator::new()));
    let mixer = patch.insert(Box::new(Mixer::new(4)));
    patch.connect(mixer, LinkType::Audio, 0, Some((a, 0))).unwrap();
    patch.connect(mixer, LinkType::Audio, 1, Some((b, 0))).unwrap();
    patch.set_sink(mixer).unwrap();

    let out = patch.tick().unwrap();
    for (i, &s) in out[0].channel(0).iter().enumerate() {
        let one = 0.5 * libm::sinf(TAU * 220.0 * i as f32 / 48_000.0);
        assert!((s - 2.0 * one).abs() < 2e-3, "sample {i}");
    }
}

#[test]
fn rack_drives_a_full_patch_by_kind_name() {
    let mut rack = Rack::new(config()).unwrap();
    let osc = rack.create_node("oscillator").unwrap();
    let lfo = rack.create_node("lfo").unwrap();
    let mixer = rack.create_node("mixer").unwrap();

    rack.connect(mixer, LinkType::Audio, 0, (osc, 0)).unwrap();
    rack.connect(osc, LinkType::Control, AudioOscillator::IN_AMPLITUDE, (lfo, 0))
        .unwrap();
    rack.set_sink(mixer).unwrap();
    rack.set_param(osc, "wave", ParamValue::Int(2)).unwrap();

    for _ in 0..10 {
        let out = rack.tick().unwrap();
        assert_eq!(out[0].len(), 64);
        assert!(out[0].channel(0).iter().all(|s| s.is_finite()));
    }

    rack.destroy_node(lfo).unwrap();
    assert!(!rack.patch().contains(lfo));
    // The oscillator falls back to its amplitude parameter.
    rack.tick().unwrap();
}

#[test]
fn muted_oscillator_reaches_silence_and_comes_back() {
    let mut rack = Rack::new(config()).unwrap();
    let osc = rack.create_node("oscillator").unwrap();
    rack.set_sink(osc).unwrap();
    rack.tick().unwrap();

    rack.set_param(osc, "mute", ParamValue::Bool(true)).unwrap();
    for _ in 0..60 {
        rack.tick().unwrap();
    }
    assert!(rack.patch().node(osc).unwrap().visible_audio_output(0).is_none());

    rack.set_param(osc, "mute", ParamValue::Bool(false)).unwrap();
    let mut heard = false;
    for _ in 0..60 {
        let out = rack.tick().unwrap();
        if out[0].channel(0).iter().any(|&s| s.abs() > 0.1) {
            heard = true;
            break;
        }
    }
    assert!(heard, "unmute never became audible");
}
