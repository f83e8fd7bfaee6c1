//! Audio-rate oscillator node.
//!
//! The oscillator is the reference node behavior: it declares its sockets
//! and parameters up front, caches committed parameter values, and renders
//! channel 0 per sample before replicating it into the remaining channels.

use core::f32::consts::TAU;
use libm::{floorf, sinf};

use trama_core::{
    AudioConfig, COMMON_PARAMS, NodeBehavior, NodeLayout, ParamSpec, ParamValue, ProcessContext,
};

/// Euclidean remainder for f32, compatible with no_std.
#[inline]
fn rem_euclid_f32(a: f32, b: f32) -> f32 {
    let r = a - b * floorf(a / b);
    if r < 0.0 { r + b } else { r }
}

/// Oscillator waveform, selected through the `wave` parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Pure fundamental tone.
    #[default]
    Sine,
    /// Odd harmonics, hollow timbre.
    Square,
    /// Odd harmonics, softer than saw.
    Triangle,
    /// All harmonics, bright timbre.
    Sawtooth,
}

impl Waveform {
    /// Maps the integer `wave` parameter onto a waveform. Out-of-range
    /// values fall back to sine.
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Square,
            2 => Self::Triangle,
            3 => Self::Sawtooth,
            _ => Self::Sine,
        }
    }

    /// Evaluates the waveform at `phase` in `[0, 1)`. All shapes span
    /// `[-1, 1]`.
    #[inline]
    pub fn value(self, phase: f32) -> f32 {
        match self {
            Self::Sine => sinf(phase * TAU),
            Self::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            Self::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Self::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// How a signal on the frequency control input is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Modulation {
    /// Modulator scales the instantaneous frequency: `f * (1 + m)`.
    #[default]
    Frequency,
    /// Modulator scales the output amplitude: `s * (1 + m)`.
    Amplitude,
    /// Modulator offsets the phase read position.
    Phase,
}

impl Modulation {
    /// Maps the integer `modulator` parameter onto a mode. Out-of-range
    /// values fall back to frequency modulation.
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Amplitude,
            2 => Self::Phase,
            _ => Self::Frequency,
        }
    }
}

/// Phase accumulator in `[0, 1)` turns.
#[derive(Clone, Copy, Debug, Default)]
pub struct Phasor {
    phase: f32,
}

impl Phasor {
    /// Current phase in turns.
    #[inline]
    pub fn phase(self) -> f32 {
        self.phase
    }

    /// Returns the current phase and advances by `inc` turns, wrapping into
    /// `[0, 1)`.
    #[inline]
    pub fn advance(&mut self, inc: f32) -> f32 {
        let phase = self.phase;
        self.phase = rem_euclid_f32(self.phase + inc, 1.0);
        phase
    }

    /// Resets the accumulator to zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// The oscillator state shared by the audio-rate node and the LFO.
///
/// Reads frequency/amplitude from connected control inputs when present,
/// from its own parameters when not, and renders per sample through the
/// selected waveform.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OscCore {
    pub phasor: Phasor,
    pub sample_rate: f32,
    pub waveform: Waveform,
    pub modulation: Modulation,
    pub frequency: f32,
    pub amplitude: f32,
}

impl OscCore {
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            phasor: Phasor::default(),
            sample_rate: 48_000.0,
            waveform: Waveform::Sine,
            modulation: Modulation::Frequency,
            frequency,
            amplitude,
        }
    }

    /// Routes a committed parameter write into the cached fields. Parameter
    /// order: wave, modulator, frequency, amplitude, after the common set.
    pub fn param_changed(&mut self, index: usize, value: &ParamValue) {
        match index.checked_sub(COMMON_PARAMS) {
            Some(0) => {
                if let ParamValue::Int(wave) = value {
                    self.waveform = Waveform::from_index(*wave);
                }
            }
            Some(1) => {
                if let ParamValue::Int(modulation) = value {
                    self.modulation = Modulation::from_index(*modulation);
                }
            }
            Some(2) => {
                if let ParamValue::Float(freq) = value {
                    self.frequency = *freq;
                }
            }
            Some(3) => {
                if let ParamValue::Float(ampl) = value {
                    self.amplitude = *ampl;
                }
            }
            _ => {}
        }
    }

    /// Renders one block into `out`. `freq_mod` is interpreted per the
    /// modulation mode; `ampl_in`, when connected, replaces the amplitude
    /// parameter sample by sample.
    pub fn render(&mut self, out: &mut [f32], freq_mod: Option<&[f32]>, ampl_in: Option<&[f32]>) {
        let base_inc = self.frequency / self.sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            let modulator = freq_mod.map(|m| m[i]);
            let raw = match (self.modulation, modulator) {
                (Modulation::Frequency, Some(m)) => {
                    let phase = self.phasor.advance(base_inc * (1.0 + m));
                    self.waveform.value(phase)
                }
                (Modulation::Phase, Some(m)) => {
                    let phase = self.phasor.advance(base_inc);
                    self.waveform.value(rem_euclid_f32(phase + m, 1.0))
                }
                (Modulation::Amplitude, Some(m)) => {
                    let phase = self.phasor.advance(base_inc);
                    self.waveform.value(phase) * (1.0 + m)
                }
                (_, None) => {
                    let phase = self.phasor.advance(base_inc);
                    self.waveform.value(phase)
                }
            };
            let ampl = ampl_in.map_or(self.amplitude, |a| a[i]);
            *sample = ampl * raw;
        }
    }
}

/// Audio-rate oscillator: two control inputs (frequency modulator,
/// amplitude), one audio output.
pub struct AudioOscillator {
    core: OscCore,
}

impl AudioOscillator {
    /// Default base frequency in Hz.
    pub const DEFAULT_FREQUENCY: f32 = 220.0;
    /// Default output amplitude.
    pub const DEFAULT_AMPLITUDE: f32 = 0.5;

    /// Control input index of the frequency modulator.
    pub const IN_FREQUENCY: usize = 0;
    /// Control input index of the per-sample amplitude override.
    pub const IN_AMPLITUDE: usize = 1;

    /// Creates an oscillator with the default frequency and amplitude.
    pub fn new() -> Self {
        Self {
            core: OscCore::new(Self::DEFAULT_FREQUENCY, Self::DEFAULT_AMPLITUDE),
        }
    }
}

impl Default for AudioOscillator {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn osc_params(default_freq: f32, max_freq: f32, default_ampl: f32) -> [ParamSpec; 4] {
    [
        ParamSpec::int("wave", 0, 0, 3),
        ParamSpec::int("modulator", 0, 0, 2),
        ParamSpec::float("frequency", default_freq, 0.0, max_freq),
        ParamSpec::float("amplitude", default_ampl, 0.0, 1.0),
    ]
}

impl NodeBehavior for AudioOscillator {
    fn layout(&self) -> NodeLayout {
        let mut layout = NodeLayout::new("oscillator");
        layout.control_inputs = 2;
        layout.audio_outputs = 1;
        layout.params.extend(osc_params(
            Self::DEFAULT_FREQUENCY,
            20_000.0,
            Self::DEFAULT_AMPLITUDE,
        ));
        layout
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let freq_mod = ctx.control_input(Self::IN_FREQUENCY);
        let ampl_in = ctx.control_input(Self::IN_AMPLITUDE);
        let out = ctx.audio_output(0);
        self.core.render(
            out.channel_mut(0),
            freq_mod.map(|b| b.as_slice()),
            ampl_in.map(|b| b.as_slice()),
        );
        // Multi-channel duplication, not per-channel synthesis.
        out.replicate_channel(0);
    }

    fn config_changed(&mut self, config: &AudioConfig) {
        self.core.sample_rate = config.sample_rate as f32;
    }

    fn param_changed(&mut self, index: usize, value: &ParamValue) {
        self.core.param_changed(index, value);
    }
}
