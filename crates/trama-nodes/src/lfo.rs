//! Control-rate oscillator (LFO) node.

use trama_core::{AudioConfig, NodeBehavior, NodeLayout, ParamValue, ProcessContext};

use crate::osc::{OscCore, osc_params};

/// Low-frequency oscillator writing a single control-rate output.
///
/// Same waveform and modulation vocabulary as
/// [`AudioOscillator`](crate::AudioOscillator), scaled to modulation
/// frequencies. Wire its output into another node's frequency or amplitude
/// control input.
pub struct ControlOscillator {
    core: OscCore,
}

impl ControlOscillator {
    /// Default rate in Hz.
    pub const DEFAULT_FREQUENCY: f32 = 1.0;
    /// Default output amplitude.
    pub const DEFAULT_AMPLITUDE: f32 = 0.5;

    /// Control input index of the frequency modulator.
    pub const IN_FREQUENCY: usize = 0;
    /// Control input index of the per-sample amplitude override.
    pub const IN_AMPLITUDE: usize = 1;

    /// Creates an LFO with the default rate and amplitude.
    pub fn new() -> Self {
        Self {
            core: OscCore::new(Self::DEFAULT_FREQUENCY, Self::DEFAULT_AMPLITUDE),
        }
    }
}

impl Default for ControlOscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for ControlOscillator {
    fn layout(&self) -> NodeLayout {
        let mut layout = NodeLayout::new("lfo");
        layout.control_inputs = 2;
        layout.control_outputs = 1;
        layout.params.extend(osc_params(
            Self::DEFAULT_FREQUENCY,
            200.0,
            Self::DEFAULT_AMPLITUDE,
        ));
        layout
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let freq_mod = ctx.control_input(Self::IN_FREQUENCY);
        let ampl_in = ctx.control_input(Self::IN_AMPLITUDE);
        let out = ctx.control_output(0);
        self.core.render(
            out.as_mut_slice(),
            freq_mod.map(|b| b.as_slice()),
            ampl_in.map(|b| b.as_slice()),
        );
    }

    fn config_changed(&mut self, config: &AudioConfig) {
        self.core.sample_rate = config.sample_rate as f32;
    }

    fn param_changed(&mut self, index: usize, value: &ParamValue) {
        self.core.param_changed(index, value);
    }
}
