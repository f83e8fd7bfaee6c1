//! N-input audio mixer node.

use trama_core::{
    COMMON_PARAMS, NodeBehavior, NodeLayout, ParamSpec, ParamValue, ProcessContext,
};

/// How the mixer combines its connected inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MixOp {
    /// Sum of all connected inputs; unconnected sockets contribute silence.
    #[default]
    Sum,
    /// Product of the connected inputs; unconnected sockets are skipped so
    /// they do not zero the result.
    Product,
}

impl MixOp {
    /// Maps the integer `mixop` parameter onto an operation. Out-of-range
    /// values fall back to sum.
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Product,
            _ => Self::Sum,
        }
    }
}

/// Mixes N audio inputs into one output, with an amplitude parameter that a
/// connected control input can override sample by sample.
pub struct Mixer {
    inputs: usize,
    amplitude: f32,
    op: MixOp,
}

impl Mixer {
    /// Default output amplitude.
    pub const DEFAULT_AMPLITUDE: f32 = 1.0;

    /// Control input index of the per-sample amplitude override.
    pub const IN_AMPLITUDE: usize = 0;

    /// Creates a mixer with `inputs` audio input sockets.
    pub fn new(inputs: usize) -> Self {
        Self {
            inputs,
            amplitude: Self::DEFAULT_AMPLITUDE,
            op: MixOp::Sum,
        }
    }
}

impl NodeBehavior for Mixer {
    fn layout(&self) -> NodeLayout {
        let mut layout = NodeLayout::new("mixer");
        layout.audio_inputs = self.inputs;
        layout.control_inputs = 1;
        layout.audio_outputs = 1;
        layout.params.extend([
            ParamSpec::float("amplitude", Self::DEFAULT_AMPLITUDE, 0.0, 1.0),
            ParamSpec::int("mixop", 0, 0, 1),
        ]);
        layout
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let ampl_in = ctx.control_input(Self::IN_AMPLITUDE);
        let amplitude = self.amplitude;
        let op = self.op;

        // Input references carry the arena lifetime, so each one can be
        // folded straight into the output without a scratch collection.
        let identity = match op {
            MixOp::Sum => 0.0,
            MixOp::Product => 1.0,
        };
        let out = ctx.audio_output(0);
        for ch in 0..out.channels() {
            out.channel_mut(ch).fill(identity);
        }

        let mut connected = 0usize;
        for i in 0..self.inputs {
            let Some(buf) = ctx.audio_input(i) else { continue };
            connected += 1;
            let out = ctx.audio_output(0);
            for ch in 0..out.channels() {
                for (s, x) in out.channel_mut(ch).iter_mut().zip(buf.channel(ch)) {
                    match op {
                        MixOp::Sum => *s += x,
                        MixOp::Product => *s *= x,
                    }
                }
            }
        }

        let out = ctx.audio_output(0);
        if op == MixOp::Product && connected == 0 {
            for ch in 0..out.channels() {
                out.channel_mut(ch).fill(0.0);
            }
        }
        for ch in 0..out.channels() {
            let samples = out.channel_mut(ch);
            match ampl_in {
                Some(ampl) => {
                    for (s, a) in samples.iter_mut().zip(ampl.as_slice()) {
                        *s *= a;
                    }
                }
                None => {
                    for s in samples {
                        *s *= amplitude;
                    }
                }
            }
        }
    }

    fn param_changed(&mut self, index: usize, value: &ParamValue) {
        match index.checked_sub(COMMON_PARAMS) {
            Some(0) => {
                if let ParamValue::Float(ampl) = value {
                    self.amplitude = *ampl;
                }
            }
            Some(1) => {
                if let ParamValue::Int(op) = value {
                    self.op = MixOp::from_index(*op);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trama_core::{AudioConfig, LinkType, Patch};

    struct Dc(f32);
    impl NodeBehavior for Dc {
        fn layout(&self) -> NodeLayout {
            let mut layout = NodeLayout::new("dc");
            layout.audio_outputs = 1;
            layout
        }
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            let out = ctx.audio_output(0);
            for ch in 0..out.channels() {
                out.channel_mut(ch).fill(self.0);
            }
        }
    }

    fn rig(op: i32) -> (Patch, trama_core::NodeId) {
        let mut patch = Patch::new(AudioConfig::new(48000.0, 16, 2)).unwrap();
        let a = patch.insert(Box::new(Dc(0.25)));
        let b = patch.insert(Box::new(Dc(0.5)));
        let mixer = patch.insert(Box::new(Mixer::new(4)));
        patch.connect(mixer, LinkType::Audio, 0, Some((a, 0))).unwrap();
        patch.connect(mixer, LinkType::Audio, 1, Some((b, 0))).unwrap();
        patch.set_param(mixer, "mixop", ParamValue::Int(op)).unwrap();
        patch.set_sink(mixer).unwrap();
        (patch, mixer)
    }

    #[test]
    fn sum_ignores_unconnected_inputs() {
        let (mut patch, _) = rig(0);
        let out = patch.tick().unwrap();
        for &s in out[0].channel(0) {
            assert!((s - 0.75).abs() < 1e-6);
        }
    }

    #[test]
    fn product_skips_unconnected_inputs() {
        let (mut patch, _) = rig(1);
        let out = patch.tick().unwrap();
        for &s in out[0].channel(1) {
            assert!((s - 0.125).abs() < 1e-6);
        }
    }

    #[test]
    fn fully_disconnected_mixer_is_silent() {
        let mut patch = Patch::new(AudioConfig::new(48000.0, 16, 2)).unwrap();
        let mixer = patch.insert(Box::new(Mixer::new(2)));
        patch.set_sink(mixer).unwrap();
        let out = patch.tick().unwrap();
        assert!(out[0].channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn disconnected_product_does_not_leak_the_identity() {
        let mut patch = Patch::new(AudioConfig::new(48000.0, 16, 2)).unwrap();
        let mixer = patch.insert(Box::new(Mixer::new(2)));
        patch.set_param(mixer, "mixop", ParamValue::Int(1)).unwrap();
        patch.set_sink(mixer).unwrap();
        let out = patch.tick().unwrap();
        assert!(out[0].channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn amplitude_parameter_scales_output() {
        let (mut patch, mixer) = rig(0);
        patch
            .set_param(mixer, "amplitude", ParamValue::Float(0.5))
            .unwrap();
        let out = patch.tick().unwrap();
        for &s in out[0].channel(0) {
            assert!((s - 0.375).abs() < 1e-6);
        }
    }
}
