//! Linear ramp envelope used for declick fades and soft muting.
//!
//! A single scalar ramps between 0 and 1 at a fixed per-sample delta derived
//! from the configured rise/fall durations and the active sample rate. The
//! same state machine serves two purposes: fading a rewired input socket out
//! and back in, and fading a muted node's outputs to silence instead of
//! gating them.

/// Rise and fall durations for an [`Envelope`], in seconds.
///
/// Defaults to 50 ms both ways. The durations are resolved against the active
/// sample rate at node construction and again on every configuration change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeShape {
    /// Time to ramp from 0 to 1 after a press, in seconds.
    pub rise_seconds: f32,
    /// Time to ramp from 1 to 0 after a release, in seconds.
    pub fall_seconds: f32,
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        Self {
            rise_seconds: 0.05,
            fall_seconds: 0.05,
        }
    }
}

impl EnvelopeShape {
    /// Resolves the shape into `(rise_delta, fall_delta)` per-sample steps.
    ///
    /// `rise_delta = 1/(rise_seconds*sample_rate)` and
    /// `fall_delta = -1/(fall_seconds*sample_rate)`. Durations are floored at
    /// one microsecond so a delta is never zero or infinite.
    pub fn deltas(&self, sample_rate: f64) -> (f32, f32) {
        let rise = f64::from(self.rise_seconds.max(1e-6));
        let fall = f64::from(self.fall_seconds.max(1e-6));
        (
            (1.0 / (rise * sample_rate)) as f32,
            (-1.0 / (fall * sample_rate)) as f32,
        )
    }
}

/// Scalar ramp in `[0, 1]` with press/release semantics.
///
/// `press()` aims the scalar at 1, `release()` aims it at 0. The scalar moves
/// only when advanced — either in bulk with [`update`](Self::update) or
/// sample-by-sample while multiplying a buffer with [`apply`](Self::apply),
/// so mid-block changes are audible as a ramp rather than a discontinuity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    value: f32,
    delta: f32,
    rise_delta: f32,
    fall_delta: f32,
}

impl Envelope {
    /// Creates an envelope at 1.0, rising. This is the default orientation
    /// for a node's output envelope: audible until muted.
    pub fn pressed(shape: EnvelopeShape, sample_rate: f64) -> Self {
        let (rise_delta, fall_delta) = shape.deltas(sample_rate);
        Self {
            value: 1.0,
            delta: rise_delta,
            rise_delta,
            fall_delta,
        }
    }

    /// Creates an envelope at 0.0, falling. Input sockets start released so
    /// a first connection on a silent socket applies immediately.
    pub fn released(shape: EnvelopeShape, sample_rate: f64) -> Self {
        let (rise_delta, fall_delta) = shape.deltas(sample_rate);
        Self {
            value: 0.0,
            delta: fall_delta,
            rise_delta,
            fall_delta,
        }
    }

    /// Re-resolves the per-sample deltas, keeping value and direction.
    pub fn set_deltas(&mut self, shape: EnvelopeShape, sample_rate: f64) {
        let (rise_delta, fall_delta) = shape.deltas(sample_rate);
        self.rise_delta = rise_delta;
        self.fall_delta = fall_delta;
        self.delta = if self.is_rising() { rise_delta } else { fall_delta };
    }

    /// Aims the ramp at 1.0.
    #[inline]
    pub fn press(&mut self) {
        self.delta = self.rise_delta;
    }

    /// Aims the ramp at 0.0.
    #[inline]
    pub fn release(&mut self) {
        self.delta = self.fall_delta;
    }

    /// Advances the scalar by `samples` steps, clamped to `[0, 1]`.
    pub fn update(&mut self, samples: usize) {
        self.value = (self.value + self.delta * samples as f32).clamp(0.0, 1.0);
        self.snap();
    }

    /// Multiplies each sample by the scalar value *at that sample index*,
    /// advancing the scalar one step per sample.
    pub fn apply(&mut self, samples: &mut [f32]) {
        for sample in samples {
            *sample *= self.value;
            self.value = (self.value + self.delta).clamp(0.0, 1.0);
        }
        self.snap();
    }

    /// Absorbs accumulated float rounding: within half a step of the aimed
    /// extreme counts as arrived, so a fade settles after exactly its
    /// configured duration.
    fn snap(&mut self) {
        if self.is_rising() {
            if self.value >= 1.0 - 0.5 * self.delta {
                self.value = 1.0;
            }
        } else if self.value <= -0.5 * self.delta {
            self.value = 0.0;
        }
    }

    /// Current scalar value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// True while the ramp is aimed at 1.0 (last operation was a press).
    #[inline]
    pub fn is_rising(&self) -> bool {
        self.delta >= 0.0
    }

    /// True once the scalar has reached the extreme implied by the last
    /// press/release: 1.0 after a press, 0.0 after a release.
    #[inline]
    pub fn finished(&self) -> bool {
        if self.is_rising() {
            self.value >= 1.0
        } else {
            self.value <= 0.0
        }
    }
}
