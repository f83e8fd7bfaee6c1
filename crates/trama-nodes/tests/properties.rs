//! Property-based tests for the oscillator building blocks.

#![allow(missing_docs)]

use proptest::prelude::*;

use trama_nodes::{Phasor, Waveform};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn phasor_stays_in_unit_interval(incs in prop::collection::vec(0.0f32..2.0, 1..200)) {
        let mut phasor = Phasor::default();
        for inc in incs {
            let phase = phasor.advance(inc);
            prop_assert!((0.0..1.0).contains(&phase), "phase out of range: {phase}");
        }
    }

    #[test]
    fn waveforms_are_bounded(phase in 0.0f32..1.0, wave in 0i32..4) {
        let v = Waveform::from_index(wave).value(phase);
        prop_assert!((-1.0..=1.0).contains(&v), "{wave} at {phase}: {v}");
    }

    #[test]
    fn square_has_no_intermediate_levels(phase in 0.0f32..1.0) {
        let v = Waveform::Square.value(phase);
        prop_assert!(v == 1.0 || v == -1.0);
    }

    #[test]
    fn sawtooth_is_monotone_within_a_cycle(a in 0.0f32..1.0, b in 0.0f32..1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Waveform::Sawtooth.value(lo) <= Waveform::Sawtooth.value(hi));
    }
}
