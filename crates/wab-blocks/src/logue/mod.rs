//! Logue-style oscillator and filter modules plus their control-side node.
//!
//! Parameter keys follow the logue user-unit layout: user parameters `0..=5`,
//! then shape and shift-shape, then the host-driven controls from
//! [`PARAM_GATE`] upwards.

mod filter;
mod node;
mod osc;

pub use filter::{LogueFilterModule, LOGUE_FILTER_ID};
pub use node::{LogueKind, LogueNode};
pub use osc::{LogueOscModule, LOGUE_OSC_ID};

/// Number of free-form user parameters, keys `0..USER_PARAMS`.
pub const USER_PARAMS: u32 = 6;
pub const PARAM_SHAPE: u32 = 6;
pub const PARAM_SHIFT_SHAPE: u32 = 7;
pub const PARAM_GATE: u32 = 100;
/// MIDI note number, fractional values allowed.
pub const PARAM_PITCH: u32 = 101;
/// Normalised `0..=1`; `1` bypasses the filter.
pub const PARAM_CUTOFF: u32 = 102;
/// Normalised `0..=1`.
pub const PARAM_RESONANCE: u32 = 103;

/// First binary slot holding a user waveform.
pub const WAVE_SLOT_BASE: u32 = 100;

/// A unit initialises under an empty descriptor or the one naming its own
/// kind.
pub(crate) fn accepts_descriptor(descriptor: &str, kind: LogueKind) -> bool {
    descriptor.is_empty() || descriptor == kind.as_str()
}

#[inline]
pub(crate) fn soft_clip(sample: f32) -> f32 {
    let a = sample.abs();
    (sample * (27.0 + a * a)) / (27.0 + 9.0 * a * a)
}

/// Resonant low-pass driven by the normalised cutoff and resonance
/// parameters.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LowPass {
    a1: f32,
    a2: f32,
    a3: f32,
    ic1eq: f32,
    ic2eq: f32,
    bypass: bool,
}

impl LowPass {
    pub fn new() -> Self {
        Self {
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
            bypass: true,
        }
    }

    pub fn configure(&mut self, sample_rate: f32, cutoff: f32, resonance: f32) {
        self.bypass = cutoff >= 1.0;
        if self.bypass {
            return;
        }
        let sr = sample_rate.max(1.0);
        let hz = (20.0 * 1000.0_f32.powf(cutoff.clamp(0.0, 1.0))).clamp(10.0, 0.45 * sr);
        let q = 0.707 + resonance.clamp(0.0, 1.0) * 9.3;
        let g = (std::f32::consts::PI * (hz / sr)).tan();
        let k = 1.0 / q;
        self.a1 = 1.0 / (1.0 + g * (g + k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.bypass {
            return input;
        }
        let v3 = input - self.ic2eq;
        let v1 = self.a1 * self.ic1eq + self.a2 * v3;
        let v2 = self.ic2eq + self.a2 * self.ic1eq + self.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        v2
    }
}
