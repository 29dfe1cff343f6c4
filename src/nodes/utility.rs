// Utility nodes (constants, gain)

use crate::node::{ProcessContext, Sample, UGen};

use super::params;

// ═══════════════════════════════════════════════════════════════════
// Constant (fixed outputs)
// ═══════════════════════════════════════════════════════════════════

/// Outputs the same value on every port, every tick.
pub struct Constant {
    channels: usize,
    value: f32,
}

impl Constant {
    pub fn new(channels: usize, value: f32) -> Self {
        Self { channels, value }
    }

    pub fn mono(value: f32) -> Self {
        Self::new(1, value)
    }
}

impl UGen for Constant {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], output: &mut [Sample]) {
        output.fill(self.value);
    }

    fn set_param(&mut self, param_id: u32, value: f32) {
        if param_id == params::VALUE {
            self.value = value;
        }
    }

    fn param(&self, param_id: u32) -> Option<f32> {
        (param_id == params::VALUE).then_some(self.value)
    }
}

// ═══════════════════════════════════════════════════════════════════
// Gain (per-channel scaling)
// ═══════════════════════════════════════════════════════════════════

/// Scales each input onto the matching output.
pub struct Gain {
    channels: usize,
    gain: f32,
}

impl Gain {
    pub fn new(channels: usize, gain: f32) -> Self {
        Self { channels, gain }
    }
}

impl UGen for Gain {
    fn num_inputs(&self) -> usize {
        self.channels
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn compute(&mut self, _ctx: &ProcessContext, input: &[Sample], output: &mut [Sample]) {
        for (out, &inp) in output.iter_mut().zip(input) {
            *out = inp * self.gain;
        }
    }

    fn set_param(&mut self, param_id: u32, value: f32) {
        if param_id == params::GAIN {
            self.gain = value;
        }
    }

    fn param(&self, param_id: u32) -> Option<f32> {
        (param_id == params::GAIN).then_some(self.gain)
    }
}
