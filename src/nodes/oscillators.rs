// Basic oscillator nodes.
//
// All oscillators share one phase accumulator running over (-pi, pi] and
// expose the same frequency / phase / amplitude parameters. Out-of-range
// parameter values are ignored and the previous value is kept.

use std::f64::consts::{PI, TAU};

use crate::node::{ProcessContext, Sample, UGen};

use super::params;

const DEFAULT_FREQ: f64 = 440.0;
const DEFAULT_AMPLITUDE: f64 = 0.5;
const DEFAULT_WIDTH: f64 = 0.5;

// ═══════════════════════════════════════════════════════════════════
// Shared phase accumulator
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Phasor {
    freq: f64,
    phase: f64,
    amplitude: f64,
    sample_rate: f64,

    /// Angular increment in radians per tick.
    step: f64,
}

impl Phasor {
    fn new() -> Self {
        let mut phasor = Self {
            freq: DEFAULT_FREQ,
            phase: 0.0,
            amplitude: DEFAULT_AMPLITUDE,
            sample_rate: 44_100.0,
            step: 0.0,
        };
        phasor.update_step();
        phasor
    }

    fn update_step(&mut self) {
        self.step = self.freq * TAU / self.sample_rate;
    }

    #[inline]
    fn advance(&mut self) {
        self.phase += self.step;
        if self.phase > PI {
            self.phase -= TAU;
        }
    }

    /// Apply a shared parameter. Returns whether it was accepted.
    fn set_param(&mut self, param_id: u32, value: f32) -> bool {
        let value = value as f64;
        match param_id {
            params::FREQ if value > 0.0 => {
                self.freq = value;
                self.update_step();
                true
            }
            params::PHASE if -PI < value && value <= PI => {
                self.phase = value;
                true
            }
            params::AMPLITUDE if value >= 0.0 => {
                self.amplitude = value;
                true
            }
            _ => false,
        }
    }

    fn param(&self, param_id: u32) -> Option<f32> {
        match param_id {
            params::FREQ => Some(self.freq as f32),
            params::PHASE => Some(self.phase as f32),
            params::AMPLITUDE => Some(self.amplitude as f32),
            _ => None,
        }
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_step();
    }
}

fn set_width(width: &mut f64, value: f32) {
    let value = value as f64;
    if (0.0..=1.0).contains(&value) {
        *width = value;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Sine Oscillator (two-tap recurrence)
// ═══════════════════════════════════════════════════════════════════

/// Sine generated by `y[n] = 2cos(w) * y[n-1] - y[n-2]`.
///
/// The recurrence is reseeded from the current phase whenever a parameter
/// or the sample rate changes.
pub struct SinOsc {
    phasor: Phasor,
    coeff: f64,
    history: [f64; 2],
}

impl SinOsc {
    pub fn new() -> Self {
        let mut osc = Self {
            phasor: Phasor::new(),
            coeff: 0.0,
            history: [0.0; 2],
        };
        osc.reseed();
        osc
    }

    pub fn with_freq(mut self, freq: f32) -> Self {
        self.set_param(params::FREQ, freq);
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.set_param(params::AMPLITUDE, amplitude);
        self
    }

    fn reseed(&mut self) {
        let w = self.phasor.step;
        let phase = self.phasor.phase;
        self.coeff = 2.0 * w.cos();
        self.history = [(phase - 2.0 * w).sin(), (phase - w).sin()];
    }
}

impl Default for SinOsc {
    fn default() -> Self {
        Self::new()
    }
}

impl UGen for SinOsc {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.phasor.prepare(sample_rate);
        self.reseed();
    }

    fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], output: &mut [Sample]) {
        let y = self.coeff * self.history[1] - self.history[0];
        self.history = [self.history[1], y];
        output[0] = (y * self.phasor.amplitude) as Sample;
        self.phasor.advance();
    }

    fn set_param(&mut self, param_id: u32, value: f32) {
        if self.phasor.set_param(param_id, value) {
            self.reseed();
        }
    }

    fn param(&self, param_id: u32) -> Option<f32> {
        self.phasor.param(param_id)
    }

    fn reset(&mut self) {
        self.phasor.phase = 0.0;
        self.reseed();
    }
}

// ═══════════════════════════════════════════════════════════════════
// Square Oscillator
// ═══════════════════════════════════════════════════════════════════

pub struct SquareOsc {
    phasor: Phasor,
}

impl SquareOsc {
    pub fn new() -> Self {
        Self {
            phasor: Phasor::new(),
        }
    }
}

impl Default for SquareOsc {
    fn default() -> Self {
        Self::new()
    }
}

impl UGen for SquareOsc {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.phasor.prepare(sample_rate);
    }

    fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], output: &mut [Sample]) {
        let level = if self.phasor.phase > 0.0 { 1.0 } else { -1.0 };
        output[0] = (level * self.phasor.amplitude) as Sample;
        self.phasor.advance();
    }

    fn set_param(&mut self, param_id: u32, value: f32) {
        self.phasor.set_param(param_id, value);
    }

    fn param(&self, param_id: u32) -> Option<f32> {
        self.phasor.param(param_id)
    }

    fn reset(&mut self) {
        self.phasor.phase = 0.0;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Saw Oscillator (naive, non-bandlimited)
// ═══════════════════════════════════════════════════════════════════

pub struct SawOsc {
    phasor: Phasor,
}

impl SawOsc {
    pub fn new() -> Self {
        Self {
            phasor: Phasor::new(),
        }
    }
}

impl Default for SawOsc {
    fn default() -> Self {
        Self::new()
    }
}

impl UGen for SawOsc {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.phasor.prepare(sample_rate);
    }

    fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], output: &mut [Sample]) {
        output[0] = (self.phasor.phase / PI * self.phasor.amplitude) as Sample;
        self.phasor.advance();
    }

    fn set_param(&mut self, param_id: u32, value: f32) {
        self.phasor.set_param(param_id, value);
    }

    fn param(&self, param_id: u32) -> Option<f32> {
        self.phasor.param(param_id)
    }

    fn reset(&mut self) {
        self.phasor.phase = 0.0;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Pulse Oscillator (variable width)
// ═══════════════════════════════════════════════════════════════════

pub struct PulseOsc {
    phasor: Phasor,

    /// 0..=1, moves the switching phase to `pi * (width - 0.5)`.
    width: f64,
}

impl PulseOsc {
    pub fn new() -> Self {
        Self {
            phasor: Phasor::new(),
            width: DEFAULT_WIDTH,
        }
    }
}

impl Default for PulseOsc {
    fn default() -> Self {
        Self::new()
    }
}

impl UGen for PulseOsc {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.phasor.prepare(sample_rate);
    }

    fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], output: &mut [Sample]) {
        let threshold = PI * (self.width - 0.5);
        let level = if self.phasor.phase > threshold { 1.0 } else { -1.0 };
        output[0] = (level * self.phasor.amplitude) as Sample;
        self.phasor.advance();
    }

    fn set_param(&mut self, param_id: u32, value: f32) {
        match param_id {
            params::PULSE_WIDTH => set_width(&mut self.width, value),
            _ => {
                self.phasor.set_param(param_id, value);
            }
        }
    }

    fn param(&self, param_id: u32) -> Option<f32> {
        match param_id {
            params::PULSE_WIDTH => Some(self.width as f32),
            _ => self.phasor.param(param_id),
        }
    }

    fn reset(&mut self) {
        self.phasor.phase = 0.0;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Triangle Oscillator (variable peak position)
// ═══════════════════════════════════════════════════════════════════

pub struct TriOsc {
    phasor: Phasor,

    /// Peak position, 0..=1. 0.5 gives a symmetric triangle.
    width: f64,
}

impl TriOsc {
    pub fn new() -> Self {
        Self {
            phasor: Phasor::new(),
            width: DEFAULT_WIDTH,
        }
    }

    fn shape(&self) -> f64 {
        let phase = self.phasor.phase;
        let peak = PI * self.width;

        if phase < -peak {
            (-PI - phase) / (PI - peak)
        } else if phase <= peak {
            if peak == 0.0 { 0.0 } else { phase / peak }
        } else {
            (PI - phase) / (PI - peak)
        }
    }
}

impl Default for TriOsc {
    fn default() -> Self {
        Self::new()
    }
}

impl UGen for TriOsc {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.phasor.prepare(sample_rate);
    }

    fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], output: &mut [Sample]) {
        output[0] = (self.shape() * self.phasor.amplitude) as Sample;
        self.phasor.advance();
    }

    fn set_param(&mut self, param_id: u32, value: f32) {
        match param_id {
            params::PULSE_WIDTH => set_width(&mut self.width, value),
            _ => {
                self.phasor.set_param(param_id, value);
            }
        }
    }

    fn param(&self, param_id: u32) -> Option<f32> {
        match param_id {
            params::PULSE_WIDTH => Some(self.width as f32),
            _ => self.phasor.param(param_id),
        }
    }

    fn reset(&mut self) {
        self.phasor.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(osc: &mut dyn UGen, ticks: usize) -> Vec<Sample> {
        let mut out = [0.0];
        (0..ticks)
            .map(|t| {
                osc.compute(&ProcessContext::new(8.0, t as u64), &[], &mut out);
                out[0]
            })
            .collect()
    }

    #[test]
    fn test_sine_matches_reference() {
        let mut osc = SinOsc::new();
        osc.prepare(48_000.0);
        osc.set_param(params::FREQ, 1000.0);
        osc.set_param(params::AMPLITUDE, 1.0);

        let samples = run(&mut osc, 64);
        for (n, &s) in samples.iter().enumerate() {
            let expected = (n as f64 * 1000.0 * TAU / 48_000.0).sin();
            assert!((s as f64 - expected).abs() < 1e-4, "tick {n}: {s} vs {expected}");
        }
    }

    #[test]
    fn test_square_levels() {
        let mut osc = SquareOsc::new();
        // 8 ticks per cycle
        osc.prepare(8.0);
        osc.set_param(params::FREQ, 1.0);

        let samples = run(&mut osc, 8);
        assert_eq!(samples[0], -0.5);
        assert_eq!(samples[1], 0.5);
        assert_eq!(samples[3], 0.5);
        assert!(samples.iter().all(|s| s.abs() == 0.5));
    }

    #[test]
    fn test_saw_ramps_within_range() {
        let mut osc = SawOsc::new();
        osc.prepare(8.0);
        osc.set_param(params::FREQ, 1.0);
        osc.set_param(params::AMPLITUDE, 1.0);

        let samples = run(&mut osc, 4);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 0.25).abs() < 1e-6);
        assert!((samples[2] - 0.5).abs() < 1e-6);
        assert!(run(&mut osc, 32).iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_triangle_peaks() {
        let mut osc = TriOsc::new();
        osc.prepare(8.0);
        osc.set_param(params::FREQ, 1.0);
        osc.set_param(params::AMPLITUDE, 1.0);

        let samples = run(&mut osc, 4);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 0.5).abs() < 1e-6);
        assert!((samples[2] - 1.0).abs() < 1e-6);
        assert!((samples[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_pulse_width_moves_threshold() {
        let high_ticks = |width: f32| {
            let mut osc = PulseOsc::new();
            osc.prepare(8.0);
            osc.set_param(params::FREQ, 1.0);
            osc.set_param(params::PULSE_WIDTH, width);
            run(&mut osc, 8).iter().filter(|&&s| s > 0.0).count()
        };

        // A wider setting raises the threshold, leaving fewer high ticks
        assert!(high_ticks(1.0) < high_ticks(0.5));
        assert!(high_ticks(0.5) < high_ticks(0.0));
    }

    #[test]
    fn test_out_of_range_params_are_ignored() {
        let mut osc = PulseOsc::new();
        osc.set_param(params::FREQ, -10.0);
        osc.set_param(params::AMPLITUDE, -1.0);
        osc.set_param(params::PHASE, 4.0);
        osc.set_param(params::PULSE_WIDTH, 1.5);

        assert_eq!(osc.param(params::FREQ), Some(440.0));
        assert_eq!(osc.param(params::AMPLITUDE), Some(0.5));
        assert_eq!(osc.param(params::PHASE), Some(0.0));
        assert_eq!(osc.param(params::PULSE_WIDTH), Some(0.5));
    }
}
