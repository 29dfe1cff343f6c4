// src/node.rs

use crate::clock::Tick;

/// One audio value. Nominal range is [-1.0, 1.0]; nothing here clips.
pub type Sample = f32;

/// Context passed to nodes during computation.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    /// Sample rate (ticks per second)
    pub sample_rate: f64,

    /// Tick being rendered
    pub tick: Tick,
}

impl ProcessContext {
    pub fn new(sample_rate: f64, tick: Tick) -> Self {
        Self { sample_rate, tick }
    }
}

/// Core unit generator trait.
///
/// Nodes:
/// - do NOT know about the graph or scheduling
/// - do NOT pull their sources (the graph does, before `compute`)
/// - ONLY turn the current input frame and their own state into an output frame
///
/// Port counts are fixed for the node's lifetime.
pub trait UGen {
    /// Number of input ports.
    fn num_inputs(&self) -> usize;

    /// Number of output ports.
    fn num_outputs(&self) -> usize;

    /// Called when the node joins a graph, and again on sample rate changes.
    fn prepare(&mut self, _sample_rate: f64) {}

    /// Produce one output frame.
    ///
    /// Called at most once per tick. `input` already holds the mixed
    /// contributions of every source; `output` still holds the previous
    /// frame.
    fn compute(&mut self, ctx: &ProcessContext, input: &[Sample], output: &mut [Sample]);

    /// Set a parameter value. Unknown ids are ignored.
    fn set_param(&mut self, _param_id: u32, _value: f32) {}

    /// Read back a parameter value.
    fn param(&self, _param_id: u32) -> Option<f32> {
        None
    }

    /// Reset node state.
    fn reset(&mut self) {}
}
