// Hardware boundary nodes.
//
// The Dac is where the graph is pulled from; its input frame is the rendered
// sample frame. The Adc is where captured samples enter; the engine writes its
// output frame directly before each tick is rendered.

use crate::node::{ProcessContext, Sample, UGen};

// ═══════════════════════════════════════════════════════════════════
// Dac (sink)
// ═══════════════════════════════════════════════════════════════════

/// Sink with `channels` inputs and no outputs.
pub struct Dac {
    channels: usize,
}

impl Dac {
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }
}

impl UGen for Dac {
    fn num_inputs(&self) -> usize {
        self.channels
    }

    fn num_outputs(&self) -> usize {
        0
    }

    fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], _output: &mut [Sample]) {
        // The mixed input frame is the result; nothing to do.
    }
}

// ═══════════════════════════════════════════════════════════════════
// Adc (source)
// ═══════════════════════════════════════════════════════════════════

/// Source with no inputs and `channels` outputs.
///
/// Computing leaves the output frame untouched, so whatever the engine
/// captured into it is what consumers read.
pub struct Adc {
    channels: usize,
}

impl Adc {
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }
}

impl UGen for Adc {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn compute(&mut self, _ctx: &ProcessContext, _input: &[Sample], _output: &mut [Sample]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_arities() {
        let dac = Dac::new(2);
        assert_eq!((dac.num_inputs(), dac.num_outputs()), (2, 0));

        let adc = Adc::new(4);
        assert_eq!((adc.num_inputs(), adc.num_outputs()), (0, 4));
    }

    #[test]
    fn test_adc_keeps_captured_frame() {
        let mut adc = Adc::new(2);
        let mut frame = [0.25, -0.5];
        adc.compute(&ProcessContext::new(44_100.0, 0), &[], &mut frame);
        assert_eq!(frame, [0.25, -0.5]);
    }
}
