// src/audio_buffer.rs

use crate::node::Sample;

/// Interleaved view over host sample memory.
#[derive(Debug)]
pub struct AudioBuffer<'a> {
    pub channels: usize,
    pub frames: usize,
    pub data: &'a mut [Sample], // interleaved: ch0..chN, frame by frame
}

impl<'a> AudioBuffer<'a> {
    /// Wrap existing data. Returns `None` unless it holds whole frames.
    #[inline]
    pub fn new(data: &'a mut [Sample], channels: usize) -> Option<Self> {
        if channels == 0 || data.len() % channels != 0 {
            return None;
        }
        let frames = data.len() / channels;
        Some(Self {
            channels,
            frames,
            data,
        })
    }

    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    #[inline]
    pub fn frame(&self, index: usize) -> &[Sample] {
        let start = index * self.channels;
        &self.data[start..start + self.channels]
    }

    #[inline]
    pub fn frame_mut(&mut self, index: usize) -> &mut [Sample] {
        let start = index * self.channels;
        &mut self.data[start..start + self.channels]
    }

    /// Iterate over frames, mutably.
    #[inline]
    pub fn frames_mut(&mut self) -> impl Iterator<Item = &mut [Sample]> {
        self.data.chunks_exact_mut(self.channels)
    }
}
