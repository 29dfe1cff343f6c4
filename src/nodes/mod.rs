// src/nodes/mod.rs
//
// Standard unit generators: the hardware boundary plus a small set of
// oscillators and utilities.

mod io;
mod oscillators;
mod utility;

pub use io::*;
pub use oscillators::*;
pub use utility::*;

// ═══════════════════════════════════════════════════════════════════
// Parameter IDs (per-node-type)
// ═══════════════════════════════════════════════════════════════════

pub mod params {
    // Oscillator params
    pub const FREQ: u32 = 0;
    pub const PHASE: u32 = 2;
    pub const PULSE_WIDTH: u32 = 3;
    pub const AMPLITUDE: u32 = 4;

    // Gain params
    pub const GAIN: u32 = 0;

    // Constant params
    pub const VALUE: u32 = 0;
}
