// src/lib.rs
//
// Library entry point: a sample-accurate shred scheduler driving a pull-based
// unit generator graph.

mod audio_buffer;
mod clock;
mod engine;
mod error;
mod event;
mod graph;
mod node;
mod route;
mod scheduler;
mod shred;

pub mod nodes;

// Re-export key types for Rust consumers
pub use audio_buffer::AudioBuffer;
pub use clock::{Clock, Tick};
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, EngineResult, GraphError, GraphResult, RouteError};
pub use event::{Event, EventId, Value};
pub use graph::{Graph, NodeId};
pub use node::{ProcessContext, Sample, UGen};
pub use route::Route;
pub use scheduler::{Scheduler, SchedulerStats, ShredState};
pub use shred::{FnShred, Shred, ShredId, Suspend};
