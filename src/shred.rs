// src/shred.rs

use slotmap::new_key_type;

use crate::clock::Tick;
use crate::engine::Engine;
use crate::event::{EventId, Value};

new_key_type! {
    /// Handle to a sporked shred, returned by `Engine::spork`.
    ///
    /// Handles are generational: once a shred finishes or is killed its
    /// handle never refers to another shred.
    pub struct ShredId;
}

/// What a shred asks for when it gives control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspend {
    /// Resume after this many ticks. `0` means again during this tick.
    /// Negative values are a usage error and are treated as `0`.
    Delay(i64),

    /// Resume again during this tick, after everything already due.
    Immediate,

    /// Park on an event until it is signaled or broadcast.
    WaitOn(EventId),

    /// The shred is finished and will be discarded.
    Done,
}

impl Suspend {
    /// Delay helper for tick counts coming from the duration helpers.
    #[inline]
    pub fn ticks(ticks: Tick) -> Self {
        Suspend::Delay(i64::try_from(ticks).unwrap_or(i64::MAX))
    }
}

/// A cooperative, resumable computation.
///
/// Shreds:
/// - run only between two yield points, never preempted
/// - receive the whole engine on every resumption
/// - decide their next wake-up through the returned `Suspend`
///
/// The first resumption happens on the tick the shred was sporked and
/// receives `Value::None`.
pub trait Shred {
    /// Run until the next suspension point.
    ///
    /// `input` is `Value::None` for time-driven resumptions and the event
    /// payload for event-driven ones.
    fn resume(&mut self, engine: &mut Engine, input: Value) -> Suspend;

    /// Cleanup when killed before completing. Never resumed afterwards.
    fn cancel(&mut self) {}
}

/// Adapter turning a closure into a shred.
///
/// State lives in the closure's captures; there is no cleanup hook.
pub struct FnShred<F>
where
    F: FnMut(&mut Engine, Value) -> Suspend,
{
    body: F,
}

impl<F> FnShred<F>
where
    F: FnMut(&mut Engine, Value) -> Suspend,
{
    pub fn new(body: F) -> Self {
        Self { body }
    }
}

impl<F> Shred for FnShred<F>
where
    F: FnMut(&mut Engine, Value) -> Suspend,
{
    #[inline]
    fn resume(&mut self, engine: &mut Engine, input: Value) -> Suspend {
        (self.body)(engine, input)
    }
}
