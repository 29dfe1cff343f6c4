// src/engine.rs

use log::{debug, trace};

use crate::audio_buffer::AudioBuffer;
use crate::clock::{Clock, Tick};
use crate::error::{EngineError, EngineResult, GraphError};
use crate::event::{EventId, Value};
use crate::graph::{Graph, NodeId};
use crate::node::{Sample, UGen};
use crate::nodes::{Adc, Dac};
use crate::scheduler::{Scheduler, SchedulerStats, ShredState};
use crate::shred::{FnShred, Shred, ShredId, Suspend};

const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;
const DEFAULT_CHANNELS: usize = 2;

/// Host-provided settings, fixed for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Ticks per second. Only oscillators and the duration helpers use it.
    pub sample_rate: f64,
    /// Adc channel count.
    pub input_channels: usize,
    /// Dac channel count, the size of a rendered frame.
    pub output_channels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            input_channels: DEFAULT_CHANNELS,
            output_channels: DEFAULT_CHANNELS,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_input_channels(mut self, channels: usize) -> Self {
        self.input_channels = channels;
        self
    }

    pub fn with_output_channels(mut self, channels: usize) -> Self {
        self.output_channels = channels;
        self
    }
}

/// The whole runtime: clock, shreds, events and the unit generator graph.
///
/// This struct:
/// - is single-threaded and owns all its state (no globals)
/// - is handed to every shred on every resumption
/// - advances time only through `tick()`
///
/// One `tick()` resumes every shred due now (including shreds woken or
/// rescheduled during that same pass), pulls the Dac, records its input frame
/// and advances the clock.
pub struct Engine {
    config: EngineConfig,
    clock: Clock,
    scheduler: Scheduler,
    graph: Graph,

    adc: NodeId,
    dac: NodeId,

    /// Last rendered Dac frame.
    frame: Vec<Sample>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut graph = Graph::new(config.sample_rate);
        let adc = graph.add_node(Box::new(Adc::new(config.input_channels)));
        let dac = graph.add_node(Box::new(Dac::new(config.output_channels)));

        debug!(
            "engine created: {} Hz, {} in, {} out",
            config.sample_rate, config.input_channels, config.output_channels
        );

        Self {
            config,
            clock: Clock::new(config.sample_rate),
            scheduler: Scheduler::new(),
            graph,
            adc,
            dac,
            frame: vec![0.0; config.output_channels],
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -------------------------------
    // MARK: Time
    // -------------------------------

    #[inline]
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    #[inline]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn ms(&self, ms: f64) -> Tick {
        self.clock.ms(ms)
    }

    pub fn seconds(&self, seconds: f64) -> Tick {
        self.clock.seconds(seconds)
    }

    pub fn minutes(&self, minutes: f64) -> Tick {
        self.clock.minutes(minutes)
    }

    pub fn hours(&self, hours: f64) -> Tick {
        self.clock.hours(hours)
    }

    // -------------------------------
    // MARK: Shreds
    // -------------------------------

    /// Start a shred. Its first resumption happens during the current tick.
    pub fn spork<S>(&mut self, shred: S) -> ShredId
    where
        S: Shred + 'static,
    {
        self.spork_boxed(Box::new(shred))
    }

    pub fn spork_boxed(&mut self, shred: Box<dyn Shred>) -> ShredId {
        self.scheduler.insert(shred, self.clock.now())
    }

    /// Start a closure as a shred.
    pub fn spork_fn<F>(&mut self, body: F) -> ShredId
    where
        F: FnMut(&mut Engine, Value) -> Suspend + 'static,
    {
        self.spork(FnShred::new(body))
    }

    /// Stop a shred wherever it is. Idempotent.
    pub fn kill(&mut self, id: ShredId) -> bool {
        self.scheduler.kill(id)
    }

    #[inline]
    pub fn is_alive(&self, id: ShredId) -> bool {
        self.scheduler.is_alive(id)
    }

    pub fn shred_state(&self, id: ShredId) -> Option<ShredState> {
        self.scheduler.state(id)
    }

    /// Tick at which a time-queued shred is due; `None` otherwise.
    pub fn next_wakeup(&self, id: ShredId) -> Option<Tick> {
        match self.scheduler.state(id)? {
            ShredState::Queued(at) => Some(at),
            ShredState::Waiting(_) | ShredState::Running => None,
        }
    }

    pub fn shred_count(&self) -> usize {
        self.scheduler.shred_count()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Resume every shred due now, until none are left.
    ///
    /// Shreds queued for the current tick while this runs (immediate
    /// reschedules, zero delays, fresh sporks) run before it returns.
    pub fn run_due_shreds(&mut self) {
        let now = self.clock.now();
        while let Some(id) = self.scheduler.pop_due(now) {
            self.resume(id, Value::None);
        }
    }

    /// Run one shred to its next suspension point and act on the request.
    fn resume(&mut self, id: ShredId, input: Value) {
        let Some(mut body) = self.scheduler.begin_resume(id) else {
            debug!("resume: shred {:?} is gone", id);
            return;
        };

        trace!("resuming shred {:?} at tick {}", id, self.clock.now());
        let request = body.resume(self, input);
        trace!("shred {:?} suspended with {:?}", id, request);

        self.scheduler.end_resume(id, body, request, self.clock.now());
    }

    // -------------------------------
    // MARK: Events
    // -------------------------------

    pub fn create_event(&mut self) -> EventId {
        self.scheduler.create_event()
    }

    /// Wake the earliest waiter of `event` with `data`, right now.
    ///
    /// The woken shred runs before this returns, and its next suspension is
    /// handled immediately. Returns whether a shred was woken.
    pub fn signal(&mut self, event: EventId, data: impl Into<Value>) -> bool {
        match self.scheduler.pop_waiter(event) {
            Some(id) => {
                self.resume(id, data.into());
                true
            }
            None => false,
        }
    }

    /// Wake every current waiter of `event` with the same `data`, in order.
    ///
    /// Shreds that start waiting on `event` during the broadcast are left for
    /// the next one. Returns how many shreds were woken.
    pub fn broadcast(&mut self, event: EventId, data: impl Into<Value>) -> usize {
        let data = data.into();
        let waiters = self.scheduler.take_waiters(event);
        let count = waiters.len();
        for id in waiters {
            self.resume(id, data.clone());
        }
        count
    }

    /// Number of shreds currently waiting on `event`.
    pub fn waiting_on(&self, event: EventId) -> usize {
        self.scheduler
            .event(event)
            .map_or(0, |event| event.waiter_count())
    }

    /// Delete an event, killing its waiters. `None` for an unknown event.
    pub fn remove_event(&mut self, event: EventId) -> Option<usize> {
        self.scheduler.remove_event(event)
    }

    // -------------------------------
    // MARK: Graph
    // -------------------------------

    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[inline]
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Add a node to the graph.
    pub fn add_node<U>(&mut self, ugen: U) -> NodeId
    where
        U: UGen + 'static,
    {
        self.graph.add_node(Box::new(ugen))
    }

    /// Connect `source` into `target` with the default route.
    pub fn connect(&mut self, source: NodeId, target: NodeId) -> EngineResult<()> {
        Ok(self.graph.add_source(target, source)?)
    }

    pub fn disconnect(&mut self, source: NodeId, target: NodeId) -> bool {
        self.graph.remove_source(target, source)
    }

    #[inline]
    pub fn adc(&self) -> NodeId {
        self.adc
    }

    #[inline]
    pub fn dac(&self) -> NodeId {
        self.dac
    }

    /// Place one captured input frame in the Adc for the coming tick.
    pub fn capture(&mut self, frame: &[Sample]) -> EngineResult<()> {
        let outputs = self
            .graph
            .output_mut(self.adc)
            .ok_or(GraphError::UnknownNode(self.adc))?;

        if frame.len() != outputs.len() {
            return Err(EngineError::FrameMismatch {
                len: frame.len(),
                channels: outputs.len(),
            });
        }
        outputs.copy_from_slice(frame);
        Ok(())
    }

    /// Reset all node state and memo stamps.
    pub fn reset_graph(&mut self) {
        self.graph.reset();
        self.frame.fill(0.0);
    }

    // -------------------------------
    // MARK: Driver loop
    // -------------------------------

    /// Run one logical tick and return the rendered Dac frame.
    ///
    /// A graph error (such as a cycle) is returned before the clock moves.
    pub fn tick(&mut self) -> EngineResult<&[Sample]> {
        self.run_due_shreds();

        let now = self.clock.now();
        self.graph.pull(self.dac, now)?;
        if let Some(rendered) = self.graph.input(self.dac) {
            self.frame.copy_from_slice(rendered);
        }

        self.clock.advance();
        Ok(&self.frame)
    }

    /// Last frame rendered by `tick()`.
    pub fn last_frame(&self) -> &[Sample] {
        &self.frame
    }

    /// Render into an interleaved output buffer, one tick per frame.
    ///
    /// Returns the number of frames rendered.
    pub fn render(&mut self, output: &mut [Sample]) -> EngineResult<usize> {
        let channels = self.config.output_channels;
        let len = output.len();
        let mut output = AudioBuffer::new(output, channels)
            .ok_or(EngineError::FrameMismatch { len, channels })?;

        for frame in output.frames_mut() {
            frame.copy_from_slice(self.tick()?);
        }
        Ok(output.frames)
    }

    /// Duplex processing, the way an audio device callback drives the engine.
    ///
    /// For each frame: the input frame goes to the Adc, one tick runs, and
    /// the Dac frame is written out. Both buffers are interleaved.
    pub fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> EngineResult<usize> {
        let in_channels = self.config.input_channels;
        let out_channels = self.config.output_channels;
        let len = output.len();
        let mut output = AudioBuffer::new(output, out_channels).ok_or(
            EngineError::FrameMismatch {
                len,
                channels: out_channels,
            },
        )?;
        let frames = output.frames;

        if input.len() != frames * in_channels {
            if in_channels == 0 || input.len() % in_channels != 0 {
                return Err(EngineError::FrameMismatch {
                    len: input.len(),
                    channels: in_channels,
                });
            }
            return Err(EngineError::FrameCountMismatch {
                input_frames: input.len() / in_channels,
                output_frames: frames,
            });
        }

        for (index, frame) in output.frames_mut().enumerate() {
            let start = index * in_channels;
            self.capture(&input[start..start + in_channels])?;
            frame.copy_from_slice(self.tick()?);
        }

        Ok(frames)
    }
}
