// src/scheduler.rs

use std::collections::{BTreeMap, VecDeque};

use log::{debug, error, warn};
use slotmap::SlotMap;

use crate::clock::Tick;
use crate::event::{Event, EventId};
use crate::shred::{Shred, ShredId, Suspend};

/// Where a live shred currently is.
///
/// A shred is in exactly one of these places: it is never time-queued and
/// event-queued at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShredState {
    /// In the time queue, due at this tick.
    Queued(Tick),

    /// In an event's waiter list.
    Waiting(EventId),

    /// Currently executing (its body is on loan to the engine).
    Running,
}

/// Counters for everything the scheduler did, including anomalies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub sporked: u64,
    pub resumed: u64,
    pub completed: u64,
    pub killed: u64,

    /// Shreds dropped because of an invalid suspension request.
    pub invalid: u64,

    /// Negative delays treated as zero.
    pub clamped_delays: u64,
}

struct ShredSlot {
    /// `None` while the shred is running.
    body: Option<Box<dyn Shred>>,
    state: ShredState,

    /// Kill requested while running; honored once it yields.
    killed: bool,
}

/// Owns every shred and event, and the time queue.
///
/// This struct:
/// - interprets suspension requests
/// - keeps a bucket per tick, FIFO within a bucket
/// - does NOT run shreds itself (the engine does, since shreds need it)
pub struct Scheduler {
    shreds: SlotMap<ShredId, ShredSlot>,
    events: SlotMap<EventId, Event>,

    /// Tick -> shreds due at that tick, in insertion order.
    queue: BTreeMap<Tick, VecDeque<ShredId>>,

    stats: SchedulerStats,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            shreds: SlotMap::with_key(),
            events: SlotMap::with_key(),
            queue: BTreeMap::new(),
            stats: SchedulerStats::default(),
        }
    }

    // -------------------------------
    // MARK: Shred lifecycle
    // -------------------------------

    /// Take ownership of a new shred and queue it at `now`.
    pub fn insert(&mut self, body: Box<dyn Shred>, now: Tick) -> ShredId {
        let id = self.shreds.insert(ShredSlot {
            body: Some(body),
            state: ShredState::Queued(now),
            killed: false,
        });
        self.push_bucket(now, id);
        self.stats.sporked += 1;
        debug!("sporked shred {:?} at tick {}", id, now);
        id
    }

    /// Remove a shred from wherever it is and run its cleanup.
    ///
    /// Killing a finished, unknown or already killed shred does nothing.
    /// Killing the running shred takes effect when it yields.
    /// Returns whether a live shred was found.
    pub fn kill(&mut self, id: ShredId) -> bool {
        let Some(slot) = self.shreds.get_mut(id) else {
            debug!("kill: shred {:?} is not alive", id);
            return false;
        };

        match slot.state {
            ShredState::Running => {
                slot.killed = true;
                return true;
            }
            ShredState::Queued(tick) => self.remove_from_bucket(tick, id),
            ShredState::Waiting(event) => {
                if let Some(event) = self.events.get_mut(event) {
                    event.remove_waiter(id);
                }
            }
        }

        if let Some(slot) = self.shreds.remove(id) {
            if let Some(mut body) = slot.body {
                body.cancel();
            }
        }
        self.stats.killed += 1;
        debug!("killed shred {:?}", id);
        true
    }

    #[inline]
    pub fn is_alive(&self, id: ShredId) -> bool {
        self.shreds.contains_key(id)
    }

    pub fn state(&self, id: ShredId) -> Option<ShredState> {
        self.shreds.get(id).map(|slot| slot.state)
    }

    /// Number of live shreds (queued, waiting or running).
    pub fn shred_count(&self) -> usize {
        self.shreds.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    // -------------------------------
    // MARK: Resumption protocol
    // -------------------------------

    /// Pop the next shred due at or before `now`.
    ///
    /// Buckets are checked again on every call, so shreds queued for `now`
    /// while the tick is being drained are returned by later calls.
    pub fn pop_due(&mut self, now: Tick) -> Option<ShredId> {
        loop {
            let mut entry = self.queue.first_entry()?;
            if *entry.key() > now {
                return None;
            }
            match entry.get_mut().pop_front() {
                Some(id) => {
                    if entry.get().is_empty() {
                        entry.remove();
                    }
                    return Some(id);
                }
                None => {
                    entry.remove();
                }
            }
        }
    }

    /// Whether anything is due at or before `now`.
    pub fn has_due(&self, now: Tick) -> bool {
        self.queue
            .first_key_value()
            .is_some_and(|(&tick, bucket)| tick <= now && !bucket.is_empty())
    }

    /// Lend a shred's body out for resumption.
    ///
    /// Returns `None` if the shred is gone or already running.
    pub(crate) fn begin_resume(&mut self, id: ShredId) -> Option<Box<dyn Shred>> {
        let slot = self.shreds.get_mut(id)?;
        let body = slot.body.take()?;
        slot.state = ShredState::Running;
        self.stats.resumed += 1;
        Some(body)
    }

    /// Take the body back and act on what the shred asked for.
    pub(crate) fn end_resume(
        &mut self,
        id: ShredId,
        mut body: Box<dyn Shred>,
        request: Suspend,
        now: Tick,
    ) {
        let killed = self.shreds.get(id).is_none_or(|slot| slot.killed);
        if killed {
            self.shreds.remove(id);
            body.cancel();
            self.stats.killed += 1;
            debug!("killed shred {:?} after its resumption", id);
            return;
        }

        match request {
            Suspend::Done => {
                self.shreds.remove(id);
                self.stats.completed += 1;
                debug!("shred {:?} completed at tick {}", id, now);
            }

            Suspend::Immediate => self.requeue(id, body, now),

            Suspend::Delay(delay) => {
                let delay = if delay < 0 {
                    warn!(
                        "shred {:?} yielded negative delay {}, treating it as 0",
                        id, delay
                    );
                    self.stats.clamped_delays += 1;
                    0
                } else {
                    delay as u64
                };

                match now.checked_add(delay) {
                    Some(at) => self.requeue(id, body, at),
                    None => self.drop_invalid(id, body, "delay overflows the clock"),
                }
            }

            Suspend::WaitOn(event_id) => match self.events.get_mut(event_id) {
                Some(event) => {
                    event.enqueue_waiter(id);
                    if let Some(slot) = self.shreds.get_mut(id) {
                        slot.body = Some(body);
                        slot.state = ShredState::Waiting(event_id);
                    }
                }
                None => self.drop_invalid(id, body, "waiting on an event that does not exist"),
            },
        }
    }

    fn requeue(&mut self, id: ShredId, body: Box<dyn Shred>, at: Tick) {
        if let Some(slot) = self.shreds.get_mut(id) {
            slot.body = Some(body);
            slot.state = ShredState::Queued(at);
            self.push_bucket(at, id);
        }
    }

    fn drop_invalid(&mut self, id: ShredId, mut body: Box<dyn Shred>, reason: &str) {
        error!("dropping shred {:?}: invalid suspension ({})", id, reason);
        self.shreds.remove(id);
        body.cancel();
        self.stats.invalid += 1;
    }

    // -------------------------------
    // MARK: Events
    // -------------------------------

    pub fn create_event(&mut self) -> EventId {
        self.events.insert(Event::new())
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(id)
    }

    /// Earliest waiter of an event, removed from its list.
    pub(crate) fn pop_waiter(&mut self, event: EventId) -> Option<ShredId> {
        self.events.get_mut(event)?.pop_waiter()
    }

    /// Every current waiter of an event; the list is left empty.
    pub(crate) fn take_waiters(&mut self, event: EventId) -> VecDeque<ShredId> {
        self.events
            .get_mut(event)
            .map(Event::take_waiters)
            .unwrap_or_default()
    }

    /// Delete an event and kill every shred still waiting on it.
    ///
    /// Returns how many waiters were killed, or `None` for an unknown event.
    pub fn remove_event(&mut self, id: EventId) -> Option<usize> {
        let mut event = self.events.remove(id)?;
        let waiters = event.take_waiters();
        if !waiters.is_empty() {
            warn!(
                "removing event {:?} with {} waiting shred(s); killing them",
                id,
                waiters.len()
            );
        }
        let count = waiters.len();
        for shred in waiters {
            self.kill(shred);
        }
        Some(count)
    }

    // -------------------------------
    // MARK: Queue internals
    // -------------------------------

    fn push_bucket(&mut self, at: Tick, id: ShredId) {
        self.queue.entry(at).or_default().push_back(id);
    }

    fn remove_from_bucket(&mut self, at: Tick, id: ShredId) {
        if let Some(bucket) = self.queue.get_mut(&at) {
            bucket.retain(|&queued| queued != id);
            if bucket.is_empty() {
                self.queue.remove(&at);
            }
        }
    }

    /// Number of shreds due at exactly `at`.
    pub fn due_at(&self, at: Tick) -> usize {
        self.queue.get(&at).map_or(0, VecDeque::len)
    }
}
