// src/event.rs

use std::collections::VecDeque;

use slotmap::new_key_type;

use crate::shred::ShredId;

new_key_type! {
    /// Handle to an event owned by the engine.
    pub struct EventId;
}

/// ===============================
/// Event payload
/// ===============================

/// Data handed to a shred when it is resumed.
///
/// Time-driven resumptions receive `Value::None`; event-driven resumptions
/// receive whatever was passed to `signal`/`broadcast`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

/// ===============================
/// Wait/notify channel
/// ===============================

/// A FIFO list of shreds waiting to be woken.
///
/// This struct:
/// - does NOT own the shreds (the scheduler does)
/// - is NOT part of the time queue
/// - only stores ids, so a killed shred can be removed from the middle
///
/// Waking is driven by the engine, which pops ids from here and resumes them.
#[derive(Debug, Default)]
pub struct Event {
    waiters: VecDeque<ShredId>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a waiter. Called by the scheduler when a shred yields this event.
    pub(crate) fn enqueue_waiter(&mut self, shred: ShredId) {
        self.waiters.push_back(shred);
    }

    /// Earliest waiter, removed from the list.
    pub(crate) fn pop_waiter(&mut self) -> Option<ShredId> {
        self.waiters.pop_front()
    }

    /// All current waiters in arrival order; the list is left empty.
    ///
    /// Shreds that register while the snapshot is being resumed land in the
    /// fresh list and are not part of it.
    pub(crate) fn take_waiters(&mut self) -> VecDeque<ShredId> {
        std::mem::take(&mut self.waiters)
    }

    /// Remove one waiter wherever it sits. Returns whether it was present.
    pub(crate) fn remove_waiter(&mut self, shred: ShredId) -> bool {
        match self.waiters.iter().position(|&id| id == shred) {
            Some(pos) => {
                self.waiters.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_idle(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<ShredId> {
        let mut arena: SlotMap<ShredId, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn test_event_is_fifo() {
        let shreds = ids(3);
        let mut event = Event::new();
        for &id in &shreds {
            event.enqueue_waiter(id);
        }

        assert_eq!(event.pop_waiter(), Some(shreds[0]));
        assert_eq!(event.pop_waiter(), Some(shreds[1]));
        assert_eq!(event.pop_waiter(), Some(shreds[2]));
        assert_eq!(event.pop_waiter(), None);
    }

    #[test]
    fn test_remove_waiter_from_middle() {
        let shreds = ids(3);
        let mut event = Event::new();
        for &id in &shreds {
            event.enqueue_waiter(id);
        }

        assert!(event.remove_waiter(shreds[1]));
        assert!(!event.remove_waiter(shreds[1]));
        assert_eq!(event.waiter_count(), 2);
        assert_eq!(event.pop_waiter(), Some(shreds[0]));
        assert_eq!(event.pop_waiter(), Some(shreds[2]));
    }

    #[test]
    fn test_take_waiters_clears_list() {
        let shreds = ids(2);
        let mut event = Event::new();
        event.enqueue_waiter(shreds[0]);
        event.enqueue_waiter(shreds[1]);

        let snapshot = event.take_waiters();
        assert_eq!(snapshot.len(), 2);
        assert!(event.is_idle());

        event.enqueue_waiter(shreds[0]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(event.waiter_count(), 1);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(7), Value::Int(7));
        assert_eq!(Value::from(0.5f64).as_float(), Some(0.5));
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::from("hi").as_text(), Some("hi"));
        assert!(Value::from(()).is_none());
        assert_eq!(Value::None.as_int(), None);
    }
}
