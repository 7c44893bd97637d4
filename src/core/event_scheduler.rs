use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use super::signal::Signal;
use super::types::{ElementId, SimTime};

/// What a scheduled event asks its target element to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// A net feeding one of the element's inputs changed; recompute.
    InputsChanged,
    /// The element's own delay elapsed; assert this value on the
    /// outputs. A fully-floating value is the tri-state release.
    Commit(Signal),
    /// Memory write commit.
    Store { addr: u64, data: Signal },
    /// State machine commit: enter the state with this index.
    Transition(usize),
}

impl Payload {
    /// Short tag used by the event log and debug output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::InputsChanged => "inputs_changed",
            Payload::Commit(_) => "commit",
            Payload::Store { .. } => "store",
            Payload::Transition(_) => "transition",
        }
    }
}

/// One entry in the pending-event queue.
#[derive(Debug, Clone, Copy)]
pub struct SimEvent {
    pub time: SimTime,
    pub seq: u64,
    pub target: ElementId,
    pub payload: Payload,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for SimEvent {}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default).
        // Ties at equal time fall back to insertion sequence, so same-time
        // events pop strictly FIFO.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Time-ordered pending-event queue keyed by `(time, insertion sequence)`.
pub struct EventQueue {
    heap: BinaryHeap<SimEvent>,
    sequence_counter: u64,
    /// Latest popped time. Scheduling behind it is a timing-model bug.
    floor: SimTime,
}

/// Serializable snapshot of one processed event, kept by the optional
/// simulator event log.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventRecord {
    pub time: SimTime,
    pub seq: u64,
    pub target: ElementId,
    pub kind: &'static str,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            sequence_counter: 0,
            floor: 0,
        }
    }

    /// Queue an event. Panics if `time` is behind the last popped time:
    /// an element scheduling into the past is a bug in its timing model,
    /// not a recoverable condition.
    pub fn schedule(&mut self, time: SimTime, target: ElementId, payload: Payload) {
        assert!(
            time >= self.floor,
            "event for {} scheduled at t={} behind current time t={}",
            target,
            time,
            self.floor
        );
        let event = SimEvent {
            time,
            seq: self.sequence_counter,
            target,
            payload,
        };
        self.heap.push(event);
        self.sequence_counter += 1;
    }

    /// Remove and return the earliest event, advancing the time floor.
    pub fn pop(&mut self) -> Option<SimEvent> {
        let event = self.heap.pop();
        if let Some(ev) = &event {
            self.floor = ev.time;
        }
        event
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|ev| ev.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Move the floor forward without popping, for time jumps between
    /// events.
    pub fn advance_floor(&mut self, time: SimTime) {
        if time > self.floor {
            self.floor = time;
        }
    }

    /// Drop all pending events and restart time at zero.
    pub fn reset(&mut self) {
        self.heap.clear();
        self.sequence_counter = 0;
        self.floor = 0;
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
