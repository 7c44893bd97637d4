//! The simulation driver.
//!
//! Owns the event queue, the clock reading `now`, the run statistics and
//! the optional traces. The netlist is passed into each call so circuit
//! editing between runs needs no shared ownership; during `step` the
//! simulator is the only writer.

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use super::elements::{Element, ReactCtx};
use super::errors::CircuitError;
use super::event_scheduler::{EventQueue, EventRecord, Payload};
use super::netlist::Netlist;
use super::signal::Signal;
use super::types::{ElementId, PinId, PinKind, SimTime};

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    /// Events popped from the queue.
    pub events_processed: u64,
    /// Phase-B events among them (commits, stores, transitions).
    pub commits: u64,
    /// Phase-A recomputes suppressed by the pending-value comparison.
    pub coalesced: u64,
    /// Nets whose active drivers started disagreeing.
    pub drive_conflicts: u64,
    /// Net resolutions that produced a new value.
    pub net_updates: u64,
}

/// One watched-pin observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub time: SimTime,
    pub pin: PinId,
    pub value: Signal,
}

/// Discrete-event simulation loop over a netlist.
#[derive(Default)]
pub struct Simulator {
    queue: EventQueue,
    now: SimTime,
    stats: SimStats,
    watches: BTreeSet<PinId>,
    trace: Vec<TraceRecord>,
    event_log: Option<Vec<EventRecord>>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the run and bring the circuit to its defined start state:
    /// rebuild the net partition, reset every element in id order, then
    /// post a time-zero recompute to each element listening on at least
    /// one attached input so combinational logic settles against the
    /// reset values.
    pub fn init_sim(&mut self, netlist: &mut Netlist) -> Result<(), CircuitError> {
        self.queue.reset();
        self.now = 0;
        self.stats = SimStats::default();
        self.trace.clear();
        if let Some(log) = &mut self.event_log {
            log.clear();
        }

        netlist.repartition()?;

        let (elements, graph) = netlist.split_mut();
        let mut listeners = vec![false; elements.len()];
        for (index, element) in elements.iter_mut().enumerate() {
            let mut ctx = ReactCtx {
                graph: &mut *graph,
                queue: &mut self.queue,
                stats: &mut self.stats,
                watches: &self.watches,
                trace: &mut self.trace,
                now: 0,
                target: ElementId(index),
            };
            element.init_sim(&mut ctx);
        }
        // The reset assertions above are setup, not part of the run;
        // counters start at zero from here
        self.stats = SimStats::default();
        for pin in &graph.pins {
            if pin.kind == PinKind::Input && pin.net.is_some() {
                listeners[pin.element.index()] = true;
            }
        }
        for (index, listens) in listeners.iter().enumerate() {
            if *listens {
                self.queue.schedule(0, ElementId(index), Payload::InputsChanged);
            }
        }
        debug!(
            "reset: {} elements, {} nets, {} initial events",
            netlist.element_count(),
            netlist.net_count(),
            self.queue.len()
        );
        Ok(())
    }

    /// Process the earliest pending event. Returns its time, or `None`
    /// when the queue is empty.
    pub fn step(&mut self, netlist: &mut Netlist) -> Option<SimTime> {
        let event = self.queue.pop()?;
        self.now = event.time;
        self.stats.events_processed += 1;
        if !matches!(event.payload, Payload::InputsChanged) {
            self.stats.commits += 1;
        }
        if let Some(log) = &mut self.event_log {
            log.push(EventRecord {
                time: event.time,
                seq: event.seq,
                target: event.target,
                kind: event.payload.kind_name(),
            });
        }

        let (elements, graph) = netlist.split_mut();
        let element = &mut elements[event.target.index()];
        debug!(
            "t={} seq={}: {} for {} '{}'",
            event.time,
            event.seq,
            event.payload.kind_name(),
            event.target,
            element.label()
        );
        let mut ctx = ReactCtx {
            graph,
            queue: &mut self.queue,
            stats: &mut self.stats,
            watches: &self.watches,
            trace: &mut self.trace,
            now: event.time,
            target: event.target,
        };
        element.react(event.time, event.payload, &mut ctx);
        Some(event.time)
    }

    /// Run every event up to and including time `until`, then advance
    /// the clock there even if nothing was pending.
    pub fn run_until(&mut self, netlist: &mut Netlist, until: SimTime) {
        while self.queue.peek_time().is_some_and(|t| t <= until) {
            self.step(netlist);
        }
        self.now = until;
        self.queue.advance_floor(until);
    }

    /// Drain the queue completely. Returns false when `max_events` runs
    /// out first, which is how a self-perpetuating circuit (one with a
    /// clock, or an unstable loop) is detected.
    pub fn run_to_quiescence(&mut self, netlist: &mut Netlist, max_events: Option<u64>) -> bool {
        let mut processed = 0u64;
        while !self.queue.is_empty() {
            if max_events.is_some_and(|cap| processed >= cap) {
                return false;
            }
            self.step(netlist);
            processed += 1;
        }
        true
    }

    /// Retarget a constant element and drive the new value at the
    /// current time. Driving the fully-floating value releases the
    /// constant's net.
    pub fn set_constant(
        &mut self,
        netlist: &mut Netlist,
        id: ElementId,
        value: Signal,
    ) -> Result<(), CircuitError> {
        let out = match netlist.element_mut(id)? {
            Element::Constant(k) => {
                if value.width() != k.value.width() {
                    return Err(CircuitError::BadConfig(format!(
                        "constant '{}' is {} bits wide, got a {}-bit value",
                        k.label,
                        k.value.width(),
                        value.width()
                    )));
                }
                k.value = value;
                k.out
            }
            _ => {
                return Err(CircuitError::WrongElementKind {
                    element: id,
                    expected: "constant",
                })
            }
        };
        let (_, graph) = netlist.split_mut();
        let mut ctx = ReactCtx {
            graph,
            queue: &mut self.queue,
            stats: &mut self.stats,
            watches: &self.watches,
            trace: &mut self.trace,
            now: self.now,
            target: id,
        };
        ctx.assert_pin(out, value);
        Ok(())
    }

    // --- observation -----------------------------------------------------

    /// Record every value change on the pin's net into the trace.
    pub fn watch(&mut self, pin: PinId) {
        self.watches.insert(pin);
    }

    pub fn unwatch(&mut self, pin: PinId) {
        self.watches.remove(&pin);
    }

    pub fn trace(&self) -> &[TraceRecord] {
        &self.trace
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Toggle the per-event log. Enabling keeps any records already
    /// collected; disabling drops them.
    pub fn record_events(&mut self, enable: bool) {
        if enable {
            self.event_log.get_or_insert_with(Vec::new);
        } else {
            self.event_log = None;
        }
    }

    pub fn event_log(&self) -> Option<&[EventRecord]> {
        self.event_log.as_deref()
    }

    /// Snapshot of the run counters as JSON, for dashboards and logs.
    pub fn export_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "time": self.now,
            "pending_events": self.queue.len(),
            "stats": self.stats,
        })
    }
}
