//! Circuit element kinds and the reactive contract they implement.
//!
//! Reactions are two-phase. Phase A (`Payload::InputsChanged`) recomputes
//! from the current inputs and, when the result differs from the cached
//! pending value, schedules one delayed commit. Phase B (the remaining
//! payloads) asserts the carried value onto the output pins; fan-out to
//! listening elements happens at the same instant with no extra delay.

pub mod combinational;
pub mod fsm;
pub mod memory;
pub mod register;
pub mod sources;
pub mod tristate;
pub mod wiring;

pub use combinational::{Adder, Decoder, Gate, GateKind, Mux, TruthTable};
pub use fsm::{ClockEdge, FsmConfig, FsmGuard, FsmStateConfig, FsmTransitionConfig, StateMachine};
pub use memory::{Memory, MemoryKind, WriteRecord};
pub use register::{Register, RegisterKind};
pub use sources::{Clock, Constant};
pub use tristate::TriStateBuffer;
pub use wiring::{Display, DisplayRecord, NamedEndpoint, SubCircuit};

use std::collections::BTreeSet;

use log::warn;

use super::event_scheduler::{EventQueue, Payload};
use super::netlist::graph::Graph;
use super::signal::Signal;
use super::simulator::{SimStats, TraceRecord};
use super::types::{Delay, ElementId, PinId, PinKind, SimTime};

/// Reaction context handed to an element while it runs. Grants exactly
/// what the contract allows: reading inputs, asserting own outputs and
/// scheduling events for itself. Elements never touch each other
/// directly; changes travel through nets and the queue.
pub struct ReactCtx<'a> {
    pub(crate) graph: &'a mut Graph,
    pub(crate) queue: &'a mut EventQueue,
    pub(crate) stats: &'a mut SimStats,
    pub(crate) watches: &'a BTreeSet<PinId>,
    pub(crate) trace: &'a mut Vec<TraceRecord>,
    pub(crate) now: SimTime,
    pub(crate) target: ElementId,
}

impl<'a> ReactCtx<'a> {
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Resolved value on the net behind a pin; the empty signal when the
    /// pin is unattached.
    pub fn input(&self, pin: PinId) -> Signal {
        self.graph.pin_value(pin)
    }

    /// Input read as an integer: floating bits and unattached pins
    /// evaluate as zero.
    pub fn input_bits(&self, pin: PinId) -> u64 {
        self.graph.pin_value(pin).as_u64_lossy()
    }

    /// Single-bit input read with the same zero-when-undriven rule.
    pub fn input_bit(&self, pin: PinId) -> bool {
        self.input_bits(pin) & 1 == 1
    }

    /// Queue an event for the reacting element after `delay` ticks.
    pub fn schedule(&mut self, delay: Delay, payload: Payload) {
        self.queue.schedule(self.now + delay, self.target, payload);
    }

    /// Count a Phase-A recompute that was suppressed because it matched
    /// the pending value.
    pub fn note_coalesced(&mut self) {
        self.stats.coalesced += 1;
    }

    /// Assert a value onto one of the element's own output pins and
    /// re-resolve its net. When the resolved value changes, watched pins
    /// are traced and every element with an input on the net receives a
    /// same-time `InputsChanged` event, in ascending pin order.
    pub fn assert_pin(&mut self, pin: PinId, value: Signal) {
        let p = &mut self.graph.pins[pin.index()];
        debug_assert_eq!(p.kind, PinKind::Output, "inputs cannot drive a net");
        assert_eq!(
            value.width(),
            p.width,
            "pin {} asserted at width {} but carries {} bits",
            p.path,
            value.width(),
            p.width
        );
        p.driven = value;
        let Some(net_id) = p.net else {
            return;
        };

        let (new_value, conflict) = self.graph.resolve_net(net_id);
        let net = &mut self.graph.nets[net_id.index()];
        if conflict && !net.conflict {
            self.stats.drive_conflicts += 1;
            warn!(
                "drive conflict on {}: active outputs disagree, lowest pin takes precedence",
                net_id
            );
        }
        net.conflict = conflict;
        if net.value == new_value {
            return;
        }
        net.value = new_value;
        self.stats.net_updates += 1;

        let members = net.pins.clone();
        for member in members {
            if self.watches.contains(&member) {
                self.trace.push(TraceRecord {
                    time: self.now,
                    pin: member,
                    value: new_value,
                });
            }
            let listener = &self.graph.pins[member.index()];
            if listener.kind == PinKind::Input {
                self.queue
                    .schedule(self.now, listener.element, Payload::InputsChanged);
            }
        }
    }
}

/// Behaviour shared by every element kind.
pub(crate) trait Reactive {
    /// Reset internal state, assert the reset outputs and optionally
    /// self-schedule (a clock posts its first toggle here).
    fn init_sim(&mut self, ctx: &mut ReactCtx);

    /// Handle one event. `Payload::InputsChanged` is Phase A, the value
    /// payloads are Phase B commits.
    fn react(&mut self, now: SimTime, payload: Payload, ctx: &mut ReactCtx);
}

/// Exhaustive sum of the element kinds. The compiler checks that every
/// kind handles every dispatch; no kind falls through to a default.
#[derive(Debug, Clone)]
pub enum Element {
    Gate(Gate),
    TruthTable(TruthTable),
    Adder(Adder),
    Decoder(Decoder),
    Mux(Mux),
    Register(Register),
    Memory(Memory),
    Clock(Clock),
    Constant(Constant),
    TriState(TriStateBuffer),
    StateMachine(StateMachine),
    SubCircuit(SubCircuit),
    NamedEndpoint(NamedEndpoint),
    Display(Display),
}

impl Element {
    pub fn label(&self) -> &str {
        match self {
            Element::Gate(e) => &e.label,
            Element::TruthTable(e) => &e.label,
            Element::Adder(e) => &e.label,
            Element::Decoder(e) => &e.label,
            Element::Mux(e) => &e.label,
            Element::Register(e) => &e.label,
            Element::Memory(e) => &e.label,
            Element::Clock(e) => &e.label,
            Element::Constant(e) => &e.label,
            Element::TriState(e) => &e.label,
            Element::StateMachine(e) => &e.label,
            Element::SubCircuit(e) => &e.label,
            Element::NamedEndpoint(e) => &e.label,
            Element::Display(e) => &e.label,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Element::Gate(_) => "gate",
            Element::TruthTable(_) => "truth_table",
            Element::Adder(_) => "adder",
            Element::Decoder(_) => "decoder",
            Element::Mux(_) => "mux",
            Element::Register(_) => "register",
            Element::Memory(_) => "memory",
            Element::Clock(_) => "clock",
            Element::Constant(_) => "constant",
            Element::TriState(_) => "tristate",
            Element::StateMachine(_) => "state_machine",
            Element::SubCircuit(_) => "subcircuit",
            Element::NamedEndpoint(_) => "endpoint",
            Element::Display(_) => "display",
        }
    }

    pub(crate) fn init_sim(&mut self, ctx: &mut ReactCtx) {
        match self {
            Element::Gate(e) => e.init_sim(ctx),
            Element::TruthTable(e) => e.init_sim(ctx),
            Element::Adder(e) => e.init_sim(ctx),
            Element::Decoder(e) => e.init_sim(ctx),
            Element::Mux(e) => e.init_sim(ctx),
            Element::Register(e) => e.init_sim(ctx),
            Element::Memory(e) => e.init_sim(ctx),
            Element::Clock(e) => e.init_sim(ctx),
            Element::Constant(e) => e.init_sim(ctx),
            Element::TriState(e) => e.init_sim(ctx),
            Element::StateMachine(e) => e.init_sim(ctx),
            Element::SubCircuit(e) => e.init_sim(ctx),
            Element::NamedEndpoint(e) => e.init_sim(ctx),
            Element::Display(e) => e.init_sim(ctx),
        }
    }

    pub(crate) fn react(&mut self, now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match self {
            Element::Gate(e) => e.react(now, payload, ctx),
            Element::TruthTable(e) => e.react(now, payload, ctx),
            Element::Adder(e) => e.react(now, payload, ctx),
            Element::Decoder(e) => e.react(now, payload, ctx),
            Element::Mux(e) => e.react(now, payload, ctx),
            Element::Register(e) => e.react(now, payload, ctx),
            Element::Memory(e) => e.react(now, payload, ctx),
            Element::Clock(e) => e.react(now, payload, ctx),
            Element::Constant(e) => e.react(now, payload, ctx),
            Element::TriState(e) => e.react(now, payload, ctx),
            Element::StateMachine(e) => e.react(now, payload, ctx),
            Element::SubCircuit(e) => e.react(now, payload, ctx),
            Element::NamedEndpoint(e) => e.react(now, payload, ctx),
            Element::Display(e) => e.react(now, payload, ctx),
        }
    }

    /// Rewrite pin handles after copying into another arena.
    pub(crate) fn remap_pins(&mut self, map: &[PinId]) {
        fn r(map: &[PinId], pin: &mut PinId) {
            *pin = map[pin.index()];
        }
        match self {
            Element::Gate(e) => {
                for p in &mut e.inputs {
                    r(map, p);
                }
                r(map, &mut e.out);
            }
            Element::TruthTable(e) => {
                for p in &mut e.inputs {
                    r(map, p);
                }
                for p in &mut e.outputs {
                    r(map, p);
                }
            }
            Element::Adder(e) => {
                r(map, &mut e.a);
                r(map, &mut e.b);
                r(map, &mut e.cin);
                r(map, &mut e.sum);
                r(map, &mut e.cout);
            }
            Element::Decoder(e) => {
                r(map, &mut e.sel);
                for p in &mut e.outputs {
                    r(map, p);
                }
            }
            Element::Mux(e) => {
                for p in &mut e.inputs {
                    r(map, p);
                }
                r(map, &mut e.sel);
                r(map, &mut e.out);
            }
            Element::Register(e) => {
                r(map, &mut e.clk);
                r(map, &mut e.d);
                r(map, &mut e.q);
                r(map, &mut e.nq);
            }
            Element::Memory(e) => {
                r(map, &mut e.addr);
                r(map, &mut e.cs);
                r(map, &mut e.oe);
                if let Some(we) = &mut e.we {
                    r(map, we);
                }
                if let Some(din) = &mut e.din {
                    r(map, din);
                }
                r(map, &mut e.dout);
            }
            Element::Clock(e) => r(map, &mut e.out),
            Element::Constant(e) => r(map, &mut e.out),
            Element::TriState(e) => {
                r(map, &mut e.data);
                r(map, &mut e.en);
                r(map, &mut e.out);
            }
            Element::StateMachine(e) => {
                r(map, &mut e.clk);
                for port in &mut e.inputs {
                    r(map, &mut port.pin);
                }
                for port in &mut e.outputs {
                    r(map, &mut port.pin);
                }
            }
            Element::SubCircuit(e) => {
                for (_, p) in &mut e.ports {
                    r(map, p);
                }
            }
            Element::NamedEndpoint(e) => r(map, &mut e.pin),
            Element::Display(e) => r(map, &mut e.input),
        }
    }

    /// Prepend an instance path to the label, `prefix/original`.
    pub(crate) fn prefix_label(&mut self, prefix: &str) {
        let label = match self {
            Element::Gate(e) => &mut e.label,
            Element::TruthTable(e) => &mut e.label,
            Element::Adder(e) => &mut e.label,
            Element::Decoder(e) => &mut e.label,
            Element::Mux(e) => &mut e.label,
            Element::Register(e) => &mut e.label,
            Element::Memory(e) => &mut e.label,
            Element::Clock(e) => &mut e.label,
            Element::Constant(e) => &mut e.label,
            Element::TriState(e) => &mut e.label,
            Element::StateMachine(e) => &mut e.label,
            Element::SubCircuit(e) => &mut e.label,
            Element::NamedEndpoint(e) => &mut e.label,
            Element::Display(e) => &mut e.label,
        };
        *label = format!("{}/{}", prefix, label);
    }
}
