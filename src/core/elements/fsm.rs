//! Table-driven synchronous state machines.
//!
//! A machine is described as data (`FsmConfig`), checked and resolved
//! into index form by `compile`, then run as a clocked element. Names
//! only exist at the configuration boundary; the running machine works
//! entirely in state and port indices.

use log::debug;

use super::super::errors::CircuitError;
use super::super::event_scheduler::Payload;
use super::super::signal::Signal;
use super::super::types::{Delay, PinId, SimTime};
use super::{ReactCtx, Reactive};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEdge {
    Rising,
    Falling,
}

/// Condition attached to a transition, referring to input ports by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsmGuard {
    /// Taken unconditionally, before any conditional transition.
    Always,
    Equals(String, u64),
    NotEquals(String, u64),
    /// Taken when no conditional transition matched.
    Else,
}

#[derive(Debug, Clone)]
pub struct FsmTransitionConfig {
    pub target: String,
    pub guard: FsmGuard,
}

/// One state: the values its output ports take while the machine is in
/// it (unlisted outputs drive zero) and its outgoing transitions in
/// priority order.
#[derive(Debug, Clone)]
pub struct FsmStateConfig {
    pub name: String,
    pub outputs: Vec<(String, u64)>,
    pub transitions: Vec<FsmTransitionConfig>,
}

/// Complete machine description. `inputs` and `outputs` declare the
/// element's data ports as name/width pairs; a 1-bit `clk` input is
/// always added on top.
#[derive(Debug, Clone)]
pub struct FsmConfig {
    pub edge: ClockEdge,
    pub inputs: Vec<(String, u32)>,
    pub outputs: Vec<(String, u32)>,
    pub states: Vec<FsmStateConfig>,
    pub initial: String,
    pub delay: Delay,
}

/// Guard with its input resolved to a port index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    Always,
    Equals(usize, u64),
    NotEquals(usize, u64),
    Else,
}

#[derive(Debug, Clone)]
struct FsmState {
    name: String,
    /// Dense output row, one value per declared output port.
    outputs: Vec<u64>,
    /// `(target state, guard)` in declaration order.
    transitions: Vec<(usize, Guard)>,
}

/// Name-free form of a validated configuration.
#[derive(Debug, Clone)]
pub(crate) struct CompiledFsm {
    states: Vec<FsmState>,
    initial: usize,
}

fn fits(width: u32, value: u64) -> bool {
    width >= 64 || value < (1u64 << width)
}

/// Validate a configuration and resolve every name to an index.
/// Rejects duplicate or empty names, unknown references and values too
/// wide for their port.
pub(crate) fn compile(config: &FsmConfig) -> Result<CompiledFsm, CircuitError> {
    let bad = |msg: String| CircuitError::BadConfig(msg);
    if config.states.is_empty() {
        return Err(bad("state machine needs at least one state".to_string()));
    }

    // 1. Port namespace; the implicit clk pin reserves its name
    let mut seen = std::collections::BTreeSet::from(["clk"]);
    for (name, _) in config.inputs.iter().chain(config.outputs.iter()) {
        if name.is_empty() {
            return Err(bad("port name must not be empty".to_string()));
        }
        if !seen.insert(name.as_str()) {
            return Err(bad(format!("duplicate port name '{}'", name)));
        }
    }

    // 2. State name table
    let mut index_of = std::collections::BTreeMap::new();
    for (i, state) in config.states.iter().enumerate() {
        if state.name.is_empty() {
            return Err(bad("state name must not be empty".to_string()));
        }
        if index_of.insert(state.name.as_str(), i).is_some() {
            return Err(bad(format!("duplicate state name '{}'", state.name)));
        }
    }
    let initial = *index_of
        .get(config.initial.as_str())
        .ok_or_else(|| bad(format!("initial state '{}' is not declared", config.initial)))?;

    // 3. Resolve each state's output row and transitions
    let mut states = Vec::with_capacity(config.states.len());
    for state in &config.states {
        let mut outputs = vec![0u64; config.outputs.len()];
        for (name, value) in &state.outputs {
            let i = config
                .outputs
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| {
                    bad(format!("state '{}' assigns unknown output '{}'", state.name, name))
                })?;
            if !fits(config.outputs[i].1, *value) {
                return Err(bad(format!(
                    "state '{}' assigns {:#x} to '{}', a {}-bit output",
                    state.name, value, name, config.outputs[i].1
                )));
            }
            outputs[i] = *value;
        }

        let resolve_input = |name: &str, value: u64| -> Result<usize, CircuitError> {
            let i = config
                .inputs
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| {
                    bad(format!("state '{}' tests unknown input '{}'", state.name, name))
                })?;
            if !fits(config.inputs[i].1, value) {
                return Err(bad(format!(
                    "state '{}' compares {:#x} against '{}', a {}-bit input",
                    state.name, value, name, config.inputs[i].1
                )));
            }
            Ok(i)
        };

        let mut transitions = Vec::with_capacity(state.transitions.len());
        for t in &state.transitions {
            let target = *index_of.get(t.target.as_str()).ok_or_else(|| {
                bad(format!("state '{}' targets unknown state '{}'", state.name, t.target))
            })?;
            let guard = match &t.guard {
                FsmGuard::Always => Guard::Always,
                FsmGuard::Else => Guard::Else,
                FsmGuard::Equals(name, value) => Guard::Equals(resolve_input(name, *value)?, *value),
                FsmGuard::NotEquals(name, value) => {
                    Guard::NotEquals(resolve_input(name, *value)?, *value)
                }
            };
            transitions.push((target, guard));
        }
        states.push(FsmState {
            name: state.name.clone(),
            outputs,
            transitions,
        });
    }
    Ok(CompiledFsm { states, initial })
}

/// Data port of a running machine.
#[derive(Debug, Clone)]
pub(crate) struct FsmPort {
    pub(crate) width: u32,
    pub(crate) pin: PinId,
}

/// A compiled machine wired into the circuit. On the configured clock
/// edge it snapshots its inputs, picks the next state and schedules a
/// single delayed transition; committing the transition drives every
/// output port with the new state's row.
#[derive(Debug, Clone)]
pub struct StateMachine {
    pub(crate) label: String,
    pub(crate) edge: ClockEdge,
    pub(crate) delay: Delay,
    pub(crate) clk: PinId,
    pub(crate) inputs: Vec<FsmPort>,
    pub(crate) outputs: Vec<FsmPort>,
    compiled: CompiledFsm,
    current: usize,
    last_clock: bool,
}

impl StateMachine {
    pub(crate) fn assemble(
        label: String,
        config: FsmConfig,
        compiled: CompiledFsm,
        clk: PinId,
        input_pins: Vec<PinId>,
        output_pins: Vec<PinId>,
    ) -> Self {
        let inputs = config
            .inputs
            .into_iter()
            .zip(input_pins)
            .map(|((_, width), pin)| FsmPort { width, pin })
            .collect();
        let outputs = config
            .outputs
            .into_iter()
            .zip(output_pins)
            .map(|((_, width), pin)| FsmPort { width, pin })
            .collect();
        let current = compiled.initial;
        Self {
            label,
            edge: config.edge,
            delay: config.delay,
            clk,
            inputs,
            outputs,
            compiled,
            current,
            last_clock: false,
        }
    }

    pub fn current_state(&self) -> usize {
        self.current
    }

    pub fn state_name(&self) -> &str {
        &self.compiled.states[self.current].name
    }

    /// Transition choice for a state and an input snapshot: any Always
    /// first, then the conditional transitions in declaration order,
    /// then Else; `None` keeps the machine where it is.
    fn next_state(&self, current: usize, inputs: &[u64]) -> Option<usize> {
        let transitions = &self.compiled.states[current].transitions;
        for &(target, guard) in transitions {
            if guard == Guard::Always {
                return Some(target);
            }
        }
        for &(target, guard) in transitions {
            match guard {
                Guard::Equals(i, v) if inputs[i] == v => return Some(target),
                Guard::NotEquals(i, v) if inputs[i] != v => return Some(target),
                _ => {}
            }
        }
        for &(target, guard) in transitions {
            if guard == Guard::Else {
                return Some(target);
            }
        }
        None
    }

    fn drive_state_outputs(&self, ctx: &mut ReactCtx) {
        let row = &self.compiled.states[self.current].outputs;
        for (port, &value) in self.outputs.iter().zip(row) {
            ctx.assert_pin(port.pin, Signal::from_u64(port.width, value));
        }
    }
}

impl Reactive for StateMachine {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.current = self.compiled.initial;
        self.last_clock = false;
        self.drive_state_outputs(ctx);
    }

    fn react(&mut self, now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let clock = ctx.input_bit(self.clk);
                let previous = self.last_clock;
                self.last_clock = clock;
                let edge = match self.edge {
                    ClockEdge::Rising => !previous && clock,
                    ClockEdge::Falling => previous && !clock,
                };
                if !edge {
                    return;
                }
                let snapshot: Vec<u64> = self
                    .inputs
                    .iter()
                    .map(|port| ctx.input(port.pin).well_defined(port.width).as_u64_lossy())
                    .collect();
                match self.next_state(self.current, &snapshot) {
                    Some(next) => {
                        debug!(
                            "{}: {} -> {} at {}",
                            self.label, self.compiled.states[self.current].name,
                            self.compiled.states[next].name, now
                        );
                        ctx.schedule(self.delay, Payload::Transition(next));
                    }
                    None => debug!("{}: holds {} at {}", self.label, self.state_name(), now),
                }
            }
            Payload::Transition(next) => {
                self.current = next;
                self.drive_state_outputs(ctx);
            }
            other => unreachable!("state machine {} cannot handle {:?}", self.label, other),
        }
    }
}
