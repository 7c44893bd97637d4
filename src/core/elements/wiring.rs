use std::collections::VecDeque;

use log::debug;
use serde::Serialize;

use super::super::event_scheduler::Payload;
use super::super::signal::Signal;
use super::super::types::{PinId, SimTime};
use super::{ReactCtx, Reactive};

/// Facade of an instantiated template. Owns one passive port pin per
/// endpoint name of the template; the copied inner elements do the
/// actual work.
#[derive(Debug, Clone)]
pub struct SubCircuit {
    pub(crate) label: String,
    pub(crate) ports: Vec<(String, PinId)>,
}

impl SubCircuit {
    /// Port pin for wiring the instance into the surrounding circuit.
    pub fn port(&self, name: &str) -> Option<PinId> {
        self.ports
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, pin)| pin)
    }

    pub fn port_names(&self) -> impl Iterator<Item = &str> {
        self.ports.iter().map(|(n, _)| n.as_str())
    }
}

impl Reactive for SubCircuit {
    fn init_sim(&mut self, _ctx: &mut ReactCtx) {}

    fn react(&mut self, _now: SimTime, payload: Payload, _ctx: &mut ReactCtx) {
        match payload {
            // Port pins sit on live nets, so fan-out reaches the facade;
            // there is nothing to compute
            Payload::InputsChanged => {}
            other => unreachable!("subcircuit {} cannot handle {:?}", self.label, other),
        }
    }
}

/// Wireless connection point. Endpoints sharing a label are merged into
/// one net when the partition is rebuilt.
#[derive(Debug, Clone)]
pub struct NamedEndpoint {
    pub(crate) label: String,
    pub(crate) pin: PinId,
}

impl Reactive for NamedEndpoint {
    fn init_sim(&mut self, _ctx: &mut ReactCtx) {}

    fn react(&mut self, _now: SimTime, payload: Payload, _ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {}
            other => unreachable!("endpoint {} cannot handle {:?}", self.label, other),
        }
    }
}

/// One observed value change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub time: SimTime,
    pub value: Signal,
}

const LOG_CAP: usize = 1024;

/// Probe that logs the value on its input net whenever it changes,
/// keeping the most recent observations.
#[derive(Debug, Clone)]
pub struct Display {
    pub(crate) label: String,
    pub(crate) input: PinId,
    log: VecDeque<DisplayRecord>,
}

impl Display {
    pub(crate) fn new(label: String, input: PinId) -> Self {
        Self {
            label,
            input,
            log: VecDeque::new(),
        }
    }

    /// Observations in arrival order, oldest first.
    pub fn records(&self) -> &VecDeque<DisplayRecord> {
        &self.log
    }

    pub fn last_value(&self) -> Option<Signal> {
        self.log.back().map(|r| r.value)
    }
}

impl Reactive for Display {
    fn init_sim(&mut self, _ctx: &mut ReactCtx) {
        self.log.clear();
    }

    fn react(&mut self, now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let value = ctx.input(self.input);
                if self.log.back().map(|r| r.value) == Some(value) {
                    return;
                }
                debug!("{}: {} at {}", self.label, value, now);
                if self.log.len() == LOG_CAP {
                    self.log.pop_front();
                }
                self.log.push_back(DisplayRecord { time: now, value });
            }
            other => unreachable!("display {} cannot handle {:?}", self.label, other),
        }
    }
}
