use log::debug;

use super::super::event_scheduler::Payload;
use super::super::signal::Signal;
use super::super::types::{Delay, PinId, SimTime};
use super::{ReactCtx, Reactive};

/// Free-running square-wave source. Starts low at reset and toggles
/// every `half_period` ticks by committing to itself; nothing else in
/// the circuit needs to exist for it to run.
#[derive(Debug, Clone)]
pub struct Clock {
    pub(crate) label: String,
    pub(crate) half_period: Delay,
    pub(crate) out: PinId,
    pub(crate) level: bool,
}

impl Reactive for Clock {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.level = false;
        ctx.assert_pin(self.out, Signal::zero(1));
        ctx.schedule(self.half_period, Payload::Commit(Signal::from_bool(true)));
    }

    fn react(&mut self, now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::Commit(value) => {
                self.level = value.as_u64_lossy() & 1 == 1;
                debug!("{}: {} at {}", self.label, if self.level { "rise" } else { "fall" }, now);
                ctx.assert_pin(self.out, value);
                ctx.schedule(self.half_period, Payload::Commit(Signal::from_bool(!self.level)));
            }
            other => unreachable!("clock {} cannot handle {:?}", self.label, other),
        }
    }
}

/// Driven constant, the circuit's stimulus source. Its output is
/// tri-state so a test bench can release it (drive floating) and let
/// some other driver take the net.
#[derive(Debug, Clone)]
pub struct Constant {
    pub(crate) label: String,
    pub(crate) value: Signal,
    pub(crate) out: PinId,
}

impl Reactive for Constant {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        ctx.assert_pin(self.out, self.value);
    }

    fn react(&mut self, _now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::Commit(value) => {
                self.value = value;
                ctx.assert_pin(self.out, value);
            }
            other => unreachable!("constant {} cannot handle {:?}", self.label, other),
        }
    }
}
