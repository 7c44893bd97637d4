use super::super::event_scheduler::Payload;
use super::super::signal::Signal;
use super::super::types::{Delay, PinId, SimTime};
use super::combinational::schedule_if_changed;
use super::{ReactCtx, Reactive};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// Transparent while the clock is high.
    Latch,
    /// Captures on the rising clock edge.
    PosFf,
    /// Captures on the falling clock edge.
    NegFf,
}

/// Clocked storage driving `q` and its complement `nq`.
///
/// The last observed clock level is element state; a Phase-A call
/// captures the data input only when the level change matches the kind.
/// A captured value equal to the pending one schedules nothing, which
/// keeps a transparent latch quiet while its input is stable.
#[derive(Debug, Clone)]
pub struct Register {
    pub(crate) label: String,
    pub(crate) kind: RegisterKind,
    pub(crate) width: u32,
    pub(crate) clk: PinId,
    pub(crate) d: PinId,
    pub(crate) q: PinId,
    pub(crate) nq: PinId,
    pub(crate) delay: Delay,
    pub(crate) initial: Signal,
    pub(crate) last_clock: bool,
    pub(crate) pending: Signal,
}

impl Register {
    fn captures(&self, previous: bool, clock: bool) -> bool {
        match self.kind {
            RegisterKind::Latch => clock,
            RegisterKind::PosFf => !previous && clock,
            RegisterKind::NegFf => previous && !clock,
        }
    }
}

impl Reactive for Register {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.last_clock = false;
        self.pending = self.initial;
        ctx.assert_pin(self.q, self.initial);
        ctx.assert_pin(self.nq, self.initial.not());
    }

    fn react(&mut self, _now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let clock = ctx.input_bit(self.clk);
                let previous = self.last_clock;
                self.last_clock = clock;
                if !self.captures(previous, clock) {
                    return;
                }
                let captured = ctx.input(self.d).well_defined(self.width);
                schedule_if_changed(&mut self.pending, captured, self.delay, ctx);
            }
            Payload::Commit(value) => {
                ctx.assert_pin(self.q, value);
                ctx.assert_pin(self.nq, value.not());
            }
            other => unreachable!("register {} cannot handle {:?}", self.label, other),
        }
    }
}
