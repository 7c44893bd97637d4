use super::super::event_scheduler::Payload;
use super::super::signal::Signal;
use super::super::types::{Delay, PinId, SimTime};
use super::combinational::schedule_if_changed;
use super::{ReactCtx, Reactive};

/// Buffer that repeats `data` while `en` is high and releases the bus
/// while it is low. The released state is fully floating, which is what
/// lets several buffers legally share one net.
#[derive(Debug, Clone)]
pub struct TriStateBuffer {
    pub(crate) label: String,
    pub(crate) width: u32,
    pub(crate) data: PinId,
    pub(crate) en: PinId,
    pub(crate) out: PinId,
    pub(crate) delay: Delay,
    pub(crate) pending: Signal,
}

impl TriStateBuffer {
    fn compute(&self, ctx: &ReactCtx) -> Signal {
        if ctx.input_bit(self.en) {
            ctx.input(self.data).well_defined(self.width)
        } else {
            Signal::floating(self.width)
        }
    }
}

impl Reactive for TriStateBuffer {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.pending = Signal::floating(self.width);
        ctx.assert_pin(self.out, self.pending);
    }

    fn react(&mut self, _now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let value = self.compute(ctx);
                schedule_if_changed(&mut self.pending, value, self.delay, ctx);
            }
            Payload::Commit(value) => ctx.assert_pin(self.out, value),
            other => unreachable!("tri-state buffer {} cannot handle {:?}", self.label, other),
        }
    }
}
