use super::super::event_scheduler::Payload;
use super::super::signal::Signal;
use super::super::types::{Delay, PinId, SimTime};
use super::{ReactCtx, Reactive};

/// Phase-A tail shared by the combinational kinds: coalesce against the
/// pending value, otherwise schedule the delayed commit.
pub(crate) fn schedule_if_changed(
    pending: &mut Signal,
    value: Signal,
    delay: Delay,
    ctx: &mut ReactCtx,
) {
    if value == *pending {
        ctx.note_coalesced();
        return;
    }
    *pending = value;
    ctx.schedule(delay, Payload::Commit(value));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
    Not,
    Buffer,
}

/// N-ary bitwise gate over equal-width inputs.
#[derive(Debug, Clone)]
pub struct Gate {
    pub(crate) label: String,
    pub(crate) kind: GateKind,
    pub(crate) width: u32,
    pub(crate) inputs: Vec<PinId>,
    pub(crate) out: PinId,
    pub(crate) delay: Delay,
    pub(crate) pending: Signal,
}

impl Gate {
    fn compute(&self, ctx: &ReactCtx) -> Signal {
        let mut values = self.inputs.iter().map(|&p| ctx.input_bits(p));
        let first = values.next().unwrap_or(0);
        let bits = match self.kind {
            GateKind::Buffer => first,
            GateKind::Not => !first,
            GateKind::And | GateKind::Nand => {
                let v = values.fold(first, |acc, x| acc & x);
                if self.kind == GateKind::Nand {
                    !v
                } else {
                    v
                }
            }
            GateKind::Or | GateKind::Nor => {
                let v = values.fold(first, |acc, x| acc | x);
                if self.kind == GateKind::Nor {
                    !v
                } else {
                    v
                }
            }
            GateKind::Xor | GateKind::Xnor => {
                let v = values.fold(first, |acc, x| acc ^ x);
                if self.kind == GateKind::Xnor {
                    !v
                } else {
                    v
                }
            }
        };
        Signal::from_u64(self.width, bits)
    }
}

impl Reactive for Gate {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.pending = Signal::zero(self.width);
        ctx.assert_pin(self.out, self.pending);
    }

    fn react(&mut self, _now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let value = self.compute(ctx);
                schedule_if_changed(&mut self.pending, value, self.delay, ctx);
            }
            Payload::Commit(value) => ctx.assert_pin(self.out, value),
            other => unreachable!("gate {} cannot handle {:?}", self.label, other),
        }
    }
}

/// Lookup table over single-bit inputs. Row `i` holds the packed output
/// word for the input combination reading `i` with in0 as bit 0.
#[derive(Debug, Clone)]
pub struct TruthTable {
    pub(crate) label: String,
    pub(crate) inputs: Vec<PinId>,
    pub(crate) outputs: Vec<PinId>,
    pub(crate) rows: Vec<u64>,
    pub(crate) delay: Delay,
    pub(crate) pending: Signal,
}

impl TruthTable {
    fn out_width(&self) -> u32 {
        self.outputs.len() as u32
    }

    fn compute(&self, ctx: &ReactCtx) -> Signal {
        let mut index = 0usize;
        for (i, &pin) in self.inputs.iter().enumerate() {
            if ctx.input_bit(pin) {
                index |= 1 << i;
            }
        }
        Signal::from_u64(self.out_width(), self.rows[index])
    }
}

impl Reactive for TruthTable {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.pending = Signal::zero(self.out_width());
        for i in 0..self.outputs.len() {
            ctx.assert_pin(self.outputs[i], Signal::zero(1));
        }
    }

    fn react(&mut self, _now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let value = self.compute(ctx);
                schedule_if_changed(&mut self.pending, value, self.delay, ctx);
            }
            Payload::Commit(value) => {
                for (i, &pin) in self.outputs.iter().enumerate() {
                    ctx.assert_pin(pin, value.slice(i as u32, 1));
                }
            }
            other => unreachable!("truth table {} cannot handle {:?}", self.label, other),
        }
    }
}

/// Width-N adder with carry in and out. Commits carry the sum in the low
/// bits and the carry in the top bit.
#[derive(Debug, Clone)]
pub struct Adder {
    pub(crate) label: String,
    pub(crate) width: u32,
    pub(crate) a: PinId,
    pub(crate) b: PinId,
    pub(crate) cin: PinId,
    pub(crate) sum: PinId,
    pub(crate) cout: PinId,
    pub(crate) delay: Delay,
    pub(crate) pending: Signal,
}

impl Adder {
    fn compute(&self, ctx: &ReactCtx) -> Signal {
        let a = ctx.input(self.a).well_defined(self.width);
        let b = ctx.input(self.b).well_defined(self.width);
        let carry_in = ctx.input_bit(self.cin);
        let (sum, carry_out) = a.add(b, carry_in);
        sum.concat(Signal::from_bool(carry_out))
    }
}

impl Reactive for Adder {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.pending = Signal::zero(self.width + 1);
        ctx.assert_pin(self.sum, Signal::zero(self.width));
        ctx.assert_pin(self.cout, Signal::zero(1));
    }

    fn react(&mut self, _now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let value = self.compute(ctx);
                schedule_if_changed(&mut self.pending, value, self.delay, ctx);
            }
            Payload::Commit(value) => {
                ctx.assert_pin(self.sum, value.slice(0, self.width));
                ctx.assert_pin(self.cout, value.slice(self.width, 1));
            }
            other => unreachable!("adder {} cannot handle {:?}", self.label, other),
        }
    }
}

/// One-hot decoder: output `sel` goes high, all others low.
#[derive(Debug, Clone)]
pub struct Decoder {
    pub(crate) label: String,
    pub(crate) sel_width: u32,
    pub(crate) sel: PinId,
    pub(crate) outputs: Vec<PinId>,
    pub(crate) delay: Delay,
    pub(crate) pending: Signal,
}

impl Decoder {
    fn compute(&self, ctx: &ReactCtx) -> Signal {
        let sel = ctx.input(self.sel).well_defined(self.sel_width).as_u64_lossy();
        Signal::from_u64(self.outputs.len() as u32, 1u64 << sel)
    }
}

impl Reactive for Decoder {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.pending = Signal::zero(self.outputs.len() as u32);
        for i in 0..self.outputs.len() {
            ctx.assert_pin(self.outputs[i], Signal::zero(1));
        }
    }

    fn react(&mut self, _now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let value = self.compute(ctx);
                schedule_if_changed(&mut self.pending, value, self.delay, ctx);
            }
            Payload::Commit(value) => {
                for (i, &pin) in self.outputs.iter().enumerate() {
                    ctx.assert_pin(pin, value.slice(i as u32, 1));
                }
            }
            other => unreachable!("decoder {} cannot handle {:?}", self.label, other),
        }
    }
}

/// Multiplexer forwarding the addressed data input.
#[derive(Debug, Clone)]
pub struct Mux {
    pub(crate) label: String,
    pub(crate) width: u32,
    pub(crate) inputs: Vec<PinId>,
    pub(crate) sel: PinId,
    pub(crate) out: PinId,
    pub(crate) delay: Delay,
    pub(crate) pending: Signal,
}

impl Mux {
    fn compute(&self, ctx: &ReactCtx) -> Signal {
        // inputs.len() is a power of two, so the mask bounds the index
        let sel = ctx.input_bits(self.sel) as usize & (self.inputs.len() - 1);
        ctx.input(self.inputs[sel]).well_defined(self.width)
    }
}

impl Reactive for Mux {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        self.pending = Signal::zero(self.width);
        ctx.assert_pin(self.out, self.pending);
    }

    fn react(&mut self, _now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let value = self.compute(ctx);
                schedule_if_changed(&mut self.pending, value, self.delay, ctx);
            }
            Payload::Commit(value) => ctx.assert_pin(self.out, value),
            other => unreachable!("mux {} cannot handle {:?}", self.label, other),
        }
    }
}
