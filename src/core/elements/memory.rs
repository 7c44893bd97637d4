use std::collections::VecDeque;

use log::debug;
use serde::Serialize;

use super::super::errors::ImageWarning;
use super::super::event_scheduler::Payload;
use super::super::signal::Signal;
use super::super::types::{Delay, PinId, SimTime};
use super::{ReactCtx, Reactive};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Ram,
    Rom,
}

/// One committed write, kept in the per-element activity trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteRecord {
    pub time: SimTime,
    pub addr: u64,
    pub value: u64,
}

/// Operation chosen by a Phase-A inspection of the control pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemOp {
    Store { addr: u64, data: u64 },
    Drive(u64),
    Release,
}

const HISTORY_CAP: usize = 1024;

/// Word-addressed RAM or ROM with active-low `cs`/`we`/`oe` controls and
/// a tri-state data output.
///
/// A read looks the word up when the access is issued and drives it
/// after the access delay, so overlapping reads and writes order by
/// their commit times. Write commits release the output. A deselected
/// chip or an out-of-range address releases rather than faulting.
#[derive(Debug, Clone)]
pub struct Memory {
    pub(crate) label: String,
    pub(crate) kind: MemoryKind,
    pub(crate) words: Vec<u64>,
    pub(crate) data_width: u32,
    pub(crate) addr: PinId,
    pub(crate) cs: PinId,
    pub(crate) oe: PinId,
    pub(crate) we: Option<PinId>,
    pub(crate) din: Option<PinId>,
    pub(crate) dout: PinId,
    pub(crate) access: Delay,
    pending: Option<MemOp>,
    history: VecDeque<WriteRecord>,
}

impl Memory {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        label: String,
        kind: MemoryKind,
        words: usize,
        data_width: u32,
        addr: PinId,
        cs: PinId,
        oe: PinId,
        we: Option<PinId>,
        din: Option<PinId>,
        dout: PinId,
        access: Delay,
    ) -> Self {
        Self {
            label,
            kind,
            words: vec![0; words],
            data_width,
            addr,
            cs,
            oe,
            we,
            din,
            dout,
            access,
            pending: None,
            history: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Stored word, `None` past the end of the array.
    pub fn word(&self, addr: usize) -> Option<u64> {
        self.words.get(addr).copied()
    }

    /// Committed writes, oldest first, capped at the trace length.
    pub fn write_history(&self) -> &VecDeque<WriteRecord> {
        &self.history
    }

    /// Load memory contents from hexadecimal text: whitespace-separated
    /// words, `#` comments to end of line, and `addr:` markers that move
    /// the load cursor. Malformed text leaves the memory all-zero and
    /// returns the diagnostic instead of failing.
    pub fn load_image(&mut self, text: &str) -> Option<ImageWarning> {
        match parse_image(text, self.words.len(), self.data_width) {
            Ok(words) => {
                self.words = words;
                None
            }
            Err(warning) => {
                self.words = vec![0; self.words.len()];
                Some(warning)
            }
        }
    }

    fn decide(&self, ctx: &ReactCtx) -> MemOp {
        // Controls are active low; floating reads as asserted
        if ctx.input_bit(self.cs) {
            return MemOp::Release;
        }
        let addr = ctx.input_bits(self.addr);
        if addr as usize >= self.words.len() {
            return MemOp::Release;
        }
        if let (Some(we), Some(din)) = (self.we, self.din) {
            if !ctx.input_bit(we) {
                let data = ctx.input(din).well_defined(self.data_width).as_u64_lossy();
                return MemOp::Store { addr, data };
            }
        }
        if !ctx.input_bit(self.oe) {
            // Lookup happens now; the commit only drives the value
            return MemOp::Drive(self.words[addr as usize]);
        }
        MemOp::Release
    }

    fn push_history(&mut self, time: SimTime, addr: u64, value: u64) {
        if self.history.len() == HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(WriteRecord { time, addr, value });
    }
}

impl Reactive for Memory {
    fn init_sim(&mut self, ctx: &mut ReactCtx) {
        // The word array is configuration (images load at edit time) and
        // survives a reset; the transaction state does not.
        self.pending = None;
        self.history.clear();
        ctx.assert_pin(self.dout, Signal::floating(self.data_width));
    }

    fn react(&mut self, now: SimTime, payload: Payload, ctx: &mut ReactCtx) {
        match payload {
            Payload::InputsChanged => {
                let op = self.decide(ctx);
                if self.pending == Some(op) {
                    ctx.note_coalesced();
                    return;
                }
                self.pending = Some(op);
                debug!("{}: {:?} in {} ticks", self.label, op, self.access);
                let commit = match op {
                    MemOp::Store { addr, data } => Payload::Store {
                        addr,
                        data: Signal::from_u64(self.data_width, data),
                    },
                    MemOp::Drive(value) => {
                        Payload::Commit(Signal::from_u64(self.data_width, value))
                    }
                    MemOp::Release => Payload::Commit(Signal::floating(self.data_width)),
                };
                ctx.schedule(self.access, commit);
            }
            Payload::Store { addr, data } => {
                if self.kind == MemoryKind::Rom {
                    unreachable!("rom {} received a write commit", self.label);
                }
                let value = data.as_u64_lossy();
                self.words[addr as usize] = value;
                self.push_history(now, addr, value);
                ctx.assert_pin(self.dout, Signal::floating(self.data_width));
            }
            Payload::Commit(value) => ctx.assert_pin(self.dout, value),
            other => unreachable!("memory {} cannot handle {:?}", self.label, other),
        }
    }
}

/// Parse an initialization image. Pure so the grammar is testable away
/// from any element.
fn parse_image(text: &str, len: usize, data_width: u32) -> Result<Vec<u64>, ImageWarning> {
    let fits = |v: u64| data_width >= 64 || v < (1u64 << data_width);
    let mut words = vec![0u64; len];
    let mut cursor = 0usize;
    for (index, raw_line) in text.lines().enumerate() {
        let line = match raw_line.find('#') {
            Some(i) => &raw_line[..i],
            None => raw_line,
        };
        for token in line.split_whitespace() {
            let warn = |reason: &str| ImageWarning {
                line: index + 1,
                token: token.to_string(),
                reason: reason.to_string(),
            };
            if let Some(marker) = token.strip_suffix(':') {
                match u64::from_str_radix(marker, 16) {
                    Ok(addr) if (addr as usize) < len => cursor = addr as usize,
                    Ok(_) => return Err(warn("address marker out of range")),
                    Err(_) => return Err(warn("malformed address marker")),
                }
            } else {
                match u64::from_str_radix(token, 16) {
                    Ok(value) if fits(value) => {
                        if cursor >= len {
                            return Err(warn("word past the end of memory"));
                        }
                        words[cursor] = value;
                        cursor += 1;
                    }
                    Ok(_) => return Err(warn("value exceeds the data width")),
                    Err(_) => return Err(warn("not a hexadecimal word")),
                }
            }
        }
    }
    Ok(words)
}
