use thiserror::Error;

use super::signal::SignalError;
use super::types::{ElementId, PinId, WireId};

/// Structural wiring error detected while merging or validating a net.
/// Reported to the caller, never resolved silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetConflict {
    #[error("width mismatch on one net: pin {a} ({a_label}) is {a_width} bits, pin {b} ({b_label}) is {b_width} bits")]
    WidthMismatch {
        a: PinId,
        a_label: String,
        a_width: u32,
        b: PinId,
        b_label: String,
        b_width: u32,
    },

    #[error("net driven by more than one plain output: pin {a} ({a_label}) and pin {b} ({b_label}); only tri-state outputs may share a net")]
    DoubleDriver {
        a: PinId,
        a_label: String,
        b: PinId,
        b_label: String,
    },
}

/// Error raised by the circuit construction and control surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    #[error("unknown pin {0}")]
    UnknownPin(PinId),

    #[error("element {element} has no pin named '{name}'")]
    NoSuchPort { element: ElementId, name: String },

    #[error("element {element} is not a {expected}")]
    WrongElementKind {
        element: ElementId,
        expected: &'static str,
    },

    #[error("unknown wire {0}")]
    UnknownWire(WireId),

    #[error("invalid configuration: {0}")]
    BadConfig(String),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Net(#[from] NetConflict),
}

/// Non-fatal diagnostic from parsing a memory initialization image.
/// The memory is left all-zero when this is produced; the simulation
/// keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("memory image line {line}: {reason} at '{token}'")]
pub struct ImageWarning {
    pub line: usize,
    pub token: String,
    pub reason: String,
}
