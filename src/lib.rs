pub mod core;

// Re-export commonly used types
pub use crate::core::elements::{
    ClockEdge, FsmConfig, FsmGuard, FsmStateConfig, FsmTransitionConfig, GateKind, MemoryKind,
    RegisterKind,
};
pub use crate::core::errors::{CircuitError, ImageWarning, NetConflict};
pub use crate::core::netlist::Netlist;
pub use crate::core::signal::{Bit, Signal, SignalError, MAX_WIDTH};
pub use crate::core::simulator::{SimStats, Simulator, TraceRecord};
pub use crate::core::types::{Delay, ElementId, NetId, PinId, SimTime, WireId};
