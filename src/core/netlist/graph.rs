use super::super::signal::Signal;
use super::super::types::{ElementId, NetId, PinId, PinKind};

/// One endpoint an element exposes to the wiring graph.
#[derive(Debug, Clone)]
pub struct Pin {
    /// Port name unique within the owning element ("a", "clk", "dout").
    pub name: String,
    /// Dotted element.port path used in diagnostics.
    pub path: String,
    pub kind: PinKind,
    pub element: ElementId,
    /// Declared width; 0 is the wildcard that adopts the net width.
    pub declared_width: u32,
    /// Width after partitioning. Equals `declared_width` when non-zero.
    pub width: u32,
    /// Output pins only: whether this driver may release to floating.
    pub tri_state: bool,
    /// Value this output currently asserts. Floating means released.
    pub(crate) driven: Signal,
    pub net: Option<NetId>,
}

/// Undirected connection between two pin endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Wire {
    pub a: PinId,
    pub b: PinId,
}

/// Electrically equivalent group of pins, produced by partitioning.
#[derive(Debug, Clone)]
pub struct Net {
    /// Member pins in ascending id order. Empty after the net was merged
    /// away by an incremental connect.
    pub pins: Vec<PinId>,
    pub width: u32,
    /// True when any member output declares itself tri-state.
    pub tri_state: bool,
    /// Current resolved value.
    pub value: Signal,
    /// Set while two active drivers disagree on this net.
    pub conflict: bool,
}

impl Net {
    pub(crate) fn is_vacant(&self) -> bool {
        self.pins.is_empty()
    }
}

/// Pin, wire and net arenas. Elements live beside this in the netlist so
/// a reacting element can borrow itself and the graph independently.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) pins: Vec<Pin>,
    pub(crate) wires: Vec<Option<Wire>>,
    pub(crate) nets: Vec<Net>,
}

impl Graph {
    pub(crate) fn add_pin(
        &mut self,
        element: ElementId,
        element_label: &str,
        name: &str,
        kind: PinKind,
        declared_width: u32,
        tri_state: bool,
    ) -> PinId {
        let id = PinId(self.pins.len());
        let driven = match kind {
            PinKind::Output => Signal::floating(declared_width),
            PinKind::Input => Signal::empty(),
        };
        self.pins.push(Pin {
            name: name.to_string(),
            path: format!("{}.{}", element_label, name),
            kind,
            element,
            declared_width,
            width: declared_width,
            tri_state,
            driven,
            net: None,
        });
        id
    }

    pub(crate) fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.0]
    }

    /// Resolved value seen at a pin. An unattached pin reads the empty
    /// signal, which downstream evaluation widens to all-zero.
    pub(crate) fn pin_value(&self, id: PinId) -> Signal {
        match self.pins[id.0].net {
            Some(net) => self.nets[net.0].value,
            None => Signal::empty(),
        }
    }

    /// Recompute a net's value from its member drivers.
    ///
    /// Exactly one active (non-floating) output wins outright; none
    /// leaves the net floating. Two or more active drivers with equal
    /// values agree; disagreeing drivers are resolved to the lowest
    /// active pin id and reported as a conflict, never averaged.
    pub(crate) fn resolve_net(&self, id: NetId) -> (Signal, bool) {
        let net = &self.nets[id.0];
        if net.width == 0 {
            return (Signal::empty(), false);
        }
        let mut winner: Option<Signal> = None;
        let mut conflict = false;
        for &pid in &net.pins {
            let pin = &self.pins[pid.0];
            if pin.kind != PinKind::Output {
                continue;
            }
            if pin.driven.is_floating() || pin.driven.is_empty() {
                continue;
            }
            match winner {
                None => winner = Some(pin.driven),
                Some(v) => {
                    if v != pin.driven {
                        conflict = true;
                    }
                }
            }
        }
        match winner {
            Some(v) => (v, conflict),
            None => (Signal::floating(net.width), false),
        }
    }
}
