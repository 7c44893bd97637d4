//! Circuit graph construction and net resolution.
//!
//! The netlist owns three arenas (elements, pins, wires) plus the current
//! net partition. The editing collaborator builds the graph through the
//! `add_*` constructors and `connect`, then requests `repartition`;
//! during a simulation run the wiring is read-only by contract.

pub(crate) mod graph;
mod partition;

pub use graph::{Net, Pin, Wire};

use std::collections::BTreeMap;

use super::elements::{
    Adder, Clock, Constant, Decoder, Display, Element, Gate, GateKind, Memory, MemoryKind, Mux,
    NamedEndpoint, Register, RegisterKind, StateMachine, SubCircuit, TriStateBuffer, TruthTable,
};
use super::elements::fsm::{self, FsmConfig};
use super::errors::{CircuitError, NetConflict};
use super::signal::{Signal, MAX_WIDTH};
use super::types::{Delay, ElementId, NetId, PinId, PinKind, WireId};
use graph::Graph;

/// Largest supported memory address space, in address bits.
const MAX_ADDR_WIDTH: u32 = 24;

fn check_width(width: u32) -> Result<(), CircuitError> {
    if width == 0 {
        return Err(CircuitError::BadConfig(
            "element width must be at least 1 bit".to_string(),
        ));
    }
    if width > MAX_WIDTH {
        return Err(super::signal::SignalError::WidthOutOfRange(width).into());
    }
    Ok(())
}

/// The circuit under construction or simulation.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    elements: Vec<Element>,
    graph: Graph,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ElementId {
        ElementId(self.elements.len())
    }

    // --- element constructors -------------------------------------------

    /// Add an n-ary logic gate. `Not` and `Buffer` take exactly one
    /// input, the remaining kinds at least two.
    pub fn add_gate(
        &mut self,
        label: &str,
        kind: GateKind,
        width: u32,
        inputs: usize,
        delay: Delay,
    ) -> Result<ElementId, CircuitError> {
        check_width(width)?;
        let unary = matches!(kind, GateKind::Not | GateKind::Buffer);
        if unary && inputs != 1 {
            return Err(CircuitError::BadConfig(format!(
                "{:?} gate takes exactly one input, got {}",
                kind, inputs
            )));
        }
        if !unary && inputs < 2 {
            return Err(CircuitError::BadConfig(format!(
                "{:?} gate needs at least two inputs, got {}",
                kind, inputs
            )));
        }
        let id = self.next_id();
        let ins = (0..inputs)
            .map(|i| {
                self.graph
                    .add_pin(id, label, &format!("in{}", i), PinKind::Input, width, false)
            })
            .collect();
        let out = self.graph.add_pin(id, label, "out", PinKind::Output, width, false);
        self.elements.push(Element::Gate(Gate {
            label: label.to_string(),
            kind,
            width,
            inputs: ins,
            out,
            delay,
            pending: Signal::zero(width),
        }));
        Ok(id)
    }

    /// Add a lookup-table element with single-bit inputs and outputs.
    /// `rows` holds one packed output word per input combination, indexed
    /// by the inputs read as an integer (in0 is bit 0).
    pub fn add_truth_table(
        &mut self,
        label: &str,
        inputs: usize,
        outputs: usize,
        rows: &[u64],
        delay: Delay,
    ) -> Result<ElementId, CircuitError> {
        if inputs == 0 || inputs > 8 {
            return Err(CircuitError::BadConfig(format!(
                "truth table supports 1 to 8 inputs, got {}",
                inputs
            )));
        }
        check_width(outputs as u32)?;
        if rows.len() != 1 << inputs {
            return Err(CircuitError::BadConfig(format!(
                "truth table over {} inputs needs {} rows, got {}",
                inputs,
                1usize << inputs,
                rows.len()
            )));
        }
        let id = self.next_id();
        let ins = (0..inputs)
            .map(|i| self.graph.add_pin(id, label, &format!("in{}", i), PinKind::Input, 1, false))
            .collect();
        let outs = (0..outputs)
            .map(|i| self.graph.add_pin(id, label, &format!("out{}", i), PinKind::Output, 1, false))
            .collect();
        self.elements.push(Element::TruthTable(TruthTable {
            label: label.to_string(),
            inputs: ins,
            outputs: outs,
            rows: rows.to_vec(),
            delay,
            pending: Signal::zero(outputs as u32),
        }));
        Ok(id)
    }

    /// Add a ripple adder with carry in and carry out. The propagation
    /// delay scales with the width: `delay_per_bit` ticks per bit.
    pub fn add_adder(
        &mut self,
        label: &str,
        width: u32,
        delay_per_bit: Delay,
    ) -> Result<ElementId, CircuitError> {
        check_width(width)?;
        // Sum and carry travel in one value, so the carry needs a bit
        // above the sum width
        if width >= MAX_WIDTH {
            return Err(CircuitError::BadConfig(format!(
                "adder supports widths up to {} bits, got {}",
                MAX_WIDTH - 1,
                width
            )));
        }
        let id = self.next_id();
        let a = self.graph.add_pin(id, label, "a", PinKind::Input, width, false);
        let b = self.graph.add_pin(id, label, "b", PinKind::Input, width, false);
        let cin = self.graph.add_pin(id, label, "cin", PinKind::Input, 1, false);
        let sum = self.graph.add_pin(id, label, "sum", PinKind::Output, width, false);
        let cout = self.graph.add_pin(id, label, "cout", PinKind::Output, 1, false);
        self.elements.push(Element::Adder(Adder {
            label: label.to_string(),
            width,
            a,
            b,
            cin,
            sum,
            cout,
            delay: delay_per_bit * width as Delay,
            pending: Signal::zero(width + 1),
        }));
        Ok(id)
    }

    /// Add a one-hot decoder: `sel_width` select bits drive `2^sel_width`
    /// single-bit outputs, of which exactly the addressed one is high.
    pub fn add_decoder(
        &mut self,
        label: &str,
        sel_width: u32,
        delay: Delay,
    ) -> Result<ElementId, CircuitError> {
        if sel_width == 0 || sel_width > 6 {
            return Err(CircuitError::BadConfig(format!(
                "decoder supports 1 to 6 select bits, got {}",
                sel_width
            )));
        }
        let id = self.next_id();
        let sel = self.graph.add_pin(id, label, "sel", PinKind::Input, sel_width, false);
        let outs = (0..1u32 << sel_width)
            .map(|i| self.graph.add_pin(id, label, &format!("out{}", i), PinKind::Output, 1, false))
            .collect();
        self.elements.push(Element::Decoder(Decoder {
            label: label.to_string(),
            sel_width,
            sel,
            outputs: outs,
            delay,
            pending: Signal::zero(1 << sel_width),
        }));
        Ok(id)
    }

    /// Add a multiplexer selecting one of `2^sel_width` data inputs.
    pub fn add_mux(
        &mut self,
        label: &str,
        width: u32,
        sel_width: u32,
        delay: Delay,
    ) -> Result<ElementId, CircuitError> {
        check_width(width)?;
        if sel_width == 0 || sel_width > 6 {
            return Err(CircuitError::BadConfig(format!(
                "mux supports 1 to 6 select bits, got {}",
                sel_width
            )));
        }
        let id = self.next_id();
        let ins = (0..1u32 << sel_width)
            .map(|i| self.graph.add_pin(id, label, &format!("in{}", i), PinKind::Input, width, false))
            .collect();
        let sel = self.graph.add_pin(id, label, "sel", PinKind::Input, sel_width, false);
        let out = self.graph.add_pin(id, label, "out", PinKind::Output, width, false);
        self.elements.push(Element::Mux(Mux {
            label: label.to_string(),
            width,
            inputs: ins,
            sel,
            out,
            delay,
            pending: Signal::zero(width),
        }));
        Ok(id)
    }

    /// Add a register. `initial` is the value driven on `q` at reset.
    pub fn add_register(
        &mut self,
        label: &str,
        kind: RegisterKind,
        width: u32,
        initial: u64,
        delay: Delay,
    ) -> Result<ElementId, CircuitError> {
        check_width(width)?;
        let id = self.next_id();
        let clk = self.graph.add_pin(id, label, "clk", PinKind::Input, 1, false);
        let d = self.graph.add_pin(id, label, "d", PinKind::Input, width, false);
        let q = self.graph.add_pin(id, label, "q", PinKind::Output, width, false);
        let nq = self.graph.add_pin(id, label, "nq", PinKind::Output, width, false);
        let initial = Signal::from_u64(width, initial);
        self.elements.push(Element::Register(Register {
            label: label.to_string(),
            kind,
            width,
            clk,
            d,
            q,
            nq,
            delay,
            initial,
            last_clock: false,
            pending: initial,
        }));
        Ok(id)
    }

    /// Add a RAM or ROM of `words` addressable words. Control inputs
    /// (`cs`, `we`, `oe`) are active low; `dout` is tri-state. ROMs have
    /// no `we`/`din` pins and get their contents from `load_image`.
    pub fn add_memory(
        &mut self,
        label: &str,
        kind: MemoryKind,
        words: usize,
        data_width: u32,
        access: Delay,
    ) -> Result<ElementId, CircuitError> {
        check_width(data_width)?;
        if words == 0 {
            return Err(CircuitError::BadConfig(
                "memory needs at least one word".to_string(),
            ));
        }
        let addr_width = words.next_power_of_two().trailing_zeros().max(1);
        if addr_width > MAX_ADDR_WIDTH {
            return Err(CircuitError::BadConfig(format!(
                "memory of {} words needs {} address bits, supported maximum is {}",
                words, addr_width, MAX_ADDR_WIDTH
            )));
        }
        let id = self.next_id();
        let addr = self.graph.add_pin(id, label, "addr", PinKind::Input, addr_width, false);
        let cs = self.graph.add_pin(id, label, "cs", PinKind::Input, 1, false);
        let oe = self.graph.add_pin(id, label, "oe", PinKind::Input, 1, false);
        let (we, din) = match kind {
            MemoryKind::Ram => (
                Some(self.graph.add_pin(id, label, "we", PinKind::Input, 1, false)),
                Some(self.graph.add_pin(id, label, "din", PinKind::Input, data_width, false)),
            ),
            MemoryKind::Rom => (None, None),
        };
        let dout = self.graph.add_pin(id, label, "dout", PinKind::Output, data_width, true);
        self.elements.push(Element::Memory(Memory::new(
            label.to_string(),
            kind,
            words,
            data_width,
            addr,
            cs,
            oe,
            we,
            din,
            dout,
            access,
        )));
        Ok(id)
    }

    /// Add a free-running clock source driving low at reset.
    pub fn add_clock(
        &mut self,
        label: &str,
        half_period: Delay,
    ) -> Result<ElementId, CircuitError> {
        if half_period == 0 {
            return Err(CircuitError::BadConfig(
                "clock half period must be at least 1 tick".to_string(),
            ));
        }
        let id = self.next_id();
        let out = self.graph.add_pin(id, label, "out", PinKind::Output, 1, false);
        self.elements.push(Element::Clock(Clock {
            label: label.to_string(),
            half_period,
            out,
            level: false,
        }));
        Ok(id)
    }

    /// Add a constant stimulus source. Its output is tri-state so it can
    /// later be released (set to floating) through the simulator.
    pub fn add_constant(&mut self, label: &str, value: Signal) -> Result<ElementId, CircuitError> {
        check_width(value.width())?;
        let id = self.next_id();
        let out = self.graph.add_pin(id, label, "out", PinKind::Output, value.width(), true);
        self.elements.push(Element::Constant(Constant {
            label: label.to_string(),
            value,
            out,
        }));
        Ok(id)
    }

    /// Add a tri-state buffer: `out` follows `data` while `en` is high
    /// and floats while it is low.
    pub fn add_tristate(
        &mut self,
        label: &str,
        width: u32,
        delay: Delay,
    ) -> Result<ElementId, CircuitError> {
        check_width(width)?;
        let id = self.next_id();
        let data = self.graph.add_pin(id, label, "data", PinKind::Input, width, false);
        let en = self.graph.add_pin(id, label, "en", PinKind::Input, 1, false);
        let out = self.graph.add_pin(id, label, "out", PinKind::Output, width, true);
        self.elements.push(Element::TriState(TriStateBuffer {
            label: label.to_string(),
            width,
            data,
            en,
            out,
            delay,
            pending: Signal::floating(width),
        }));
        Ok(id)
    }

    /// Add a finite-state-machine element from its table description.
    pub fn add_state_machine(
        &mut self,
        label: &str,
        config: FsmConfig,
    ) -> Result<ElementId, CircuitError> {
        for (_, width) in config.inputs.iter().chain(config.outputs.iter()) {
            check_width(*width)?;
        }
        let compiled = fsm::compile(&config)?;
        let id = self.next_id();
        let clk = self.graph.add_pin(id, label, "clk", PinKind::Input, 1, false);
        let input_pins: Vec<PinId> = config
            .inputs
            .iter()
            .map(|(name, width)| self.graph.add_pin(id, label, name, PinKind::Input, *width, false))
            .collect();
        let output_pins: Vec<PinId> = config
            .outputs
            .iter()
            .map(|(name, width)| self.graph.add_pin(id, label, name, PinKind::Output, *width, false))
            .collect();
        self.elements.push(Element::StateMachine(StateMachine::assemble(
            label.to_string(),
            config,
            compiled,
            clk,
            input_pins,
            output_pins,
        )));
        Ok(id)
    }

    /// Add a named wire endpoint. All endpoints sharing a name are merged
    /// into one net at repartition time.
    pub fn add_endpoint(&mut self, name: &str) -> Result<ElementId, CircuitError> {
        if name.is_empty() {
            return Err(CircuitError::BadConfig(
                "endpoint name must not be empty".to_string(),
            ));
        }
        if name.contains('/') {
            return Err(CircuitError::BadConfig(format!(
                "endpoint name '{}' may not contain '/', which separates instance paths",
                name
            )));
        }
        let id = self.next_id();
        let pin = self.graph.add_pin(id, name, "pin", PinKind::Input, 0, false);
        self.elements.push(Element::NamedEndpoint(NamedEndpoint {
            label: name.to_string(),
            pin,
        }));
        Ok(id)
    }

    /// Add a display probe that records every value change on its input.
    pub fn add_display(&mut self, label: &str) -> Result<ElementId, CircuitError> {
        let id = self.next_id();
        let input = self.graph.add_pin(id, label, "in", PinKind::Input, 0, false);
        self.elements.push(Element::Display(Display::new(label.to_string(), input)));
        Ok(id)
    }

    /// Instantiate a sub-circuit template. Every named endpoint of the
    /// template becomes a port pin on the returned facade element; the
    /// template's elements and wires are copied in with fresh handles and
    /// instance-prefixed labels, and the inner endpoints are bridged to
    /// the facade ports.
    pub fn instantiate(
        &mut self,
        label: &str,
        template: &Netlist,
    ) -> Result<ElementId, CircuitError> {
        if label.is_empty() {
            return Err(CircuitError::BadConfig(
                "instance label must not be empty".to_string(),
            ));
        }
        if label.contains('/') {
            return Err(CircuitError::BadConfig(format!(
                "instance label '{}' may not contain '/', which separates instance paths",
                label
            )));
        }
        // A reused label would give two instances the same prefix and
        // merge their inner endpoint groups
        if self
            .elements
            .iter()
            .any(|el| matches!(el, Element::SubCircuit(sc) if sc.label == label))
        {
            return Err(CircuitError::BadConfig(format!(
                "instance label '{}' is already in use",
                label
            )));
        }

        // Facade ports, one per distinct endpoint name, in template order
        let mut port_names: Vec<&str> = Vec::new();
        for el in &template.elements {
            if let Element::NamedEndpoint(ep) = el {
                if !port_names.contains(&ep.label.as_str()) {
                    port_names.push(&ep.label);
                }
            }
        }

        let facade_id = self.next_id();
        let ports: Vec<(String, PinId)> = port_names
            .iter()
            .map(|name| {
                let pin = self.graph.add_pin(facade_id, label, name, PinKind::Input, 0, false);
                (name.to_string(), pin)
            })
            .collect();
        self.elements.push(Element::SubCircuit(SubCircuit {
            label: label.to_string(),
            ports: ports.clone(),
        }));

        // Copy the template's pin arena, remapped onto fresh element ids
        let element_base = self.elements.len();
        let pin_map: Vec<PinId> = template
            .graph
            .pins
            .iter()
            .map(|pin| {
                let owner = ElementId(element_base + pin.element.index());
                let owner_label =
                    format!("{}/{}", label, template.elements[pin.element.index()].label());
                self.graph.add_pin(
                    owner,
                    &owner_label,
                    &pin.name,
                    pin.kind,
                    pin.declared_width,
                    pin.tri_state,
                )
            })
            .collect();

        // Copy the elements themselves with remapped pins and prefixed
        // labels (prefixing keeps inner endpoint names from capturing
        // same-named endpoints outside the instance)
        for el in &template.elements {
            let mut copy = el.clone();
            copy.remap_pins(&pin_map);
            copy.prefix_label(label);
            self.elements.push(copy);
        }

        // Copy live wires
        for wire in template.graph.wires.iter().flatten() {
            self.graph.wires.push(Some(Wire {
                a: pin_map[wire.a.index()],
                b: pin_map[wire.b.index()],
            }));
        }

        // Bridge each facade port to the instance's matching endpoints
        for (name, facade_pin) in &ports {
            for el in &template.elements {
                if let Element::NamedEndpoint(ep) = el {
                    if &ep.label == name {
                        self.graph.wires.push(Some(Wire {
                            a: *facade_pin,
                            b: pin_map[ep.pin.index()],
                        }));
                    }
                }
            }
        }
        Ok(facade_id)
    }

    // --- wiring ----------------------------------------------------------

    /// Look up a pin by its port name on an element.
    pub fn pin(&self, element: ElementId, name: &str) -> Result<PinId, CircuitError> {
        if element.index() >= self.elements.len() {
            return Err(CircuitError::UnknownElement(element));
        }
        self.graph
            .pins
            .iter()
            .position(|p| p.element == element && p.name == name)
            .map(PinId)
            .ok_or_else(|| CircuitError::NoSuchPort {
                element,
                name: name.to_string(),
            })
    }

    /// Wire two pins together, merging their nets. The merged net is
    /// validated before anything is mutated, so a conflict leaves the
    /// graph unchanged. Endpoint-name merging is applied by
    /// `repartition`, not here.
    pub fn connect(&mut self, a: PinId, b: PinId) -> Result<WireId, CircuitError> {
        if a.index() >= self.graph.pins.len() {
            return Err(CircuitError::UnknownPin(a));
        }
        if b.index() >= self.graph.pins.len() {
            return Err(CircuitError::UnknownPin(b));
        }
        if a == b {
            return Err(CircuitError::BadConfig(
                "cannot wire a pin to itself".to_string(),
            ));
        }

        // 1. Collect the membership the merged net would have
        let mut members: Vec<PinId> = Vec::new();
        for pid in [a, b] {
            match self.graph.pins[pid.index()].net {
                Some(net) => members.extend(self.graph.nets[net.index()].pins.iter().copied()),
                None => members.push(pid),
            }
        }
        members.sort_unstable();
        members.dedup();

        // 2. Validate before mutating
        let (width, tri_state) = partition::validate_members(&self.graph.pins, &members)?;

        // 3. Commit the wire and merge into the lower-numbered net
        let wire = WireId(self.graph.wires.len());
        self.graph.wires.push(Some(Wire { a, b }));
        let net_a = self.graph.pins[a.index()].net;
        let net_b = self.graph.pins[b.index()].net;
        let target = match (net_a, net_b) {
            (Some(na), Some(nb)) if na == nb => na,
            (Some(na), Some(nb)) => {
                let (keep, drop) = if na < nb { (na, nb) } else { (nb, na) };
                self.graph.nets[drop.index()].pins.clear();
                keep
            }
            (Some(na), None) => na,
            (None, Some(nb)) => nb,
            (None, None) => {
                let id = NetId(self.graph.nets.len());
                self.graph.nets.push(Net {
                    pins: Vec::new(),
                    width: 0,
                    tri_state: false,
                    value: Signal::empty(),
                    conflict: false,
                });
                id
            }
        };
        {
            let net = &mut self.graph.nets[target.index()];
            net.pins = members.clone();
            net.width = width;
            net.tri_state = tri_state;
            net.value = Signal::floating(width);
            net.conflict = false;
        }
        for pid in members {
            let pin = &mut self.graph.pins[pid.index()];
            pin.net = Some(target);
            if pin.declared_width == 0 {
                pin.width = width;
            }
        }
        Ok(wire)
    }

    /// Remove a wire. Splitting may break a net in two, so the whole
    /// partition is rebuilt.
    pub fn disconnect(&mut self, wire: WireId) -> Result<(), CircuitError> {
        match self.graph.wires.get_mut(wire.index()) {
            Some(slot @ Some(_)) => *slot = None,
            _ => return Err(CircuitError::UnknownWire(wire)),
        }
        self.repartition()?;
        Ok(())
    }

    /// Rebuild the net partition from scratch: wires plus endpoint-name
    /// merges. Invalidates previously returned `NetId`s.
    pub fn repartition(&mut self) -> Result<(), NetConflict> {
        let groups = self.endpoint_groups();
        partition::rebuild(&mut self.graph, &groups)
    }

    fn endpoint_groups(&self) -> Vec<Vec<PinId>> {
        let mut map: BTreeMap<&str, Vec<PinId>> = BTreeMap::new();
        for el in &self.elements {
            if let Element::NamedEndpoint(ep) = el {
                map.entry(ep.label.as_str()).or_default().push(ep.pin);
            }
        }
        map.into_values().filter(|group| group.len() >= 2).collect()
    }

    // --- queries ---------------------------------------------------------

    /// Value currently seen at a pin; the empty signal when unattached.
    /// The handle must come from this netlist.
    pub fn pin_value(&self, pin: PinId) -> Signal {
        self.graph.pin_value(pin)
    }

    /// Dotted `element.port` path for diagnostics and traces.
    pub fn pin_path(&self, pin: PinId) -> &str {
        &self.graph.pin(pin).path
    }

    pub fn net_of(&self, pin: PinId) -> Option<NetId> {
        self.graph.pins.get(pin.index()).and_then(|p| p.net)
    }

    /// Net attributes from the current partition, `None` for a stale or
    /// merged-away handle.
    pub fn net(&self, net: NetId) -> Option<&Net> {
        self.graph.nets.get(net.index()).filter(|n| !n.is_vacant())
    }

    /// True while the net's active drivers disagree.
    pub fn net_conflicted(&self, net: NetId) -> bool {
        self.net(net).map_or(false, |n| n.conflict)
    }

    pub fn net_count(&self) -> usize {
        self.graph.nets.iter().filter(|n| !n.is_vacant()).count()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn element(&self, id: ElementId) -> Result<&Element, CircuitError> {
        self.elements
            .get(id.index())
            .ok_or(CircuitError::UnknownElement(id))
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, CircuitError> {
        self.elements
            .get_mut(id.index())
            .ok_or(CircuitError::UnknownElement(id))
    }

    /// Access a memory element, e.g. to load an initialization image or
    /// read its write history.
    pub fn memory(&self, id: ElementId) -> Result<&Memory, CircuitError> {
        match self.element(id)? {
            Element::Memory(m) => Ok(m),
            _ => Err(CircuitError::WrongElementKind {
                element: id,
                expected: "memory",
            }),
        }
    }

    pub fn memory_mut(&mut self, id: ElementId) -> Result<&mut Memory, CircuitError> {
        match self.element_mut(id)? {
            Element::Memory(m) => Ok(m),
            _ => Err(CircuitError::WrongElementKind {
                element: id,
                expected: "memory",
            }),
        }
    }

    pub fn display(&self, id: ElementId) -> Result<&Display, CircuitError> {
        match self.element(id)? {
            Element::Display(d) => Ok(d),
            _ => Err(CircuitError::WrongElementKind {
                element: id,
                expected: "display",
            }),
        }
    }

    pub fn state_machine(&self, id: ElementId) -> Result<&StateMachine, CircuitError> {
        match self.element(id)? {
            Element::StateMachine(sm) => Ok(sm),
            _ => Err(CircuitError::WrongElementKind {
                element: id,
                expected: "state machine",
            }),
        }
    }

    /// Split into the element arena and the wiring graph so a reacting
    /// element and the graph can be borrowed at the same time.
    pub(crate) fn split_mut(&mut self) -> (&mut [Element], &mut Graph) {
        (&mut self.elements, &mut self.graph)
    }
}
