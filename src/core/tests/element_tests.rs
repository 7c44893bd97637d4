use crate::core::elements::{
    ClockEdge, FsmConfig, FsmGuard, FsmStateConfig, FsmTransitionConfig, GateKind, MemoryKind,
    RegisterKind,
};
use crate::core::netlist::Netlist;
use crate::core::signal::Signal;
use crate::core::simulator::Simulator;
use crate::core::types::{ElementId, PinId};

/// Wire an endpoint onto a pin so its net exists and can be observed.
fn attach(n: &mut Netlist, name: &str, pin: PinId) {
    let ep = n.add_endpoint(name).expect("endpoint builds");
    let ep_pin = n.pin(ep, "pin").expect("pin");
    n.connect(pin, ep_pin).expect("wiring succeeds");
}

fn settle(n: &mut Netlist) -> Simulator {
    let mut sim = Simulator::new();
    sim.init_sim(n).expect("reset succeeds");
    assert!(sim.run_to_quiescence(n, Some(100_000)), "circuit settles");
    sim
}

fn binary_gate(kind: GateKind, a: u64, b: u64, width: u32) -> u64 {
    let mut n = Netlist::new();
    let ca = n.add_constant("a", Signal::from_u64(width, a)).expect("constant builds");
    let cb = n.add_constant("b", Signal::from_u64(width, b)).expect("constant builds");
    let g = n.add_gate("g", kind, width, 2, 10).expect("gate builds");
    let out = n.pin(g, "out").expect("pin");
    n.connect(n.pin(ca, "out").expect("pin"), n.pin(g, "in0").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(cb, "out").expect("pin"), n.pin(g, "in1").expect("pin"))
        .expect("wiring succeeds");
    attach(&mut n, "y", out);
    settle(&mut n);
    n.pin_value(out).to_u64().expect("gate output is driven")
}

#[test]
fn test_gate_truth_tables() {
    for (a, b) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        assert_eq!(binary_gate(GateKind::And, a, b, 1), a & b, "and {} {}", a, b);
        assert_eq!(binary_gate(GateKind::Or, a, b, 1), a | b, "or {} {}", a, b);
        assert_eq!(binary_gate(GateKind::Xor, a, b, 1), a ^ b, "xor {} {}", a, b);
        assert_eq!(binary_gate(GateKind::Nand, a, b, 1), 1 ^ (a & b), "nand {} {}", a, b);
        assert_eq!(binary_gate(GateKind::Nor, a, b, 1), 1 ^ (a | b), "nor {} {}", a, b);
        assert_eq!(binary_gate(GateKind::Xnor, a, b, 1), 1 ^ a ^ b, "xnor {} {}", a, b);
    }
}

#[test]
fn test_gates_operate_bitwise_over_the_width() {
    assert_eq!(binary_gate(GateKind::And, 0b1100, 0b1010, 4), 0b1000);
    assert_eq!(binary_gate(GateKind::Or, 0b1100, 0b1010, 4), 0b1110);
    assert_eq!(binary_gate(GateKind::Nand, 0b1100, 0b1010, 4), 0b0111);
}

#[test]
fn test_inverter_and_buffer() {
    let mut n = Netlist::new();
    let c = n.add_constant("c", Signal::from_u64(4, 0b0101)).expect("constant builds");
    let inv = n.add_gate("inv", GateKind::Not, 4, 1, 10).expect("gate builds");
    let buf = n.add_gate("buf", GateKind::Buffer, 4, 1, 10).expect("gate builds");
    let c_out = n.pin(c, "out").expect("pin");
    n.connect(c_out, n.pin(inv, "in0").expect("pin")).expect("wiring succeeds");
    n.connect(c_out, n.pin(buf, "in0").expect("pin")).expect("wiring succeeds");
    let inv_out = n.pin(inv, "out").expect("pin");
    let buf_out = n.pin(buf, "out").expect("pin");
    attach(&mut n, "ni", inv_out);
    attach(&mut n, "nb", buf_out);

    settle(&mut n);
    assert_eq!(n.pin_value(inv_out).to_u64(), Some(0b1010));
    assert_eq!(n.pin_value(buf_out).to_u64(), Some(0b0101));
}

#[test]
fn test_three_input_gate() {
    let mut n = Netlist::new();
    let g = n.add_gate("or3", GateKind::Or, 1, 3, 10).expect("gate builds");
    for (i, v) in [0u64, 0, 1].iter().enumerate() {
        let c = n.add_constant(&format!("c{}", i), Signal::from_u64(1, *v)).expect("constant builds");
        let g_in = n.pin(g, &format!("in{}", i)).expect("pin");
        n.connect(n.pin(c, "out").expect("pin"), g_in).expect("wiring succeeds");
    }
    let out = n.pin(g, "out").expect("pin");
    attach(&mut n, "y", out);
    settle(&mut n);
    assert_eq!(n.pin_value(out).to_u64(), Some(1));
}

#[test]
fn test_truth_table_half_adder() {
    // in0 + in1 -> out0 sum, out1 carry
    let rows = [0b00, 0b01, 0b01, 0b10];
    let mut n = Netlist::new();
    let ca = n.add_constant("a", Signal::zero(1)).expect("constant builds");
    let cb = n.add_constant("b", Signal::zero(1)).expect("constant builds");
    let tt = n.add_truth_table("ha", 2, 2, &rows, 10).expect("table builds");
    n.connect(n.pin(ca, "out").expect("pin"), n.pin(tt, "in0").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(cb, "out").expect("pin"), n.pin(tt, "in1").expect("pin"))
        .expect("wiring succeeds");
    let sum = n.pin(tt, "out0").expect("pin");
    let carry = n.pin(tt, "out1").expect("pin");
    attach(&mut n, "s", sum);
    attach(&mut n, "c", carry);

    let mut sim = Simulator::new();
    sim.init_sim(&mut n).expect("reset succeeds");
    for (a, b, want_sum, want_carry) in
        [(0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 1, 0), (1, 1, 0, 1)]
    {
        sim.set_constant(&mut n, ca, Signal::from_u64(1, a)).expect("stimulus applies");
        sim.set_constant(&mut n, cb, Signal::from_u64(1, b)).expect("stimulus applies");
        assert!(sim.run_to_quiescence(&mut n, Some(10_000)), "table settles");
        assert_eq!(n.pin_value(sum).to_u64(), Some(want_sum), "sum of {}+{}", a, b);
        assert_eq!(n.pin_value(carry).to_u64(), Some(want_carry), "carry of {}+{}", a, b);
    }
}

#[test]
fn test_adder_wraps_and_carries() {
    let mut n = Netlist::new();
    let ca = n.add_constant("a", Signal::from_u64(4, 7)).expect("constant builds");
    let cb = n.add_constant("b", Signal::from_u64(4, 8)).expect("constant builds");
    let cc = n.add_constant("ci", Signal::from_bool(true)).expect("constant builds");
    let add = n.add_adder("add", 4, 5).expect("adder builds");
    n.connect(n.pin(ca, "out").expect("pin"), n.pin(add, "a").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(cb, "out").expect("pin"), n.pin(add, "b").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(cc, "out").expect("pin"), n.pin(add, "cin").expect("pin"))
        .expect("wiring succeeds");
    let sum = n.pin(add, "sum").expect("pin");
    let cout = n.pin(add, "cout").expect("pin");
    attach(&mut n, "s", sum);
    attach(&mut n, "co", cout);

    settle(&mut n);
    // 7 + 8 + 1 = 16 wraps a 4-bit sum
    assert_eq!(n.pin_value(sum).to_u64(), Some(0));
    assert_eq!(n.pin_value(cout).to_u64(), Some(1));
}

#[test]
fn test_adder_reads_unattached_inputs_as_zero() {
    let mut n = Netlist::new();
    let ca = n.add_constant("a", Signal::from_u64(4, 7)).expect("constant builds");
    let add = n.add_adder("add", 4, 5).expect("adder builds");
    n.connect(n.pin(ca, "out").expect("pin"), n.pin(add, "a").expect("pin"))
        .expect("wiring succeeds");
    let sum = n.pin(add, "sum").expect("pin");
    attach(&mut n, "s", sum);

    settle(&mut n);
    assert_eq!(n.pin_value(sum).to_u64(), Some(7), "b and cin float, reading as zero");
}

#[test]
fn test_decoder_one_hot_output() {
    let mut n = Netlist::new();
    let sel = n.add_constant("sel", Signal::from_u64(2, 2)).expect("constant builds");
    let dec = n.add_decoder("dec", 2, 10).expect("decoder builds");
    n.connect(n.pin(sel, "out").expect("pin"), n.pin(dec, "sel").expect("pin"))
        .expect("wiring succeeds");
    let outs: Vec<PinId> = (0..4)
        .map(|i| {
            let pin = n.pin(dec, &format!("out{}", i)).expect("pin");
            attach(&mut n, &format!("o{}", i), pin);
            pin
        })
        .collect();

    settle(&mut n);
    for (i, &pin) in outs.iter().enumerate() {
        let want = (i == 2) as u64;
        assert_eq!(n.pin_value(pin).to_u64(), Some(want), "decoder output {}", i);
    }
}

#[test]
fn test_mux_follows_the_select() {
    let mut n = Netlist::new();
    let c0 = n.add_constant("c0", Signal::from_u64(8, 0x11)).expect("constant builds");
    let c1 = n.add_constant("c1", Signal::from_u64(8, 0x22)).expect("constant builds");
    let sel = n.add_constant("sel", Signal::zero(1)).expect("constant builds");
    let mux = n.add_mux("mux", 8, 1, 10).expect("mux builds");
    n.connect(n.pin(c0, "out").expect("pin"), n.pin(mux, "in0").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(c1, "out").expect("pin"), n.pin(mux, "in1").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(sel, "out").expect("pin"), n.pin(mux, "sel").expect("pin"))
        .expect("wiring succeeds");
    let out = n.pin(mux, "out").expect("pin");
    attach(&mut n, "y", out);

    let mut sim = settle(&mut n);
    assert_eq!(n.pin_value(out).to_u64(), Some(0x11));

    sim.set_constant(&mut n, sel, Signal::from_bool(true)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(out).to_u64(), Some(0x22));
}

#[test]
fn test_register_reset_drives_initial_value() {
    let mut n = Netlist::new();
    let reg = n.add_register("r", RegisterKind::PosFf, 4, 5, 10).expect("register builds");
    let q = n.pin(reg, "q").expect("pin");
    let nq = n.pin(reg, "nq").expect("pin");
    attach(&mut n, "q", q);
    attach(&mut n, "nq", nq);

    settle(&mut n);
    assert_eq!(n.pin_value(q).to_u64(), Some(5));
    assert_eq!(n.pin_value(nq).to_u64(), Some(0xA), "inverted output at reset");
}

#[test]
fn test_latch_is_transparent_while_clock_is_high() {
    let mut n = Netlist::new();
    let clk = n.add_constant("clk", Signal::from_bool(true)).expect("constant builds");
    let d = n.add_constant("d", Signal::from_u64(2, 2)).expect("constant builds");
    let reg = n.add_register("lat", RegisterKind::Latch, 2, 0, 10).expect("register builds");
    n.connect(n.pin(clk, "out").expect("pin"), n.pin(reg, "clk").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(d, "out").expect("pin"), n.pin(reg, "d").expect("pin"))
        .expect("wiring succeeds");
    let q = n.pin(reg, "q").expect("pin");
    attach(&mut n, "q", q);

    let mut sim = settle(&mut n);
    assert_eq!(n.pin_value(q).to_u64(), Some(2), "open latch follows d");

    sim.set_constant(&mut n, d, Signal::from_u64(2, 3)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(q).to_u64(), Some(3), "d changes flow through an open latch");

    sim.set_constant(&mut n, clk, Signal::from_bool(false)).expect("stimulus applies");
    sim.set_constant(&mut n, d, Signal::from_u64(2, 1)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(q).to_u64(), Some(3), "closed latch holds its value");
}

#[test]
fn test_pos_ff_captures_only_on_the_rising_edge() {
    let mut n = Netlist::new();
    let clk = n.add_constant("clk", Signal::zero(1)).expect("constant builds");
    let d = n.add_constant("d", Signal::from_bool(true)).expect("constant builds");
    let reg = n.add_register("ff", RegisterKind::PosFf, 1, 0, 10).expect("register builds");
    n.connect(n.pin(clk, "out").expect("pin"), n.pin(reg, "clk").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(d, "out").expect("pin"), n.pin(reg, "d").expect("pin"))
        .expect("wiring succeeds");
    let q = n.pin(reg, "q").expect("pin");
    attach(&mut n, "q", q);

    let mut sim = settle(&mut n);
    assert_eq!(n.pin_value(q).to_u64(), Some(0), "no edge yet");

    sim.set_constant(&mut n, clk, Signal::from_bool(true)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(q).to_u64(), Some(1), "rising edge captures d");
    let commits_after_capture = sim.stats().commits;

    // Falling edge is a no-op, and a second rise capturing the same
    // value coalesces away
    sim.set_constant(&mut n, clk, Signal::from_bool(false)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    sim.set_constant(&mut n, clk, Signal::from_bool(true)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(q).to_u64(), Some(1));
    assert_eq!(
        sim.stats().commits,
        commits_after_capture,
        "recapturing an unchanged value must not commit again"
    );
}

#[test]
fn test_neg_ff_captures_on_the_falling_edge() {
    let mut n = Netlist::new();
    let clk = n.add_constant("clk", Signal::from_bool(true)).expect("constant builds");
    let d = n.add_constant("d", Signal::from_u64(4, 9)).expect("constant builds");
    let reg = n.add_register("ff", RegisterKind::NegFf, 4, 0, 10).expect("register builds");
    n.connect(n.pin(clk, "out").expect("pin"), n.pin(reg, "clk").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(d, "out").expect("pin"), n.pin(reg, "d").expect("pin"))
        .expect("wiring succeeds");
    let q = n.pin(reg, "q").expect("pin");
    attach(&mut n, "q", q);

    let mut sim = settle(&mut n);
    assert_eq!(n.pin_value(q).to_u64(), Some(0), "high level alone does not capture");

    sim.set_constant(&mut n, clk, Signal::from_bool(false)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(q).to_u64(), Some(9), "falling edge captures d");
}

#[test]
fn test_ram_write_then_read() {
    let mut n = Netlist::new();
    let addr = n.add_constant("addr", Signal::from_u64(3, 5)).expect("constant builds");
    let cs = n.add_constant("cs", Signal::zero(1)).expect("constant builds");
    let we = n.add_constant("we", Signal::zero(1)).expect("constant builds");
    let oe = n.add_constant("oe", Signal::from_bool(true)).expect("constant builds");
    let din = n.add_constant("din", Signal::from_u64(8, 0xC3)).expect("constant builds");
    let ram = n.add_memory("ram", MemoryKind::Ram, 8, 8, 40).expect("ram builds");
    for (c, pin) in [(addr, "addr"), (cs, "cs"), (we, "we"), (oe, "oe"), (din, "din")] {
        let target = n.pin(ram, pin).expect("pin");
        n.connect(n.pin(c, "out").expect("pin"), target).expect("wiring succeeds");
    }
    let dout = n.pin(ram, "dout").expect("pin");
    attach(&mut n, "dout", dout);

    // Write 0xC3 to word 5
    let mut sim = settle(&mut n);
    assert_eq!(n.memory(ram).expect("memory").word(5), Some(0xC3));
    let history = n.memory(ram).expect("memory").write_history();
    assert_eq!(history.len(), 1);
    assert_eq!((history[0].addr, history[0].value), (5, 0xC3));
    assert!(n.pin_value(dout).is_floating(), "output floats during a write");

    // Switch to a read of the same word
    sim.set_constant(&mut n, we, Signal::from_bool(true)).expect("stimulus applies");
    sim.set_constant(&mut n, oe, Signal::zero(1)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(dout).to_u64(), Some(0xC3));
}

#[test]
fn test_memory_releases_on_deselect_and_bad_address() {
    let mut n = Netlist::new();
    let addr = n.add_constant("addr", Signal::from_u64(2, 3)).expect("constant builds");
    let cs = n.add_constant("cs", Signal::zero(1)).expect("constant builds");
    let oe = n.add_constant("oe", Signal::zero(1)).expect("constant builds");
    let mem = n.add_memory("rom", MemoryKind::Rom, 3, 8, 20).expect("rom builds");
    for (c, pin) in [(addr, "addr"), (cs, "cs"), (oe, "oe")] {
        let target = n.pin(mem, pin).expect("pin");
        n.connect(n.pin(c, "out").expect("pin"), target).expect("wiring succeeds");
    }
    let dout = n.pin(mem, "dout").expect("pin");
    attach(&mut n, "dout", dout);
    assert!(n.memory_mut(mem).expect("memory").load_image("AA BB CC").is_none());

    // Address 3 of a 3-word memory is reachable on the 2-bit bus but
    // not backed by a word
    let mut sim = settle(&mut n);
    assert!(n.pin_value(dout).is_floating(), "out-of-range read releases");

    sim.set_constant(&mut n, addr, Signal::from_u64(2, 1)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(dout).to_u64(), Some(0xBB));

    sim.set_constant(&mut n, cs, Signal::from_bool(true)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert!(n.pin_value(dout).is_floating(), "deselected chip releases");
}

#[test]
fn test_tristate_buffer_drives_and_releases() {
    let mut n = Netlist::new();
    let data = n.add_constant("data", Signal::from_u64(4, 0xA)).expect("constant builds");
    let en = n.add_constant("en", Signal::zero(1)).expect("constant builds");
    let buf = n.add_tristate("buf", 4, 10).expect("buffer builds");
    n.connect(n.pin(data, "out").expect("pin"), n.pin(buf, "data").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(en, "out").expect("pin"), n.pin(buf, "en").expect("pin"))
        .expect("wiring succeeds");
    let out = n.pin(buf, "out").expect("pin");
    attach(&mut n, "bus", out);

    let mut sim = settle(&mut n);
    assert!(n.pin_value(out).is_floating(), "disabled buffer releases the bus");

    sim.set_constant(&mut n, en, Signal::from_bool(true)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(n.pin_value(out).to_u64(), Some(0xA));

    sim.set_constant(&mut n, en, Signal::zero(1)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert!(n.pin_value(out).is_floating(), "disabling releases again");
}

#[test]
fn test_clock_toggles_at_its_half_period() {
    let mut n = Netlist::new();
    let clk = n.add_clock("clk", 25).expect("clock builds");
    let out = n.pin(clk, "out").expect("pin");
    attach(&mut n, "c", out);

    let mut sim = Simulator::new();
    sim.init_sim(&mut n).expect("reset succeeds");
    sim.run_until(&mut n, 10);
    assert_eq!(n.pin_value(out).to_u64(), Some(0), "clock starts low");
    sim.run_until(&mut n, 30);
    assert_eq!(n.pin_value(out).to_u64(), Some(1), "first rise at 25");
    sim.run_until(&mut n, 55);
    assert_eq!(n.pin_value(out).to_u64(), Some(0), "fall at 50");
    sim.run_until(&mut n, 80);
    assert_eq!(n.pin_value(out).to_u64(), Some(1), "second rise at 75");

    assert!(
        !sim.run_to_quiescence(&mut n, Some(1_000)),
        "a free-running clock never drains the queue"
    );
}

#[test]
fn test_zero_period_clock_is_rejected() {
    let mut n = Netlist::new();
    assert!(n.add_clock("clk", 0).is_err());
}

fn walker_config() -> FsmConfig {
    FsmConfig {
        edge: ClockEdge::Rising,
        inputs: vec![("go".to_string(), 1)],
        outputs: vec![("busy".to_string(), 1)],
        states: vec![
            FsmStateConfig {
                name: "idle".to_string(),
                outputs: vec![],
                transitions: vec![FsmTransitionConfig {
                    target: "run".to_string(),
                    guard: FsmGuard::Equals("go".to_string(), 1),
                }],
            },
            FsmStateConfig {
                name: "run".to_string(),
                outputs: vec![("busy".to_string(), 1)],
                transitions: vec![
                    FsmTransitionConfig {
                        target: "idle".to_string(),
                        guard: FsmGuard::Equals("go".to_string(), 0),
                    },
                    FsmTransitionConfig {
                        target: "run".to_string(),
                        guard: FsmGuard::Else,
                    },
                ],
            },
        ],
        initial: "idle".to_string(),
        delay: 10,
    }
}

fn pulse_clock(sim: &mut Simulator, n: &mut Netlist, clk: ElementId) {
    sim.set_constant(n, clk, Signal::from_bool(true)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(n, Some(10_000)));
    sim.set_constant(n, clk, Signal::zero(1)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(n, Some(10_000)));
}

#[test]
fn test_state_machine_walks_its_table() {
    let mut n = Netlist::new();
    let clk = n.add_constant("clk", Signal::zero(1)).expect("constant builds");
    let go = n.add_constant("go", Signal::from_bool(true)).expect("constant builds");
    let fsm = n.add_state_machine("fsm", walker_config()).expect("machine builds");
    n.connect(n.pin(clk, "out").expect("pin"), n.pin(fsm, "clk").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(go, "out").expect("pin"), n.pin(fsm, "go").expect("pin"))
        .expect("wiring succeeds");
    let busy = n.pin(fsm, "busy").expect("pin");
    attach(&mut n, "busy", busy);

    let mut sim = settle(&mut n);
    assert_eq!(n.state_machine(fsm).expect("machine").state_name(), "idle");
    assert_eq!(n.pin_value(busy).to_u64(), Some(0));

    pulse_clock(&mut sim, &mut n, clk);
    assert_eq!(n.state_machine(fsm).expect("machine").state_name(), "run");
    assert_eq!(n.pin_value(busy).to_u64(), Some(1), "run state raises busy");

    // go stays high, the else transition keeps the machine running
    pulse_clock(&mut sim, &mut n, clk);
    assert_eq!(n.state_machine(fsm).expect("machine").state_name(), "run");

    sim.set_constant(&mut n, go, Signal::zero(1)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    pulse_clock(&mut sim, &mut n, clk);
    assert_eq!(n.state_machine(fsm).expect("machine").state_name(), "idle");
    assert_eq!(n.pin_value(busy).to_u64(), Some(0), "idle drops the undeclared output to zero");
}

#[test]
fn test_state_machine_without_matching_transition_holds() {
    let mut config = walker_config();
    config.states[0].transitions.clear();
    let mut n = Netlist::new();
    let clk = n.add_constant("clk", Signal::zero(1)).expect("constant builds");
    let fsm = n.add_state_machine("fsm", config).expect("machine builds");
    n.connect(n.pin(clk, "out").expect("pin"), n.pin(fsm, "clk").expect("pin"))
        .expect("wiring succeeds");

    let mut sim = settle(&mut n);
    pulse_clock(&mut sim, &mut n, clk);
    assert_eq!(n.state_machine(fsm).expect("machine").state_name(), "idle", "no transition, no move");
}

#[test]
fn test_falling_edge_state_machine() {
    let mut config = walker_config();
    config.edge = ClockEdge::Falling;
    let mut n = Netlist::new();
    let clk = n.add_constant("clk", Signal::from_bool(true)).expect("constant builds");
    let go = n.add_constant("go", Signal::from_bool(true)).expect("constant builds");
    let fsm = n.add_state_machine("fsm", config).expect("machine builds");
    n.connect(n.pin(clk, "out").expect("pin"), n.pin(fsm, "clk").expect("pin"))
        .expect("wiring succeeds");
    n.connect(n.pin(go, "out").expect("pin"), n.pin(fsm, "go").expect("pin"))
        .expect("wiring succeeds");

    let mut sim = settle(&mut n);
    assert_eq!(n.state_machine(fsm).expect("machine").state_name(), "idle");

    sim.set_constant(&mut n, clk, Signal::zero(1)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    assert_eq!(
        n.state_machine(fsm).expect("machine").state_name(),
        "run",
        "falling edge drives the transition"
    );
}

#[test]
fn test_display_logs_value_changes() {
    let mut n = Netlist::new();
    let c = n.add_constant("c", Signal::from_u64(4, 1)).expect("constant builds");
    let probe = n.add_display("probe").expect("display builds");
    n.connect(n.pin(c, "out").expect("pin"), n.pin(probe, "in").expect("pin"))
        .expect("wiring succeeds");

    let mut sim = settle(&mut n);
    sim.set_constant(&mut n, c, Signal::from_u64(4, 2)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));
    // Same value again must not add a record
    sim.set_constant(&mut n, c, Signal::from_u64(4, 2)).expect("stimulus applies");
    assert!(sim.run_to_quiescence(&mut n, Some(10_000)));

    let records = n.display(probe).expect("display").records();
    let values: Vec<_> = records.iter().map(|r| r.value.to_u64()).collect();
    assert_eq!(values, vec![Some(1), Some(2)], "one record per distinct value");
}
