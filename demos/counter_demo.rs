use lsim::{Netlist, RegisterKind, Signal, Simulator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    println!("🕐 Clocked Counter Demo");
    println!();

    let half_period = 50;
    let edges = 20;
    println!("Configuration:");
    println!("  Clock half period: {} ticks", half_period);
    println!("  Register delay: 5 ticks, adder delay: 10 ticks per bit");
    println!("  Rising edges to run: {}", edges);
    println!();

    // q feeds an incrementer whose sum feeds d, so every rising edge
    // captures q + 1
    let mut n = Netlist::new();
    let clk = n.add_clock("clk", half_period)?;
    let one = n.add_constant("one", Signal::from_u64(8, 1))?;
    let reg = n.add_register("count", RegisterKind::PosFf, 8, 0, 5)?;
    let add = n.add_adder("inc", 8, 10)?;
    n.connect(n.pin(clk, "out")?, n.pin(reg, "clk")?)?;
    n.connect(n.pin(one, "out")?, n.pin(add, "b")?)?;
    n.connect(n.pin(reg, "q")?, n.pin(add, "a")?)?;
    n.connect(n.pin(add, "sum")?, n.pin(reg, "d")?)?;
    let probe = n.add_display("count_probe")?;
    n.connect(n.pin(reg, "q")?, n.pin(probe, "in")?)?;

    let mut sim = Simulator::new();
    sim.init_sim(&mut n)?;

    // Edges land at 50, 150, ... so this covers exactly `edges` of them
    let horizon = half_period * 2 * edges + 20;
    sim.run_until(&mut n, horizon);

    println!("Counter history:");
    for record in n.display(probe)?.records() {
        println!("  t={:>5}  count = {}", record.time, record.value.as_u64_lossy());
    }
    println!();

    let q = n.pin(reg, "q")?;
    println!("Final count: {}", n.pin_value(q).as_u64_lossy());
    println!();

    println!("Run counters:");
    println!("{}", serde_json::to_string_pretty(&sim.export_stats())?);
    Ok(())
}
