use lsim::{Netlist, Signal, Simulator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    println!("➕ Ripple Adder Demo");
    println!();

    let width = 8;
    let delay_per_bit = 30;
    println!("Configuration:");
    println!("  Width: {} bits", width);
    println!("  Delay per bit: {} ticks", delay_per_bit);
    println!();

    let mut n = Netlist::new();
    let a = n.add_constant("a", Signal::from_u64(width, 0x3C))?;
    let b = n.add_constant("b", Signal::from_u64(width, 0xC3))?;
    let cin = n.add_constant("cin", Signal::zero(1))?;
    let add = n.add_adder("add", width, delay_per_bit)?;
    n.connect(n.pin(a, "out")?, n.pin(add, "a")?)?;
    n.connect(n.pin(b, "out")?, n.pin(add, "b")?)?;
    n.connect(n.pin(cin, "out")?, n.pin(add, "cin")?)?;
    let sum = n.pin(add, "sum")?;
    let cout = n.pin(add, "cout")?;
    let sum_ep = n.add_endpoint("sum")?;
    let cout_ep = n.add_endpoint("cout")?;
    let sum_ep_pin = n.pin(sum_ep, "pin")?;
    let cout_ep_pin = n.pin(cout_ep, "pin")?;
    n.connect(sum, sum_ep_pin)?;
    n.connect(cout, cout_ep_pin)?;

    let mut sim = Simulator::new();
    sim.watch(sum);
    sim.watch(cout);
    sim.init_sim(&mut n)?;

    sim.run_to_quiescence(&mut n, Some(10_000));
    println!(
        "0x3C + 0xC3     = {:#04x} carry {}",
        n.pin_value(sum).as_u64_lossy(),
        n.pin_value(cout).as_u64_lossy()
    );

    sim.set_constant(&mut n, cin, Signal::from_bool(true))?;
    sim.run_to_quiescence(&mut n, Some(10_000));
    println!(
        "0x3C + 0xC3 + 1 = {:#04x} carry {}",
        n.pin_value(sum).as_u64_lossy(),
        n.pin_value(cout).as_u64_lossy()
    );
    println!();

    println!("Watched changes:");
    for record in sim.trace() {
        println!(
            "  t={:>4}  {} = {}",
            record.time,
            n.pin_path(record.pin),
            record.value
        );
    }
    println!();

    println!("Run counters:");
    println!("{}", serde_json::to_string_pretty(&sim.export_stats())?);
    Ok(())
}
