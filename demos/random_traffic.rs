use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lsim::{Netlist, Signal, Simulator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    println!("🚌 Random Bus Traffic Demo");
    println!();

    let seed = 42;
    let rounds = 50;
    let drivers = 3usize;
    println!("Configuration:");
    println!("  Drivers on the bus: {}", drivers);
    println!("  Rounds: {}", rounds);
    println!("  Seed: {}", seed);
    println!();

    // Three tri-state drivers share one 8-bit bus. Every round enables
    // a random driver with random data; sometimes a second driver is
    // enabled on purpose to provoke a conflict.
    let mut n = Netlist::new();
    let mut data = Vec::new();
    let mut enables = Vec::new();
    let mut bus_pin = None;
    for i in 0..drivers {
        let d = n.add_constant(&format!("data{}", i), Signal::zero(8))?;
        let e = n.add_constant(&format!("en{}", i), Signal::zero(1))?;
        let buf = n.add_tristate(&format!("drv{}", i), 8, 10)?;
        n.connect(n.pin(d, "out")?, n.pin(buf, "data")?)?;
        n.connect(n.pin(e, "out")?, n.pin(buf, "en")?)?;
        let out = n.pin(buf, "out")?;
        if let Some(bus) = bus_pin {
            n.connect(bus, out)?;
        } else {
            bus_pin = Some(out);
        }
        data.push(d);
        enables.push(e);
    }
    let bus = bus_pin.ok_or("no drivers built")?;
    let ep = n.add_endpoint("bus")?;
    let ep_pin = n.pin(ep, "pin")?;
    n.connect(bus, ep_pin)?;

    let mut sim = Simulator::new();
    sim.init_sim(&mut n)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut t = 0;
    let mut observed_conflict_rounds = 0;
    for round in 0..rounds {
        let owner = rng.gen_range(0..drivers);
        let value: u64 = rng.gen_range(0..256);
        let contended = rng.gen_bool(0.2);
        sim.set_constant(&mut n, data[owner], Signal::from_u64(8, value))?;
        for (i, &en) in enables.iter().enumerate() {
            let on = i == owner || (contended && i == (owner + 1) % drivers);
            sim.set_constant(&mut n, en, Signal::from_bool(on))?;
        }
        t += 40;
        sim.run_until(&mut n, t);

        if contended {
            observed_conflict_rounds += 1;
        }
        if round % 10 == 0 {
            println!(
                "  round {:>2}: driver {} sends {:#04x}, bus = {}{}",
                round,
                owner,
                value,
                n.pin_value(bus),
                if contended { "  (contended)" } else { "" }
            );
        }
    }
    println!();

    println!("Rounds with a second driver enabled: {}", observed_conflict_rounds);
    println!("Drive conflicts flagged: {}", sim.stats().drive_conflicts);
    println!();

    println!("Run counters:");
    println!("{}", serde_json::to_string_pretty(&sim.export_stats())?);
    Ok(())
}
