use lsim::{MemoryKind, Netlist, Signal, Simulator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    println!("💾 Memory Demo");
    println!();

    let access = 100;
    println!("Configuration:");
    println!("  RAM: 16 words x 8 bits, {} tick access", access);
    println!("  ROM: 8 words x 8 bits, loaded from a text image");
    println!();

    let mut n = Netlist::new();
    let addr = n.add_constant("addr", Signal::zero(4))?;
    let cs = n.add_constant("cs", Signal::zero(1))?;
    let we = n.add_constant("we", Signal::from_bool(true))?;
    let oe = n.add_constant("oe", Signal::from_bool(true))?;
    let din = n.add_constant("din", Signal::zero(8))?;
    let ram = n.add_memory("ram", MemoryKind::Ram, 16, 8, access)?;
    for (c, pin) in [(addr, "addr"), (cs, "cs"), (we, "we"), (oe, "oe"), (din, "din")] {
        let target = n.pin(ram, pin)?;
        n.connect(n.pin(c, "out")?, target)?;
    }
    let dout = n.pin(ram, "dout")?;
    let bus = n.add_endpoint("bus")?;
    let bus_pin = n.pin(bus, "pin")?;
    n.connect(dout, bus_pin)?;

    let mut sim = Simulator::new();
    sim.init_sim(&mut n)?;

    // Write phase: with cs and we low, each new address/data pair
    // issues another store
    println!("Writing four words...");
    let mut t = 0;
    sim.set_constant(&mut n, we, Signal::zero(1))?;
    for (address, value) in [(0u64, 0x10u64), (1, 0x23), (2, 0x5A), (3, 0xFF)] {
        sim.set_constant(&mut n, addr, Signal::from_u64(4, address))?;
        sim.set_constant(&mut n, din, Signal::from_u64(8, value))?;
        t += 10;
        sim.run_until(&mut n, t);
    }
    t += access;
    sim.run_until(&mut n, t);

    println!("Write history:");
    for record in n.memory(ram)?.write_history() {
        println!(
            "  t={:>4}  [{:#03x}] <= {:#04x}",
            record.time, record.addr, record.value
        );
    }
    println!();

    // Read phase: release we, assert oe, walk the addresses
    println!("Reading them back...");
    sim.set_constant(&mut n, we, Signal::from_bool(true))?;
    sim.set_constant(&mut n, oe, Signal::zero(1))?;
    for address in 0..4u64 {
        sim.set_constant(&mut n, addr, Signal::from_u64(4, address))?;
        t += access + 10;
        sim.run_until(&mut n, t);
        println!(
            "  [{:#03x}] -> {:#04x}",
            address,
            n.pin_value(dout).as_u64_lossy()
        );
    }
    println!();

    // A ROM gets its contents from an image instead of bus writes
    let mut rom_net = Netlist::new();
    let rom = rom_net.add_memory("rom", MemoryKind::Rom, 8, 8, access)?;
    if let Some(warning) = rom_net.memory_mut(rom)?.load_image(
        "# boot vector\n\
         C0 FF EE\n\
         4: 01 02 03 04\n",
    ) {
        println!("image rejected: {}", warning);
    }
    println!("ROM contents:");
    let rom_ref = rom_net.memory(rom)?;
    for address in 0..rom_ref.word_count() {
        print!(" {:02X}", rom_ref.word(address).unwrap_or(0));
    }
    println!();
    println!();

    println!("Run counters:");
    println!("{}", serde_json::to_string_pretty(&sim.export_stats())?);
    Ok(())
}
