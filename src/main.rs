//! dmasim: console front-end for the DMA bus-arbitration simulator.
//!
//! Thin consumer of the library API: picks a scenario from the command
//! line, drives the core operations, and prints the returned values.

use dmasim::bus::{BusArbiter, BusPriority};
use dmasim::config::Config;
use dmasim::dma::DmaController;
use dmasim::workload;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let scenario = args.get(1).map(String::as_str).unwrap_or("all");

    let config = Config::get();

    match scenario {
        "transfer" => run_transfer(config)?,
        "arbitration" => run_arbitration(config),
        "distribution" => run_distribution(config),
        "all" => {
            run_transfer(config)?;
            println!();
            run_arbitration(config);
            println!();
            run_distribution(config);
        }
        other => {
            eprintln!("Unknown scenario: {}", other);
            eprintln!("Usage: dmasim [transfer | arbitration | distribution | all]");
            std::process::exit(2);
        }
    }

    Ok(())
}

/// One full transfer: claim the bus, run the channel, release the bus.
fn run_transfer(config: &Config) -> anyhow::Result<()> {
    println!("=== DMA transfer ===");

    let mut dma = DmaController::new(config.num_channels());
    let arbiter = BusArbiter::new(config.bus_capacity());
    println!("channels: {}, bus slots: {}", dma.num_channels(), arbiter.capacity());

    let decision = arbiter.request(0, BusPriority::High, 1024);
    println!("bus request for channel 0: {:?}", decision);

    if decision.is_granted() {
        dma.configure(0, 0x1000, 0x2000, 1024, 0)?;
        dma.start(0)?;
        dma.complete(0)?;
        arbiter.release(0)?;

        let stats = dma.stats();
        println!(
            "completed {} transfer(s), {} bytes, ~{} cycles saved",
            stats.transfers_completed, stats.bytes_transferred, stats.cycles_saved
        );
    }

    Ok(())
}

/// Deterministic arbitration workload over a fresh arbiter.
fn run_arbitration(config: &Config) {
    println!("=== Bus arbitration workload ===");

    let arbiter = BusArbiter::new(config.bus_capacity());
    let report = workload::run_arbitration_workload(&arbiter, 20);

    println!("total requests:   {}", report.status.total_requests);
    println!("granted requests: {}", report.status.granted_requests);
    println!("success rate:     {:.1}%", report.status.success_rate * 100.0);
    println!("utilization:      {:.1}%", report.status.utilization * 100.0);
    println!("throughput:       {:.0} requests/s", report.requests_per_second);
}

/// Pending-queue census with a saturated bus.
fn run_distribution(config: &Config) {
    println!("=== Pending priority distribution ===");

    let arbiter = BusArbiter::new(config.bus_capacity());

    // Saturate the slots, then stack up waiters at every level
    for slot in 0..arbiter.capacity() {
        arbiter.request(slot as u32, BusPriority::Critical, 1024);
    }
    let waiters = [
        BusPriority::Low,
        BusPriority::Low,
        BusPriority::Medium,
        BusPriority::High,
    ];
    for (i, &priority) in waiters.iter().enumerate() {
        arbiter.request(100 + i as u32, priority, 256);
    }

    for (priority, count) in arbiter.priority_distribution().iter() {
        println!("{:>8}: {}", priority.to_string(), count);
    }
}
