//! warehouse — runnable ASRS simulation wiring every asrs crate together.
//!
//! Stands up a zoned aisle layout on the default 25×30×6 floor, runs a
//! random store/retrieve workload against a small fleet, then prints the
//! run's statistics and exports the operations log.
//!
//! State persists under `output/warehouse`; running again resumes from it.
//!
//! ```text
//! cargo run -p warehouse [-- config.json]
//! RUST_LOG=asrs_scheduler=debug cargo run -p warehouse
//! cargo run -p warehouse --features sqlite
//! ```

mod workload;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use asrs_core::{AsrsConfig, Tick, VehicleId};
use asrs_fleet::VehicleStatus;
use asrs_grid::AStarPlanner;
use asrs_registry::{RackLayout, SlottingPolicy};
use asrs_scheduler::SchedulerBuilder;
use asrs_store::PersistenceGateway;

use workload::{Tally, Workload};

// ── Constants ─────────────────────────────────────────────────────────────────

const OUTPUT_DIR:    &str = "output/warehouse";
const VEHICLE_COUNT: i32  = 6;
const AISLE_COUNT:   u32  = 4;
const RACK_CAPACITY: u32  = 4;
const REQUEST_RATE:  f64  = 0.4;  // chance of a new request each tick
const STORE_SHARE:   f64  = 0.6;  // share of requests that are stores
const STALL_AFTER:   u64  = 100;  // jam vehicle 0 this many ticks in
const STALL_TICKS:   u64  = 15;
const DRAIN_TICKS:   u64  = 500;

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?
        }
        None => AsrsConfig::default(),
    };

    std::fs::create_dir_all(OUTPUT_DIR)?;
    #[cfg(feature = "sqlite")]
    let gateway = asrs_store::SqliteGateway::open(Path::new(OUTPUT_DIR))?;
    #[cfg(not(feature = "sqlite"))]
    let gateway = asrs_store::JsonlGateway::open(Path::new(OUTPUT_DIR))?;

    run(config, gateway)
}

fn run<G: PersistenceGateway>(config: AsrsConfig, gateway: G) -> Result<()> {
    let grid = &config.grid;
    println!("=== warehouse — asrs engine ===");
    println!(
        "Floor: {}×{}×{}  |  Dock: {}  |  Vehicles: {VEHICLE_COUNT}  |  Seed: {}",
        grid.extents.width, grid.extents.depth, grid.extents.levels, grid.dock, config.run.seed
    );

    // 1. Layout: aisle rows plus a cross aisle down the dock column, racks
    //    sized by zone.
    let zones = SlottingPolicy::standard_zones();
    let layout = RackLayout::zoned_aisles(grid.extents, grid.dock, AISLE_COUNT, RACK_CAPACITY, &zones);

    // 2. Fleet parked along the cross aisle, starting at the dock.
    let vehicles = (0..VEHICLE_COUNT).map(|i| grid.dock.offset(0, -i, 0)).collect();

    // 3. Build, or resume from whatever is already under OUTPUT_DIR.
    let planner = AStarPlanner::from_config(grid);
    let mut scheduler = SchedulerBuilder::new(config.clone(), planner, gateway)
        .layout(layout)
        .policy(SlottingPolicy::Zoned(zones))
        .vehicles(vehicles)
        .recover(Vec::new())?;
    let registry = scheduler.registry();
    println!(
        "Racks: {}  |  Capacity: {}  |  Stored: {}  |  Starting at {}",
        registry.rack_count(),
        registry.total_capacity(),
        registry.stored_count(),
        scheduler.now()
    );
    println!();

    // 4. Workload.
    let start = scheduler.now();
    let end = start + config.run.total_ticks;
    let mut tally = Tally::new(Workload::new(config.run.seed, scheduler.registry(), STORE_SHARE));

    let t0 = Instant::now();
    while scheduler.now() < end {
        if scheduler.now() == start + STALL_AFTER {
            scheduler.stall_vehicle(VehicleId(0), STALL_TICKS)?;
        }
        if tally.workload.arrives(REQUEST_RATE) {
            let request = tally.workload.next_request();
            let job = scheduler.submit_job(request.clone());
            tally.workload.submitted(job, &request);
        }
        scheduler.run_ticks(1, &mut tally)?;
    }
    let drained = scheduler.run_until_idle(DRAIN_TICKS, &mut tally)?;
    let elapsed = t0.elapsed();
    info!(ticks = config.run.total_ticks, drained, "workload finished");

    // 5. Put blocked vehicles back in service so the next run has them.
    let blocked: Vec<VehicleId> = scheduler
        .fleet()
        .vehicles
        .iter()
        .filter(|v| v.status == VehicleStatus::Blocked)
        .map(|v| v.id)
        .collect();
    for v in blocked {
        scheduler.clear_blocked(v)?;
    }

    // 6. Persist and export.
    match scheduler.checkpoint() {
        Ok(seq) => info!(seq, "final checkpoint"),
        Err(e) => warn!(error = %e, "final checkpoint skipped"),
    }
    let ops_path = Path::new(OUTPUT_DIR).join("operations.csv");
    let rows = scheduler.export_operations(&ops_path)?;
    scheduler.finish()?;

    // 7. Summary.
    let stats = scheduler.stats();
    println!(
        "Simulation complete in {:.3} s ({} ticks + {drained} to drain)",
        elapsed.as_secs_f64(),
        config.run.total_ticks
    );
    println!("  transitions observed : {}", tally.transitions);
    println!("  submitted            : {}", stats.submitted);
    println!(
        "  completed            : {} ({} stores, {} retrieves)",
        stats.completed, stats.stores_completed, stats.retrieves_completed
    );
    println!("  failed               : {}", stats.failed);
    for (kind, n) in &stats.failures {
        println!("    {:<20} {n}", kind.as_str());
    }
    println!("  cancelled            : {}", stats.cancelled);
    println!("  average path         : {:.1} cells", stats.average_path_len());
    let window_start = Tick(end.0.saturating_sub(100)).max(start);
    println!(
        "  last {} ticks       : {} completed",
        end - window_start,
        stats.completed_between(window_start, end)
    );
    println!(
        "  utilization          : {:.1}% ({} boxes on shelves)",
        scheduler.registry().utilization() * 100.0,
        tally.workload.on_shelf()
    );
    println!("  {}  : {rows} rows", ops_path.display());

    Ok(())
}
