use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use float_ord::FloatOrd;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use vrp_mip::problem::{Instance, Point, Problem};
use vrp_mip::search::{OutcomeKind, SearchParams};

#[derive(Parser)]
#[clap(author, version, about = "Exact capacitated VRP solver")]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve an instance and write the routes as JSON
    Solve {
        /// Path to the instance file
        path: PathBuf,
        /// Search budget in seconds
        #[clap(long, default_value_t = 10.0)]
        time_limit: f64,
        /// Relative optimality gap at which the search may stop early
        #[clap(long)]
        mip_gap: Option<f64>,
        /// Number of parallel workers for the backend
        #[clap(long, default_value_t = 8)]
        threads: u32,
        /// Where to write the solve report; stdout when omitted
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Generate a random solvable instance
    Generate {
        /// Number of customers
        #[clap(long, default_value_t = 10)]
        customers: usize,
        /// Number of vehicles in the fleet
        #[clap(long, default_value_t = 3)]
        vehicles: usize,
        /// RNG seed; entropy-seeded when omitted
        #[clap(long)]
        seed: Option<u64>,
        /// Where to write the instance; stdout when omitted
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Args::parse().command {
        Command::Solve {
            path,
            time_limit,
            mip_gap,
            threads,
            output,
        } => solve(path, time_limit, mip_gap, threads, output),
        Command::Generate {
            customers,
            vehicles,
            seed,
            output,
        } => generate(customers, vehicles, seed, output),
    }
}

fn solve(
    path: PathBuf,
    time_limit: f64,
    mip_gap: Option<f64>,
    threads: u32,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(&path)?;
    let instance: Instance = serde_json::from_reader(BufReader::new(file))?;
    let problem = Problem::try_from(instance)?;

    let params = SearchParams {
        time_limit,
        mip_gap,
        threads,
    };
    let report = vrp_mip::solve(&problem, &params)?;

    match report.outcome {
        OutcomeKind::Optimal | OutcomeKind::Feasible => {
            let used = report.routes.iter().filter(|r| r.is_used()).count();
            info!(
                "{} of {} vehicles used, total distance {}",
                used,
                report.routes.len(),
                report.total_distance.unwrap_or(0.0)
            );

            if let Some(route) = report.routes.iter().max_by_key(|r| FloatOrd(r.distance)) {
                info!(
                    "Longest route: vehicle {} at distance {}",
                    route.vehicle, route.distance
                );
            }
        }
        OutcomeKind::Infeasible => {
            eprintln!("No feasible routing exists for this instance.");
        }
        OutcomeKind::Unknown => {
            eprintln!("The search budget expired without a conclusion; consider a larger time limit.");
        }
    }

    write_json(&report, output)
}

fn generate(
    customers: usize,
    vehicles: usize,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut locations = vec![Point(0.0, 0.0)];
    locations.extend(
        (0..customers).map(|_| Point(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0))),
    );
    let demands: Vec<u32> = (0..customers).map(|_| rng.gen_range(1..=9)).collect();

    // Size capacities with enough slack that a feasible routing exists.
    let total: u32 = demands.iter().sum();
    let capacity = ((total as f64 * 1.5) / vehicles.max(1) as f64).ceil() as u32;
    let capacity = capacity.max(demands.iter().copied().max().unwrap_or(1));

    let instance = Instance {
        locations,
        demands,
        vehicles: vec![capacity; vehicles],
        distances: None,
        use_all_vehicles: false,
    };

    write_json(&instance, output)
}

fn write_json<T: Serialize>(
    value: &T,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), value)?;
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
            println!();
        }
    }

    Ok(())
}
