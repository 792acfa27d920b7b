//! Constellation routing simulator CLI.
//!
//! Usage:
//!   constellation-sim --config scenarios/starlink_72x22.json \
//!                     --algorithm domain-heuristic --kp 4 --kn 2

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use constellation_sim::{SimConfig, Simulation};
use grid_routing::{DomainGrid, RoutePlanner};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "constellation-sim",
    about = "Offline routing simulator for a +Grid LEO constellation"
)]
struct Args {
    /// Path to the run configuration JSON
    #[arg(short, long)]
    config: PathBuf,

    /// Routing algorithm to drive
    #[arg(short, long, value_enum, default_value_t = Algorithm::DomainHeuristic)]
    algorithm: Algorithm,

    /// Orbit-plane split of the domain decomposition
    #[arg(long, default_value_t = 2)]
    kp: usize,

    /// In-plane split of the domain decomposition
    #[arg(long, default_value_t = 2)]
    kn: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Min-hop BFS without link-state knowledge
    MinHop,
    /// Min-hop BFS over the predicted failure window
    MinHopPred,
    /// Delay-weighted Dijkstra over current failures
    DijkstraProbe,
    /// Delay-weighted Dijkstra over the predicted failure window
    DijkstraPred,
    /// Intra-domain tables with guided cross-domain search
    DomainHeuristic,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = SimConfig::from_file(&args.config)?;
    let grid = config.grid()?;

    let planner = match args.algorithm {
        Algorithm::MinHop => RoutePlanner::MinHop,
        Algorithm::MinHopPred => RoutePlanner::MinHopPredictive,
        Algorithm::DijkstraProbe => RoutePlanner::DijkstraProbe,
        Algorithm::DijkstraPred => RoutePlanner::DijkstraPredictive,
        Algorithm::DomainHeuristic => {
            RoutePlanner::DomainRestricted(DomainGrid::new(grid, args.kp, args.kn)?)
        }
    };

    info!("scenario: {}", config.name);
    info!("algorithm: {}", planner.name());
    info!(
        "grid: {} planes x {} satellites, phasing {}",
        grid.planes(),
        grid.per_plane(),
        grid.phasing()
    );

    let mut simulation = Simulation::new(config, planner)?;
    simulation.run()?;

    Ok(())
}
