//! Constellation Sim - offline routing simulator driver
//!
//! Drives the `grid-routing` algorithms over a recorded scenario: per
//! epoch it loads ISL failure states and satellite geometry from files,
//! recomputes every node's route table in parallel, evaluates the
//! configured observer pairs, and aggregates latency and reachability
//! into periodic reports.

use std::path::PathBuf;

use thiserror::Error;

pub mod config;
pub mod loader;
pub mod metrics;
pub mod observers;
pub mod report;
pub mod simulation;

/// Driver errors
#[derive(Error, Debug)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed record in {path}: {detail}")]
    MalformedRecord { path: PathBuf, detail: String },
    #[error("observer file {path}: {source}")]
    ObserverFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("observer pair ({src}, {dst}) out of range for {node_count} nodes")]
    ObserverOutOfRange {
        src: usize,
        dst: usize,
        node_count: usize,
    },
    #[error(transparent)]
    Routing(#[from] grid_routing::RoutingError),
}

pub type Result<T> = std::result::Result<T, SimError>;

pub use config::SimConfig;
pub use observers::Observer;
pub use simulation::Simulation;
