//! Grid Routing - +Grid constellation mesh algorithms
//!
//! Routing primitives for a Walker-Delta LEO constellation arranged as a
//! +Grid torus:
//!
//! - Topology algebra (wrap/skew neighbor moves, port resolution)
//! - Per-node route computers (min-hop BFS, delay Dijkstra, domain BFS)
//! - Border-node index over a rectangular domain decomposition
//! - End-to-end path evaluation (flat walk + two-level domain search)

use thiserror::Error;

pub mod border;
pub mod compute;
pub mod domain;
pub mod evaluate;
pub mod geometry;
pub mod state;
pub mod topology;

/// Flat satellite id in `[0, planes * per_plane)`.
pub type NodeId = usize;

/// Routing errors
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("invalid domain decomposition: {0}")]
    InvalidDecomposition(String),
    #[error("no inter-satellite link between nodes {0} and {1}")]
    NoLinkBetween(NodeId, NodeId),
}

pub type Result<T> = std::result::Result<T, RoutingError>;

pub use border::BorderIndex;
pub use compute::{ComputeScratch, RoutePlanner, NO_ROUTE};
pub use domain::DomainGrid;
pub use evaluate::{follow_route_tables, PathEvaluator, PathResult, DEFAULT_MAX_SEARCH_DEPTH};
pub use geometry::{euclidean_km, DelayModel};
pub use state::{EpochState, LinkBans};
pub use topology::{Direction, GridConfig};
