//! Shared per-epoch inputs: link bans and satellite geometry.

use crate::topology::{Direction, GridConfig};
use crate::{NodeId, Result, RoutingError};

/// Per-node ISL ban flags for one epoch.
///
/// Each row has five slots so the direction wire codes 1..=4 address it
/// directly; slot 0 is unused. Bans are symmetric: flagging a link sets
/// the port on both endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBans {
    rows: Vec<[bool; 5]>,
}

impl LinkBans {
    pub fn new(node_count: usize) -> Self {
        Self {
            rows: vec![[false; 5]; node_count],
        }
    }

    pub fn node_count(&self) -> usize {
        self.rows.len()
    }

    /// Reset every port to usable.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            *row = [false; 5];
        }
    }

    pub fn ban(&mut self, node: NodeId, dir: Direction) {
        self.rows[node][dir.code() as usize] = true;
    }

    pub fn is_banned(&self, node: NodeId, dir: Direction) -> bool {
        self.rows[node][dir.code() as usize]
    }

    /// Number of banned ports on `node`.
    pub fn banned_ports(&self, node: NodeId) -> usize {
        Direction::ALL
            .into_iter()
            .filter(|&dir| self.is_banned(node, dir))
            .count()
    }

    /// Flag an undirected ISL given its endpoints, setting the port on
    /// both sides. Fails when the pair is not adjacent in the grid,
    /// which callers treat as a topology-consistency error.
    pub fn ban_link(&mut self, grid: &GridConfig, u: NodeId, v: NodeId) -> Result<()> {
        let (u_port, v_port) = grid
            .port_between(u, v)
            .ok_or(RoutingError::NoLinkBetween(u, v))?;
        self.ban(u, u_port);
        self.ban(v, v_port);
        Ok(())
    }
}

/// Inputs for one simulation epoch.
///
/// `current_bans` reflects the epoch under evaluation; `predicted_bans`
/// is the union of failures over the upcoming update window and feeds
/// the predictive planners. The driver rebuilds the state between
/// epochs; compute and evaluation only ever borrow it immutably.
#[derive(Debug, Clone)]
pub struct EpochState {
    pub current_bans: LinkBans,
    pub predicted_bans: LinkBans,
    /// ECI positions in km, indexed by node id.
    pub positions: Vec<[f64; 3]>,
    /// Latitude (deg), longitude (deg), altitude (km).
    pub geodetic: Vec<[f64; 3]>,
    /// Signed along-track direction indicator.
    pub velocity: Vec<f64>,
}

impl EpochState {
    pub fn new(node_count: usize) -> Self {
        Self {
            current_bans: LinkBans::new(node_count),
            predicted_bans: LinkBans::new(node_count),
            positions: vec![[0.0; 3]; node_count],
            geodetic: vec![[0.0; 3]; node_count],
            velocity: vec![0.0; node_count],
        }
    }
}
