//! Rectangular decomposition of the +Grid into routing domains.
//!
//! A `kp x kn` decomposition splits the torus into super-cells of
//! `(planes / kp) x (per_plane / kn)` satellites. The hierarchical
//! planner computes route tables only inside a cell and relies on the
//! toroidal heuristics below to guide cross-cell search at query time.

use serde::{Deserialize, Serialize};

use crate::topology::GridConfig;
use crate::{NodeId, Result, RoutingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainGrid {
    grid: GridConfig,
    kp: usize,
    kn: usize,
    planes_per_cell: usize,
    slots_per_cell: usize,
}

impl DomainGrid {
    /// Both split factors must divide the grid exactly; anything else is
    /// a fatal configuration error.
    pub fn new(grid: GridConfig, kp: usize, kn: usize) -> Result<Self> {
        if kp == 0 || kn == 0 {
            return Err(RoutingError::InvalidDecomposition(format!(
                "split factors must be positive, got {kp} x {kn}"
            )));
        }
        if grid.planes() % kp != 0 {
            return Err(RoutingError::InvalidDecomposition(format!(
                "{} planes not divisible by {kp}",
                grid.planes()
            )));
        }
        if grid.per_plane() % kn != 0 {
            return Err(RoutingError::InvalidDecomposition(format!(
                "{} slots per plane not divisible by {kn}",
                grid.per_plane()
            )));
        }
        Ok(Self {
            grid,
            kp,
            kn,
            planes_per_cell: grid.planes() / kp,
            slots_per_cell: grid.per_plane() / kn,
        })
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn kp(&self) -> usize {
        self.kp
    }

    pub fn kn(&self) -> usize {
        self.kn
    }

    pub fn cell_count(&self) -> usize {
        self.kp * self.kn
    }

    /// Domain coordinates `(I, J)` of a satellite.
    pub fn coords(&self, id: NodeId) -> (usize, usize) {
        (
            self.grid.plane(id) / self.planes_per_cell,
            self.grid.slot(id) / self.slots_per_cell,
        )
    }

    /// Flat cell id `I * kn + J`.
    pub fn cell_of(&self, id: NodeId) -> usize {
        let (i, j) = self.coords(id);
        i * self.kn + j
    }

    pub fn cell_coords(&self, cell: usize) -> (usize, usize) {
        (cell / self.kn, cell % self.kn)
    }

    /// Guidance score between two cells: the negated toroidal taxicab
    /// distance over domain coordinates, slot axis weighted 4x. Zero on
    /// identical cells, more negative the further apart; larger is
    /// better when ranking search directions.
    pub fn cell_score(&self, a: usize, b: usize) -> i64 {
        let (ia, ja) = self.cell_coords(a);
        let (ib, jb) = self.cell_coords(b);
        -((4 * ring_distance(ja, jb, self.kn) + ring_distance(ia, ib, self.kp)) as i64)
    }

    /// Same score over full grid coordinates, used to rank the border
    /// nodes of a cell against the final destination.
    pub fn node_score(&self, a: NodeId, b: NodeId) -> i64 {
        let grid = &self.grid;
        let vertical = ring_distance(grid.slot(a), grid.slot(b), grid.per_plane());
        let horizontal = ring_distance(grid.plane(a), grid.plane(b), grid.planes());
        -((4 * vertical + horizontal) as i64)
    }
}

/// Shorter way around a ring of `len` positions.
fn ring_distance(a: usize, b: usize, len: usize) -> usize {
    let forward = (a + len - b) % len;
    let backward = (b + len - a) % len;
    forward.min(backward)
}
