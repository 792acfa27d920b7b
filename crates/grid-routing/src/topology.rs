//! Topology algebra for the +Grid torus.
//!
//! Satellites are addressed by a flat id; its grid coordinates are
//! `(plane, slot) = (id / per_plane, id % per_plane)`. Vertical moves stay
//! inside an orbit plane; horizontal moves cross planes, and the seam
//! between the last plane and plane zero applies the Walker phasing skew
//! to the slot index.

use serde::{Deserialize, Serialize};

use crate::{NodeId, Result, RoutingError};

/// One of the four ISL ports of a satellite.
///
/// The wire codes 1..=4 match the route-table encoding, where 0 means
/// "no route" (or self).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// Previous slot in the same orbit plane.
    Up = 1,
    /// Next orbit plane, crossing the seam after the last plane.
    Right = 2,
    /// Next slot in the same orbit plane.
    Down = 3,
    /// Previous orbit plane, crossing the seam before plane zero.
    Left = 4,
}

impl Direction {
    /// All directions in ascending wire-code order. Iterating in this
    /// order is what makes the smaller-direction tie-break reproducible.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// The port a neighbor uses to reach back across the same link.
    pub fn inverse(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// Route-table wire code (1..=4).
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a route-table entry; 0 and anything above 4 is "no route".
    pub fn from_code(code: u8) -> Option<Direction> {
        match code {
            1 => Some(Direction::Up),
            2 => Some(Direction::Right),
            3 => Some(Direction::Down),
            4 => Some(Direction::Left),
            _ => None,
        }
    }

    /// Zero-based index for dense per-direction tables.
    pub fn index(self) -> usize {
        self as usize - 1
    }
}

/// Dimensions of the +Grid: `planes` orbit planes of `per_plane`
/// satellites each, with `phasing` slots of skew across the plane seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    planes: usize,
    per_plane: usize,
    phasing: usize,
}

impl GridConfig {
    pub fn new(planes: usize, per_plane: usize, phasing: usize) -> Result<Self> {
        if planes == 0 || per_plane == 0 {
            return Err(RoutingError::InvalidGrid(format!(
                "grid must have positive dimensions, got {planes} planes x {per_plane} slots"
            )));
        }
        Ok(Self {
            planes,
            per_plane,
            // The skew only matters modulo the plane length.
            phasing: phasing % per_plane,
        })
    }

    pub fn planes(&self) -> usize {
        self.planes
    }

    pub fn per_plane(&self) -> usize {
        self.per_plane
    }

    pub fn phasing(&self) -> usize {
        self.phasing
    }

    pub fn node_count(&self) -> usize {
        self.planes * self.per_plane
    }

    pub fn plane(&self, id: NodeId) -> usize {
        id / self.per_plane
    }

    pub fn slot(&self, id: NodeId) -> usize {
        id % self.per_plane
    }

    pub fn node_at(&self, plane: usize, slot: usize) -> NodeId {
        plane * self.per_plane + slot
    }

    /// Neighbor of `id` through port `dir`, or `None` when the move is
    /// undefined. Never aliases a valid id for an undefined move.
    pub fn step(&self, id: NodeId, dir: Direction) -> Option<NodeId> {
        if id >= self.node_count() {
            return None;
        }
        let mut plane = self.plane(id);
        let mut slot = self.slot(id);
        match dir {
            Direction::Up => slot = (slot + self.per_plane - 1) % self.per_plane,
            Direction::Down => slot = (slot + 1) % self.per_plane,
            Direction::Right => {
                if plane + 1 == self.planes {
                    plane = 0;
                    slot = (slot + self.phasing) % self.per_plane;
                } else {
                    plane += 1;
                }
            }
            Direction::Left => {
                if plane == 0 {
                    plane = self.planes - 1;
                    slot = (slot + self.per_plane - self.phasing) % self.per_plane;
                } else {
                    plane -= 1;
                }
            }
        }
        let next = self.node_at(plane, slot);
        (next < self.node_count()).then_some(next)
    }

    /// Resolve an undirected ISL endpoint pair to its two ports: the
    /// `(u_port, v_port)` with `step(u, u_port) == v` and
    /// `step(v, v_port) == u`. `None` means the pair is not adjacent in
    /// this grid, which input loaders treat as a topology inconsistency.
    pub fn port_between(&self, u: NodeId, v: NodeId) -> Option<(Direction, Direction)> {
        let u_port = Direction::ALL
            .into_iter()
            .find(|&dir| self.step(u, dir) == Some(v))?;
        let v_port = Direction::ALL
            .into_iter()
            .find(|&dir| self.step(v, dir) == Some(u))?;
        Some((u_port, v_port))
    }
}
