//! Border-node index over a domain decomposition.

use crate::domain::DomainGrid;
use crate::topology::{Direction, GridConfig};
use crate::NodeId;

/// For every cell and direction, the nodes whose step in that direction
/// leaves the cell. Built once per `(kp, kn)` decomposition and shared
/// read-only by every evaluator call afterwards.
#[derive(Debug, Clone)]
pub struct BorderIndex {
    cells: Vec<[Vec<NodeId>; 4]>,
}

impl BorderIndex {
    pub fn build(grid: &GridConfig, domains: &DomainGrid) -> Self {
        let mut cells: Vec<[Vec<NodeId>; 4]> = (0..domains.cell_count())
            .map(|_| std::array::from_fn(|_| Vec::new()))
            .collect();

        for node in 0..grid.node_count() {
            let home = domains.cell_of(node);
            for dir in Direction::ALL {
                if let Some(neighbor) = grid.step(node, dir) {
                    if domains.cell_of(neighbor) != home {
                        cells[home][dir.index()].push(node);
                    }
                }
            }
        }

        Self { cells }
    }

    /// Border nodes of `cell` in `dir`, in ascending node order.
    pub fn nodes(&self, cell: usize, dir: Direction) -> &[NodeId] {
        &self.cells[cell][dir.index()]
    }

    pub fn contains(&self, cell: usize, dir: Direction, node: NodeId) -> bool {
        self.nodes(cell, dir).binary_search(&node).is_ok()
    }
}
