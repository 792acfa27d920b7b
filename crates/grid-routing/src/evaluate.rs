//! End-to-end path evaluation.
//!
//! Two evaluation modes share one outcome type: a flat walk that
//! follows full-grid route tables hop by hop, and the two-level
//! evaluator for domain-restricted tables, which walks inside a cell
//! and runs a guided depth-first search across cells through border
//! nodes. Per-query failures are values, never panics.

use std::cmp::Reverse;

use tracing::warn;

use crate::border::BorderIndex;
use crate::compute::NO_ROUTE;
use crate::domain::DomainGrid;
use crate::geometry::DelayModel;
use crate::state::LinkBans;
use crate::topology::{Direction, GridConfig};
use crate::NodeId;

/// Cap on cumulative search entries per query.
pub const DEFAULT_MAX_SEARCH_DEPTH: u32 = 10_000;

/// Outcome of one end-to-end query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathResult {
    pub latency_ms: f64,
    pub success: bool,
}

impl PathResult {
    /// The value every structural dead end maps to.
    pub const UNREACHABLE: PathResult = PathResult {
        latency_ms: -1.0,
        success: false,
    };

    pub fn reached(latency_ms: f64) -> PathResult {
        PathResult {
            latency_ms,
            success: true,
        }
    }
}

/// Walk `tables` from `src` to `dst` across the whole grid, summing
/// per-hop delay. Fails on a missing route, a banned port, an undefined
/// step, or a routing loop.
pub fn follow_route_tables(
    grid: &GridConfig,
    delay: &DelayModel,
    positions: &[[f64; 3]],
    bans: &LinkBans,
    tables: &[Vec<u8>],
    src: NodeId,
    dst: NodeId,
) -> PathResult {
    let mut visited = vec![false; grid.node_count()];
    let mut cost = 0.0;
    let mut cur = src;

    while cur != dst {
        if visited[cur] {
            return PathResult::UNREACHABLE;
        }
        visited[cur] = true;

        let Some(dir) = Direction::from_code(tables[cur][dst]) else {
            return PathResult::UNREACHABLE;
        };
        if bans.is_banned(cur, dir) {
            return PathResult::UNREACHABLE;
        }
        let Some(next) = grid.step(cur, dir) else {
            return PathResult::UNREACHABLE;
        };
        cost += delay.link_delay_ms(&positions[cur], &positions[next]);
        cur = next;
    }

    PathResult::reached(cost)
}

/// Two-level evaluator for domain-restricted route tables.
///
/// Borrows the epoch's inputs and all N route rows; holds no mutable
/// state, so one instance can serve any number of queries and every
/// query starts with a clean visited set.
pub struct PathEvaluator<'a> {
    grid: &'a GridConfig,
    domains: &'a DomainGrid,
    delay: &'a DelayModel,
    positions: &'a [[f64; 3]],
    bans: &'a LinkBans,
    tables: &'a [Vec<u8>],
    border: &'a BorderIndex,
    max_depth: u32,
}

impl<'a> PathEvaluator<'a> {
    pub fn new(
        domains: &'a DomainGrid,
        delay: &'a DelayModel,
        positions: &'a [[f64; 3]],
        bans: &'a LinkBans,
        tables: &'a [Vec<u8>],
        border: &'a BorderIndex,
    ) -> Self {
        Self {
            grid: domains.grid(),
            domains,
            delay,
            positions,
            bans,
            tables,
            border,
            max_depth: DEFAULT_MAX_SEARCH_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// End-to-end latency from `src` to `dst` under the current bans.
    pub fn evaluate(&self, src: NodeId, dst: NodeId) -> PathResult {
        if self.domains.cell_of(src) == self.domains.cell_of(dst) {
            return self.walk_within(src, dst);
        }
        let mut visited_cells = vec![false; self.domains.cell_count()];
        let mut depth = 0;
        self.search(src, dst, None, &mut visited_cells, 0.0, &mut depth)
    }

    /// Follow the intra-cell route table from `a` to `b`. The walk must
    /// stay inside `a`'s cell; leaving it means the table is stale.
    fn walk_within(&self, a: NodeId, b: NodeId) -> PathResult {
        let cell = self.domains.cell_of(a);
        let mut cost = 0.0;
        let mut cur = a;
        let mut steps: usize = 0;

        while cur != b {
            steps += 1;
            if steps * self.domains.kp() * self.domains.kn() > 2 * self.grid.node_count() {
                warn!(src = a, dst = b, "intra-cell walk exceeded its step budget");
                return PathResult::UNREACHABLE;
            }

            let Some(dir) = Direction::from_code(self.tables[cur][b]) else {
                return PathResult::UNREACHABLE;
            };
            if self.bans.is_banned(cur, dir) {
                return PathResult::UNREACHABLE;
            }
            let Some(next) = self.grid.step(cur, dir) else {
                return PathResult::UNREACHABLE;
            };
            if self.domains.cell_of(next) != cell {
                return PathResult::UNREACHABLE;
            }
            cost += self
                .delay
                .link_delay_ms(&self.positions[cur], &self.positions[next]);
            cur = next;
        }

        PathResult::reached(cost)
    }

    fn search(
        &self,
        cur: NodeId,
        dst: NodeId,
        prev_dir: Option<Direction>,
        visited_cells: &mut [bool],
        cost: f64,
        depth: &mut u32,
    ) -> PathResult {
        let cell = self.domains.cell_of(cur);
        if visited_cells[cell] {
            return PathResult::UNREACHABLE;
        }
        *depth += 1;
        if *depth > self.max_depth {
            return PathResult::UNREACHABLE;
        }
        if cur == dst {
            return PathResult::reached(cost);
        }
        visited_cells[cell] = true;

        let dst_cell = self.domains.cell_of(dst);
        if cell == dst_cell {
            let tail = self.walk_within(cur, dst);
            if tail.success {
                return PathResult::reached(cost + tail.latency_ms);
            }
            visited_cells[cell] = false;
            return PathResult::UNREACHABLE;
        }

        // Rank candidate exit directions by how close the neighboring
        // cell sits to the destination cell on the torus. The cell a
        // direction leads to is read off the first border node.
        let mut candidates: Vec<(Direction, i64)> = Vec::with_capacity(4);
        for dir in Direction::ALL {
            if prev_dir.is_some_and(|prev| dir == prev.inverse()) {
                continue;
            }
            let Some(&probe) = self.border.nodes(cell, dir).first() else {
                continue;
            };
            let Some(entry) = self.grid.step(probe, dir) else {
                continue;
            };
            let next_cell = self.domains.cell_of(entry);
            if visited_cells[next_cell] {
                continue;
            }
            candidates.push((dir, self.domains.cell_score(next_cell, dst_cell)));
        }
        candidates.sort_by_key(|&(dir, score)| (Reverse(score), dir.code()));

        for (dir, _) in candidates {
            // The current node may itself sit on the border and leave
            // the cell without an intra-cell leg first.
            if self.border.contains(cell, dir, cur) && !self.bans.is_banned(cur, dir) {
                if let Some(entry) = self.grid.step(cur, dir) {
                    if !visited_cells[self.domains.cell_of(entry)] {
                        let hop = self
                            .delay
                            .link_delay_ms(&self.positions[cur], &self.positions[entry]);
                        let found =
                            self.search(entry, dst, Some(dir), visited_cells, cost + hop, depth);
                        if found.success {
                            return found;
                        }
                    }
                }
            }

            // Otherwise cross through the cell's border nodes, closest
            // to the destination first.
            let mut exits: Vec<NodeId> = self
                .border
                .nodes(cell, dir)
                .iter()
                .copied()
                .filter(|&node| node != cur)
                .collect();
            exits.sort_by_key(|&node| Reverse(self.domains.node_score(node, dst)));

            for exit in exits {
                if self.tables[cur][exit] == NO_ROUTE || self.bans.is_banned(exit, dir) {
                    continue;
                }
                let leg = self.walk_within(cur, exit);
                if !leg.success {
                    continue;
                }
                let Some(entry) = self.grid.step(exit, dir) else {
                    continue;
                };
                let hop = self
                    .delay
                    .link_delay_ms(&self.positions[exit], &self.positions[entry]);
                let found = self.search(
                    entry,
                    dst,
                    Some(dir),
                    visited_cells,
                    cost + leg.latency_ms + hop,
                    depth,
                );
                if found.success {
                    return found;
                }
            }
        }

        visited_cells[cell] = false;
        PathResult::UNREACHABLE
    }
}
