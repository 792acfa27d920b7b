//! Per-node route computers.
//!
//! Every variant fills one route-table row: `row[dst]` is the wire code
//! of the first hop out of the owning node toward `dst`, with
//! [`NO_ROUTE`] for self and unreachable destinations. On equal
//! distance the numerically smaller direction wins, which keeps the
//! tables reproducible run over run.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::domain::DomainGrid;
use crate::geometry::DelayModel;
use crate::state::{EpochState, LinkBans};
use crate::topology::{Direction, GridConfig};
use crate::NodeId;

/// Route-table slot meaning "no route" (or self).
pub const NO_ROUTE: u8 = 0;

/// Per-node routing algorithm.
#[derive(Debug, Clone)]
pub enum RoutePlanner {
    /// Min-hop BFS ignoring link state (connectivity baseline).
    MinHop,
    /// Min-hop BFS over the predicted failure window.
    MinHopPredictive,
    /// Delay-weighted Dijkstra over the failures of the current epoch.
    DijkstraProbe,
    /// Delay-weighted Dijkstra over the predicted failure window.
    DijkstraPredictive,
    /// BFS confined to the node's domain cell. Destinations in other
    /// cells stay [`NO_ROUTE`] and are resolved at query time by the
    /// two-level evaluator.
    DomainRestricted(DomainGrid),
}

impl RoutePlanner {
    /// Label used in reports and log lines. The domain variant embeds
    /// its split factors the way the historical runs named them.
    pub fn name(&self) -> String {
        match self {
            RoutePlanner::MinHop => "MinHop".to_string(),
            RoutePlanner::MinHopPredictive => "MinHopPred".to_string(),
            RoutePlanner::DijkstraProbe => "DijkstraProbe".to_string(),
            RoutePlanner::DijkstraPredictive => "DijkstraPred".to_string(),
            RoutePlanner::DomainRestricted(domains) => {
                format!("DomainHeuristic_{}_{}", domains.kp(), domains.kn())
            }
        }
    }

    /// Whether end-to-end queries need the two-level domain evaluator
    /// instead of a flat table walk.
    pub fn is_two_level(&self) -> bool {
        matches!(self, RoutePlanner::DomainRestricted(_))
    }

    pub fn domain_grid(&self) -> Option<&DomainGrid> {
        match self {
            RoutePlanner::DomainRestricted(domains) => Some(domains),
            _ => None,
        }
    }

    /// Fill the route row for `id` against the epoch's inputs.
    pub fn compute_row(
        &self,
        grid: &GridConfig,
        delay: &DelayModel,
        state: &EpochState,
        id: NodeId,
        scratch: &mut ComputeScratch,
    ) -> Vec<u8> {
        match self {
            RoutePlanner::MinHop => min_hop_row(grid, None, id, scratch),
            RoutePlanner::MinHopPredictive => {
                min_hop_row(grid, Some(&state.predicted_bans), id, scratch)
            }
            RoutePlanner::DijkstraProbe => {
                dijkstra_row(grid, delay, &state.positions, &state.current_bans, id, scratch)
            }
            RoutePlanner::DijkstraPredictive => {
                dijkstra_row(grid, delay, &state.positions, &state.predicted_bans, id, scratch)
            }
            RoutePlanner::DomainRestricted(domains) => {
                domain_row(grid, domains, &state.current_bans, id, scratch)
            }
        }
    }
}

/// Reusable buffers for one compute worker. Owned exclusively by a
/// single worker for the duration of its pass; never shared.
#[derive(Debug, Default)]
pub struct ComputeScratch {
    hops: Vec<u32>,
    dist: Vec<f64>,
    queue: VecDeque<NodeId>,
}

impl ComputeScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, node_count: usize) {
        self.hops.clear();
        self.hops.resize(node_count, 0);
        self.dist.clear();
        self.dist.resize(node_count, f64::INFINITY);
        self.queue.clear();
    }
}

fn min_hop_row(
    grid: &GridConfig,
    bans: Option<&LinkBans>,
    id: NodeId,
    scratch: &mut ComputeScratch,
) -> Vec<u8> {
    let mut row = vec![NO_ROUTE; grid.node_count()];
    scratch.reset(grid.node_count());

    scratch.hops[id] = 1;
    scratch.queue.push_back(id);

    while let Some(u) = scratch.queue.pop_front() {
        for dir in Direction::ALL {
            if bans.is_some_and(|b| b.is_banned(u, dir)) {
                continue;
            }
            let Some(v) = grid.step(u, dir) else { continue };
            if scratch.hops[v] == 0 {
                scratch.hops[v] = scratch.hops[u] + 1;
                scratch.queue.push_back(v);
            }
            if scratch.hops[v] == scratch.hops[u] + 1 {
                let first = if u == id { dir.code() } else { row[u] };
                if row[v] == NO_ROUTE || first < row[v] {
                    row[v] = first;
                }
            }
        }
    }

    row
}

fn domain_row(
    grid: &GridConfig,
    domains: &DomainGrid,
    bans: &LinkBans,
    id: NodeId,
    scratch: &mut ComputeScratch,
) -> Vec<u8> {
    let mut row = vec![NO_ROUTE; grid.node_count()];
    scratch.reset(grid.node_count());

    let home = domains.cell_of(id);
    scratch.hops[id] = 1;
    scratch.queue.push_back(id);

    while let Some(u) = scratch.queue.pop_front() {
        for dir in Direction::ALL {
            if bans.is_banned(u, dir) {
                continue;
            }
            let Some(v) = grid.step(u, dir) else { continue };
            if domains.cell_of(v) != home {
                continue;
            }
            if scratch.hops[v] == 0 {
                scratch.hops[v] = scratch.hops[u] + 1;
                scratch.queue.push_back(v);
            }
            if scratch.hops[v] == scratch.hops[u] + 1 {
                let first = if u == id { dir.code() } else { row[u] };
                if row[v] == NO_ROUTE || first < row[v] {
                    row[v] = first;
                }
            }
        }
    }

    row
}

/// Max-heap entry ordered so the smallest tentative distance pops
/// first; node id breaks exact ties to keep the pop order stable.
struct HeapEntry {
    dist: f64,
    node: NodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

fn dijkstra_row(
    grid: &GridConfig,
    delay: &DelayModel,
    positions: &[[f64; 3]],
    bans: &LinkBans,
    id: NodeId,
    scratch: &mut ComputeScratch,
) -> Vec<u8> {
    let mut row = vec![NO_ROUTE; grid.node_count()];
    scratch.reset(grid.node_count());

    let mut heap = BinaryHeap::new();
    scratch.dist[id] = 0.0;
    heap.push(HeapEntry { dist: 0.0, node: id });

    while let Some(HeapEntry { node: u, .. }) = heap.pop() {
        if scratch.hops[u] != 0 {
            continue; // already settled
        }
        scratch.hops[u] = 1;

        for dir in Direction::ALL {
            if bans.is_banned(u, dir) {
                continue;
            }
            let Some(v) = grid.step(u, dir) else { continue };
            let next = scratch.dist[u] + delay.link_delay_ms(&positions[u], &positions[v]);
            // Strictly-less only: equal-cost alternatives never displace
            // the hop discovered first.
            if next < scratch.dist[v] {
                scratch.dist[v] = next;
                row[v] = if u == id { dir.code() } else { row[u] };
                heap.push(HeapEntry { dist: next, node: v });
            }
        }
    }

    row
}
