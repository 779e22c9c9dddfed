//! Routing trait and the default A* implementation.
//!
//! # Pluggability
//!
//! The scheduler plans through the [`Pathfinder`] trait, so applications can
//! swap in other planners (time-expanded A*, precomputed aisle graphs)
//! without touching the scheduling core.
//!
//! # Cost model
//!
//! Costs are integers from [`MoveCosts`]: every orthogonal step costs
//! `orthogonal`, every diagonal step `diagonal`, and a change of direction
//! adds `turn`.  When `turn > 0` the search runs over `(cell, heading)`
//! states so the turn penalty is priced exactly.
//!
//! A diagonal step is only taken when both orthogonal cells beside it are
//! open: no cutting wall corners, no squeezing between avoided cells.
//!
//! # Determinism
//!
//! The open set is ordered by `(f, insertion sequence)`: among frontier
//! entries with equal `f` the one inserted first is expanded first.  Combined
//! with the fixed neighbour order of the grid this makes every route
//! reproducible run to run.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

use asrs_core::{Cell, GridConfig, MoveCosts};

use crate::grid::{Grid, MOVES, ORTHOGONAL_MOVES};
use crate::{CellSet, GridError, GridResult};

/// Heading slot used for the start state (no move made yet) and for every
/// state when turn costs are off.
const NO_HEADING: usize = MOVES.len();
const HEADINGS: usize = MOVES.len() + 1;
const NONE: u32 = u32::MAX;

// ── Path ──────────────────────────────────────────────────────────────────────

/// An ordered route from `cells[0]` (start) to `cells[last]` (goal).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    pub cells: Vec<Cell>,
    /// Total cost in [`MoveCosts`] units.
    pub cost:  u32,
}

impl Path {
    /// The zero-length path that stays on `cell`.
    pub fn stay(cell: Cell) -> Self {
        Self { cells: vec![cell], cost: 0 }
    }

    /// Number of moves (cells minus one).
    pub fn steps(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// `true` if the start and goal are the same cell.
    pub fn is_trivial(&self) -> bool {
        self.cells.len() <= 1
    }

    pub fn start(&self) -> Option<Cell> {
        self.cells.first().copied()
    }

    pub fn goal(&self) -> Option<Cell> {
        self.cells.last().copied()
    }

    /// Number of direction changes along the path.
    pub fn turns(&self) -> usize {
        let dirs: Vec<(i32, i32, i32)> = self
            .cells
            .windows(2)
            .map(|w| (w[1].x - w[0].x, w[1].y - w[0].y, w[1].z - w[0].z))
            .collect();
        dirs.windows(2).filter(|d| d[0] != d[1]).count()
    }

    /// Append `next`, which must start where `self` ends.  The shared joint
    /// cell is kept once.
    pub fn join(mut self, next: Path) -> Path {
        let skip = usize::from(self.goal().is_some() && self.goal() == next.start());
        self.cells.extend(next.cells.into_iter().skip(skip));
        self.cost += next.cost;
        self
    }
}

// ── Pathfinder trait ──────────────────────────────────────────────────────────

/// Pluggable path planner.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`: the scheduler plans many jobs in
/// parallel against one shared grid.
pub trait Pathfinder: Send + Sync {
    /// Compute a route from `start` to `goal` that never enters a cell in
    /// `avoid`.  `start` itself is exempt from `avoid` (the vehicle is
    /// already there).
    ///
    /// `start == goal` yields a one-cell path of cost 0.
    fn plan(&self, grid: &Grid, start: Cell, goal: Cell, avoid: &CellSet) -> GridResult<Path>;
}

// ── AStarPlanner ──────────────────────────────────────────────────────────────

/// A* over the grid graph with a Manhattan heuristic (octile on diagonal
/// grids).  Both heuristics are admissible and consistent for the cost bands
/// enforced by [`GridConfig::validate`], so returned paths are cost-optimal.
#[derive(Clone, Debug)]
pub struct AStarPlanner {
    costs:               MoveCosts,
    rack_cells_passable: bool,
}

impl AStarPlanner {
    pub fn new(costs: MoveCosts) -> Self {
        Self { costs, rack_cells_passable: true }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            costs:               config.costs,
            rack_cells_passable: config.rack_cells_passable,
        }
    }

    /// Treat rack cells as walls except at the path's endpoints.
    pub fn racks_block_transit(mut self) -> Self {
        self.rack_cells_passable = false;
        self
    }

    pub fn costs(&self) -> MoveCosts {
        self.costs
    }

    #[inline]
    fn heuristic(&self, grid: &Grid, from: Cell, to: Cell) -> u32 {
        let dx = from.x.abs_diff(to.x);
        let dy = from.y.abs_diff(to.y);
        let dz = from.z.abs_diff(to.z);
        let o = self.costs.orthogonal;
        if grid.allow_diagonal() {
            let (lo, hi) = (dx.min(dy), dx.max(dy));
            lo * self.costs.diagonal + (hi - lo) * o + dz * o
        } else {
            (dx + dy + dz) * o
        }
    }

    #[inline]
    fn step_cost(&self, mv: usize, heading: usize) -> u32 {
        let base = if mv < ORTHOGONAL_MOVES { self.costs.orthogonal } else { self.costs.diagonal };
        if heading != NO_HEADING && heading != mv {
            base + self.costs.turn
        } else {
            base
        }
    }
}

impl Pathfinder for AStarPlanner {
    fn plan(&self, grid: &Grid, start: Cell, goal: Cell, avoid: &CellSet) -> GridResult<Path> {
        let extents = grid.extents();
        let start_idx = extents.index_of(start).ok_or(GridError::OutOfBounds(start))?;
        let goal_idx = extents.index_of(goal).ok_or(GridError::OutOfBounds(goal))?;

        if start == goal {
            return Ok(Path::stay(start));
        }
        if !grid.is_passable(goal)? || avoid.contains(&goal) {
            debug!(%start, %goal, "goal is blocked");
            return Err(GridError::Unreachable { from: start, to: goal });
        }

        let track_heading = self.costs.turn > 0;
        let n = extents.cell_count() * HEADINGS;
        let state = |cell_idx: usize, heading: usize| -> usize {
            cell_idx * HEADINGS + if track_heading { heading } else { NO_HEADING }
        };

        // g[s] = best known cost to reach state s; parent[s] = predecessor.
        let mut g      = vec![u32::MAX; n];
        let mut parent = vec![NONE; n];
        let mut closed = vec![false; n];

        // Min-heap on (f, seq).  `seq` is a monotonically increasing insertion
        // counter: equal-f entries pop in FIFO order.
        let mut heap: BinaryHeap<Reverse<(u32, u64, u32)>> = BinaryHeap::new();
        let mut seq: u64 = 0;

        let s0 = state(start_idx, NO_HEADING);
        g[s0] = 0;
        heap.push(Reverse((self.heuristic(grid, start, goal), seq, s0 as u32)));

        let mut expanded = 0usize;
        while let Some(Reverse((_, _, s))) = heap.pop() {
            let s = s as usize;
            if closed[s] {
                continue;
            }
            closed[s] = true;
            expanded += 1;

            let cell_idx = s / HEADINGS;
            let heading = s % HEADINGS;
            if cell_idx == goal_idx {
                let path = reconstruct(grid, &parent, &g, s);
                trace!(%start, %goal, steps = path.steps(), cost = path.cost, expanded, "path found");
                return Ok(path);
            }

            let cell = extents.cell_at(cell_idx);
            for (mv, next) in grid.moves_from(cell) {
                // moves_from only yields in-bounds cells.
                let Some(next_idx) = extents.index_of(next) else { continue };
                let (passable, has_rack) = grid.cell_state(next_idx);
                if !passable || avoid.contains(&next) {
                    continue;
                }
                if has_rack && !self.rack_cells_passable && next_idx != goal_idx {
                    continue;
                }
                if mv >= ORTHOGONAL_MOVES && !corner_is_clear(grid, cell, next, avoid) {
                    continue;
                }

                let ns = state(next_idx, mv);
                if closed[ns] {
                    continue;
                }
                let new_g = g[s].saturating_add(self.step_cost(mv, heading));
                if new_g < g[ns] {
                    g[ns] = new_g;
                    parent[ns] = s as u32;
                    seq += 1;
                    let f = new_g.saturating_add(self.heuristic(grid, next, goal));
                    heap.push(Reverse((f, seq, ns as u32)));
                }
            }
        }

        debug!(%start, %goal, expanded, "no path");
        Err(GridError::Unreachable { from: start, to: goal })
    }
}

fn reconstruct(grid: &Grid, parent: &[u32], g: &[u32], goal_state: usize) -> Path {
    let extents = grid.extents();
    let mut cells = Vec::new();
    let mut cur = goal_state as u32;
    while cur != NONE {
        cells.push(extents.cell_at(cur as usize / HEADINGS));
        cur = parent[cur as usize];
    }
    cells.reverse();
    Path { cells, cost: g[goal_state] }
}

/// `true` if both orthogonal cells a diagonal step from `from` to `to`
/// sweeps past are passable and not avoided.
fn corner_is_clear(grid: &Grid, from: Cell, to: Cell, avoid: &CellSet) -> bool {
    [Cell::new(to.x, from.y, from.z), Cell::new(from.x, to.y, from.z)]
        .into_iter()
        .all(|corner| grid.is_passable(corner).unwrap_or(false) && !avoid.contains(&corner))
}
