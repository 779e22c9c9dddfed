//! Grid model: structural passability and rack occupancy.
//!
//! # Data layout
//!
//! Per-cell attributes are stored in dense `Vec`s indexed by
//! [`Extents::index_of`], so a lookup is one bounds check and one load.
//!
//! ```text
//! blocked[i]    true  → structural wall (column, pillar, dock edge)
//! occupancy[i]  RackId::INVALID → no rack at this cell
//! ```
//!
//! Topology (`blocked`) is fixed once the grid is built.  Occupancy is
//! written by the registry as racks are laid out.  Dynamic obstacles
//! (reserved cells, blocked vehicles) never live here; they are passed to the
//! planner per call.

use asrs_core::{Cell, Extents, GridConfig, RackId};

use crate::{GridError, GridResult};

/// Unit moves in neighbour order: ±x, ±y, ±z, then the four in-plane
/// diagonals.  The order is part of the planner's determinism contract.
pub(crate) const MOVES: [(i32, i32, i32); 10] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
    (1, 1, 0),
    (1, -1, 0),
    (-1, 1, 0),
    (-1, -1, 0),
];

/// Number of orthogonal entries at the front of [`MOVES`].
pub(crate) const ORTHOGONAL_MOVES: usize = 6;

// ── Grid ──────────────────────────────────────────────────────────────────────

/// The discretized warehouse space.
///
/// Do not construct directly; use [`GridBuilder`] or [`Grid::from_config`].
#[derive(Clone, Debug)]
pub struct Grid {
    extents:        Extents,
    allow_diagonal: bool,
    blocked:        Vec<bool>,
    occupancy:      Vec<RackId>,
}

impl Grid {
    /// An open grid (no walls, no racks) shaped by `config`.
    pub fn from_config(config: &GridConfig) -> Self {
        GridBuilder::new(config.extents)
            .allow_diagonal(config.allow_diagonal)
            .build()
    }

    #[inline]
    pub fn extents(&self) -> Extents {
        self.extents
    }

    #[inline]
    pub fn allow_diagonal(&self) -> bool {
        self.allow_diagonal
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        self.extents.contains(cell)
    }

    #[inline]
    fn index(&self, cell: Cell) -> GridResult<usize> {
        self.extents.index_of(cell).ok_or(GridError::OutOfBounds(cell))
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// `false` for structural walls.  Racks and reservations do not affect
    /// the answer.
    pub fn is_passable(&self, cell: Cell) -> GridResult<bool> {
        Ok(!self.blocked[self.index(cell)?])
    }

    /// The rack standing on `cell`, if any.
    pub fn occupancy(&self, cell: Cell) -> GridResult<Option<RackId>> {
        let rack = self.occupancy[self.index(cell)?];
        Ok((rack != RackId::INVALID).then_some(rack))
    }

    /// In-bounds neighbours of `cell` in deterministic move order.
    ///
    /// Orthogonal neighbours always; in-plane diagonals only when the grid
    /// allows diagonal movement.  Walls are *not* filtered out.
    pub fn neighbors(&self, cell: Cell) -> GridResult<Vec<Cell>> {
        self.index(cell)?;
        Ok(self.moves_from(cell).map(|(_, n)| n).collect())
    }

    /// `(move index, neighbour)` pairs for every in-bounds neighbour.
    pub(crate) fn moves_from(&self, cell: Cell) -> impl Iterator<Item = (usize, Cell)> + '_ {
        let limit = if self.allow_diagonal { MOVES.len() } else { ORTHOGONAL_MOVES };
        MOVES[..limit]
            .iter()
            .enumerate()
            .map(move |(i, &(dx, dy, dz))| (i, cell.offset(dx, dy, dz)))
            .filter(|(_, n)| self.extents.contains(*n))
    }

    /// Fast passability + occupancy read for an index already known valid.
    #[inline]
    pub(crate) fn cell_state(&self, index: usize) -> (bool, bool) {
        (!self.blocked[index], self.occupancy[index] != RackId::INVALID)
    }

    /// Every cell that currently holds a rack.
    pub fn rack_cells(&self) -> impl Iterator<Item = (Cell, RackId)> + '_ {
        self.occupancy
            .iter()
            .enumerate()
            .filter(|(_, r)| **r != RackId::INVALID)
            .map(|(i, r)| (self.extents.cell_at(i), *r))
    }

    pub fn passable_count(&self) -> usize {
        self.blocked.iter().filter(|b| !**b).count()
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Record (or clear) the rack standing on `cell`.
    pub fn set_occupancy(&mut self, cell: Cell, rack: Option<RackId>) -> GridResult<()> {
        let i = self.index(cell)?;
        self.occupancy[i] = rack.unwrap_or(RackId::INVALID);
        Ok(())
    }
}

// ── GridBuilder ───────────────────────────────────────────────────────────────

/// Construct a [`Grid`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use asrs_core::{Cell, Extents};
/// use asrs_grid::GridBuilder;
///
/// let grid = GridBuilder::new(Extents::new(10, 10, 1))
///     .block(Cell::new(3, 3, 0))
///     .build();
/// assert!(!grid.is_passable(Cell::new(3, 3, 0)).unwrap());
/// assert!(grid.is_passable(Cell::new(4, 3, 0)).unwrap());
/// ```
pub struct GridBuilder {
    extents:        Extents,
    allow_diagonal: bool,
    blocked:        Vec<bool>,
}

impl GridBuilder {
    pub fn new(extents: Extents) -> Self {
        Self {
            extents,
            allow_diagonal: false,
            blocked: vec![false; extents.cell_count()],
        }
    }

    pub fn allow_diagonal(mut self, allow: bool) -> Self {
        self.allow_diagonal = allow;
        self
    }

    /// Mark one cell as a structural wall.  Out-of-bounds cells are ignored.
    pub fn block(mut self, cell: Cell) -> Self {
        if let Some(i) = self.extents.index_of(cell) {
            self.blocked[i] = true;
        }
        self
    }

    /// Mark every cell in the inclusive box `a..=b` as a wall.
    pub fn block_region(mut self, a: Cell, b: Cell) -> Self {
        for z in a.z.min(b.z)..=a.z.max(b.z) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    self = self.block(Cell::new(x, y, z));
                }
            }
        }
        self
    }

    pub fn build(self) -> Grid {
        let n = self.extents.cell_count();
        Grid {
            extents:        self.extents,
            allow_diagonal: self.allow_diagonal,
            blocked:        self.blocked,
            occupancy:      vec![RackId::INVALID; n],
        }
    }
}
