//! Grid coordinates and warehouse extents.
//!
//! `Cell` is a plain `(x, y, z)` coordinate: `x` runs along a rack row
//! (columns), `y` across rows, `z` is the rack level.  Passability and rack
//! occupancy are properties of the grid, not of the coordinate, so `Cell`
//! stays `Copy` and hashable.

use std::fmt;

/// A discrete grid coordinate in the warehouse.
///
/// Coordinates are signed so neighbour arithmetic never underflows; a cell
/// with a negative component is simply out of bounds.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cell {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The cell displaced by `(dx, dy, dz)`.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Cell {
        Cell { x: self.x + dx, y: self.y + dy, z: self.z + dz }
    }

    /// Manhattan (L1) distance in steps.
    #[inline]
    pub fn manhattan(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }

    /// Squared Euclidean distance.  Exact in integers; used for R-tree
    /// ordering where only comparisons matter.
    #[inline]
    pub fn euclidean_sq(self, other: Cell) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dy = self.y.abs_diff(other.y) as u64;
        let dz = self.z.abs_diff(other.z) as u64;
        dx * dx + dy * dy + dz * dz
    }

    /// `[x, y, z]`, the point representation used by spatial indexes.
    #[inline]
    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<(i32, i32, i32)> for Cell {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Cell::new(x, y, z)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

// ── Extents ───────────────────────────────────────────────────────────────────

/// Size of the warehouse grid: `width` columns (x) × `depth` rows (y) ×
/// `levels` rack levels (z).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extents {
    pub width:  u32,
    pub depth:  u32,
    pub levels: u32,
}

impl Extents {
    pub const fn new(width: u32, depth: u32, levels: u32) -> Self {
        Self { width, depth, levels }
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.depth as usize * self.levels as usize
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && cell.z >= 0
            && (cell.x as u32) < self.width
            && (cell.y as u32) < self.depth
            && (cell.z as u32) < self.levels
    }

    /// Dense row-major index of `cell`, or `None` when it lies outside.
    ///
    /// Layout is `z`-major, then `y`, then `x`, so one rack level is a
    /// contiguous slice.
    #[inline]
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let (w, d) = (self.width as usize, self.depth as usize);
        Some((cell.z as usize * d + cell.y as usize) * w + cell.x as usize)
    }

    /// Inverse of [`index_of`](Self::index_of).
    #[inline]
    pub fn cell_at(&self, index: usize) -> Cell {
        let (w, d) = (self.width as usize, self.depth as usize);
        let x = index % w;
        let y = (index / w) % d;
        let z = index / (w * d);
        Cell::new(x as i32, y as i32, z as i32)
    }

    /// Every in-bounds cell in index order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.cell_count()).map(|i| self.cell_at(i))
    }
}

impl fmt::Display for Extents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.depth, self.levels)
    }
}
