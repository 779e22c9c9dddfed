//! Tick-indexed vehicle itineraries.

use asrs_core::{Cell, Tick, TimeWindow};
use asrs_grid::Path;

/// What the vehicle is doing while it occupies a slot.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Activity {
    Travel,
    Load,
    Unload,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    pub cell:     Cell,
    pub activity: Activity,
}

/// A planned sequence of slots.  See the crate docs for the timing model.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Itinerary {
    /// Where the vehicle stands before slot 0.
    pub start:     Cell,
    /// Tick of slot 0.
    pub depart:    Tick,
    pub waypoints: Vec<Waypoint>,
    cursor:        usize,
}

impl Itinerary {
    /// Tick of the final slot as planned (ignores any stall).
    pub fn planned_arrival(&self) -> Tick {
        self.depart + self.waypoints.len().saturating_sub(1) as u64
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// `true` once every slot has been consumed.
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.waypoints.len()
    }

    /// Consume the next slot.
    pub fn advance(&mut self) -> Option<Waypoint> {
        let wp = self.waypoints.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(wp)
    }

    /// Slots not yet consumed.
    pub fn remaining(&self) -> &[Waypoint] {
        &self.waypoints[self.cursor.min(self.waypoints.len())..]
    }

    /// `true` if the unconsumed part of the itinerary enters `cell`.
    pub fn crosses(&self, cell: Cell) -> bool {
        self.remaining().iter().any(|w| w.cell == cell)
    }

    /// Number of travel moves (path length in steps).
    pub fn travel_steps(&self) -> usize {
        self.waypoints.iter().filter(|w| w.activity == Activity::Travel).count()
    }

    /// The cell the vehicle ends in.
    pub fn end_cell(&self) -> Cell {
        self.waypoints.last().map_or(self.start, |w| w.cell)
    }

    /// Every `(cell, window)` this itinerary needs, when planned at `now`.
    ///
    /// The start cell is held from `now` through the hand-over into slot 0;
    /// slot `k` is held for `[depart + k, depart + k + 2)`.
    pub fn reservation_requests(&self, now: Tick) -> Vec<(Cell, TimeWindow)> {
        let mut out = Vec::with_capacity(self.waypoints.len() + 1);
        out.push((self.start, TimeWindow::new(now, self.depart + 1)));
        for (k, wp) in self.waypoints.iter().enumerate() {
            let t = self.depart + k as u64;
            out.push((wp.cell, TimeWindow::new(t, t + 2)));
        }
        out
    }
}

// ── ItineraryBuilder ──────────────────────────────────────────────────────────

/// Assemble an [`Itinerary`] from path legs and dwells.
///
/// ```
/// use asrs_core::{Cell, Tick};
/// use asrs_fleet::{Activity, ItineraryBuilder};
/// use asrs_grid::Path;
///
/// let a = Cell::new(0, 0, 0);
/// let b = Cell::new(1, 0, 0);
/// let it = ItineraryBuilder::new(a)
///     .dwell(Activity::Load, 1)
///     .travel(&Path { cells: vec![a, b], cost: 10 })
///     .dwell(Activity::Unload, 1)
///     .build(Tick(5));
/// assert_eq!(it.len(), 3);
/// assert_eq!(it.planned_arrival(), Tick(7));
/// ```
pub struct ItineraryBuilder {
    start:     Cell,
    waypoints: Vec<Waypoint>,
}

impl ItineraryBuilder {
    pub fn new(start: Cell) -> Self {
        Self { start, waypoints: Vec::new() }
    }

    /// Where the itinerary currently ends.
    pub fn end_cell(&self) -> Cell {
        self.waypoints.last().map_or(self.start, |w| w.cell)
    }

    /// Slots added so far.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Follow `path`.  Its first cell is skipped when it is the current end.
    pub fn travel(mut self, path: &Path) -> Self {
        let skip = usize::from(path.start() == Some(self.end_cell()));
        self.waypoints.extend(
            path.cells
                .iter()
                .skip(skip)
                .map(|&cell| Waypoint { cell, activity: Activity::Travel }),
        );
        self
    }

    /// Stay on the current end cell for `ticks` slots.
    pub fn dwell(mut self, activity: Activity, ticks: u64) -> Self {
        let cell = self.end_cell();
        self.waypoints
            .extend((0..ticks).map(|_| Waypoint { cell, activity }));
        self
    }

    pub fn build(self, depart: Tick) -> Itinerary {
        Itinerary { start: self.start, depart, waypoints: self.waypoints, cursor: 0 }
    }
}
