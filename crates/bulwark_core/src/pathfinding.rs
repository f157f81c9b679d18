//! Grid navigation for the reference arena: bounded A* and sight lines.
//!
//! All calculations use integer cells and fixed-point costs so that
//! reachability answers are identical on every platform.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::geometry::ShotLineCells;
use crate::math::{Cell, Fixed};

/// Number of cells in one pathing region, used to turn region caps into
/// expansion budgets.
pub const REGION_CELLS: usize = 144;

/// Cell types for the navigation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    /// Open ground (cost: 1).
    #[default]
    Walkable,
    /// Impassable, blocks sight.
    Wall,
    /// Closed door: blocks sight, passable only for those who bash doors.
    Door,
    /// Low fence: see-through, passable only for those who bash fences.
    Fence,
}

impl CellType {
    /// Movement cost for a traverser, or `None` if it cannot enter.
    #[must_use]
    pub const fn movement_cost(self, traverse: TraverseParams) -> Option<Fixed> {
        match self {
            Self::Walkable => Some(Fixed::ONE),
            Self::Wall => None,
            Self::Door if traverse.can_bash_doors => Some(Fixed::const_from_int(2)),
            Self::Fence if traverse.can_bash_fences => Some(Fixed::const_from_int(2)),
            Self::Door | Self::Fence => None,
        }
    }

    /// Whether line of sight passes over this cell.
    #[must_use]
    pub const fn can_be_seen_over(self) -> bool {
        matches!(self, Self::Walkable | Self::Fence)
    }
}

/// What a moving entity is allowed to break through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TraverseParams {
    /// May bash through closed doors.
    #[serde(default)]
    pub can_bash_doors: bool,
    /// May bash through fences.
    #[serde(default)]
    pub can_bash_fences: bool,
}

impl TraverseParams {
    /// Traverse without breaking anything.
    pub const NORMAL: Self = Self {
        can_bash_doors: false,
        can_bash_fences: false,
    };
}

/// Navigation grid of unit cells, origin at cell (0, 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavGrid {
    /// Grid width in cells.
    width: u32,
    /// Grid height in cells.
    height: u32,
    /// Cell data stored in row-major order.
    cells: Vec<CellType>,
}

impl NavGrid {
    /// Create a grid with all cells walkable.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidState(format!(
                "NavGrid must not be empty ({width}x{height})"
            )));
        }
        let cell_count = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            cells: vec![CellType::Walkable; cell_count],
        })
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check stored cell data matches the dimensions (for deserialized grids).
    pub fn validate(&self) -> Result<()> {
        let expected = (self.width as usize) * (self.height as usize);
        if expected == 0 || self.cells.len() != expected {
            return Err(CoreError::InvalidState(format!(
                "NavGrid {}x{} has {} cells",
                self.width,
                self.height,
                self.cells.len()
            )));
        }
        Ok(())
    }

    #[inline]
    fn index(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some((cell.z as usize) * (self.width as usize) + (cell.x as usize))
        } else {
            None
        }
    }

    /// Check if a cell is within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.z >= 0 && (cell.x as u32) < self.width && (cell.z as u32) < self.height
    }

    /// Cell type, or `None` if out of bounds.
    #[must_use]
    pub fn get_cell(&self, cell: Cell) -> Option<CellType> {
        self.index(cell).and_then(|i| self.cells.get(i).copied())
    }

    /// Set cell type. Returns `false` if out of bounds.
    pub fn set_cell(&mut self, cell: Cell, cell_type: CellType) -> bool {
        match self.index(cell).and_then(|i| self.cells.get_mut(i)) {
            Some(slot) => {
                *slot = cell_type;
                true
            }
            None => false,
        }
    }

    /// Whether a traverser may enter the cell.
    #[must_use]
    pub fn is_passable(&self, cell: Cell, traverse: TraverseParams) -> bool {
        self.movement_cost(cell, traverse).is_some()
    }

    /// Whether sight passes over the cell. Out-of-bounds cells block sight.
    #[must_use]
    pub fn can_be_seen_over(&self, cell: Cell) -> bool {
        self.get_cell(cell).is_some_and(CellType::can_be_seen_over)
    }

    /// Movement cost, `None` for impassable or out-of-bounds cells.
    #[must_use]
    pub fn movement_cost(&self, cell: Cell, traverse: TraverseParams) -> Option<Fixed> {
        self.get_cell(cell).and_then(|c| c.movement_cost(traverse))
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    cell: Cell,
    /// f_score = g_score + heuristic.
    f_score: Fixed,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f_score; equal scores fall back to the lower cell.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 8-directional movement.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // East
    (1, 1),   // Southeast
    (0, 1),   // South
    (-1, 1),  // Southwest
    (-1, 0),  // West
    (-1, -1), // Northwest
    (0, -1),  // North
    (1, -1),  // Northeast
];

/// Where a search may stop relative to the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEnd {
    /// Stand on the goal cell.
    OnCell,
    /// Stand on or next to the goal cell.
    Touch,
}

impl PathEnd {
    fn reached(self, cell: Cell, goal: Cell) -> bool {
        match self {
            Self::OnCell => cell == goal,
            Self::Touch => cell.chebyshev(goal) <= 1,
        }
    }
}

/// Diagonal moves may not cut the corner of an impassable cell.
#[inline]
fn is_diagonal_valid(grid: &NavGrid, from: Cell, dx: i32, dz: i32, traverse: TraverseParams) -> bool {
    if dx != 0 && dz != 0 {
        grid.is_passable(from.offset(dx, 0), traverse) && grid.is_passable(from.offset(0, dz), traverse)
    } else {
        true
    }
}

/// Find a path using A*, expanding at most `max_expansions` nodes.
///
/// # Errors
///
/// Returns `CoreError::InvalidState` if:
/// - the start cell is outside the grid or impassable
/// - no path exists, or the expansion budget ran out first
pub fn find_path(
    grid: &NavGrid,
    start: Cell,
    goal: Cell,
    end: PathEnd,
    traverse: TraverseParams,
    max_expansions: Option<usize>,
) -> Result<Vec<Cell>> {
    if !grid.in_bounds(start) {
        return Err(CoreError::InvalidState("Start cell outside grid".into()));
    }
    if end.reached(start, goal) {
        return Ok(vec![start]);
    }
    if end == PathEnd::OnCell && !grid.is_passable(goal, traverse) {
        return Err(CoreError::InvalidState("Goal cell is blocked".into()));
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, Fixed> = HashMap::new();
    let mut expansions = 0usize;

    g_score.insert(start, Fixed::ZERO);
    open_set.push(AStarNode {
        cell: start,
        f_score: heuristic(start, goal),
    });

    while let Some(current) = open_set.pop() {
        if end.reached(current.cell, goal) {
            return Ok(reconstruct_path(&came_from, current.cell));
        }

        expansions += 1;
        if max_expansions.is_some_and(|budget| expansions > budget) {
            tracing::trace!(?start, ?goal, expansions, "Path search budget exhausted");
            break;
        }

        let current_g = g_score.get(&current.cell).copied().unwrap_or(Fixed::MAX);

        for &(dx, dz) in &DIRECTIONS {
            let next = current.cell.offset(dx, dz);
            let Some(cost) = grid.movement_cost(next, traverse) else {
                continue;
            };
            if !is_diagonal_valid(grid, current.cell, dx, dz, traverse) {
                continue;
            }

            let tentative_g = current_g + cost;
            if tentative_g < g_score.get(&next).copied().unwrap_or(Fixed::MAX) {
                came_from.insert(next, current.cell);
                g_score.insert(next, tentative_g);
                open_set.push(AStarNode {
                    cell: next,
                    f_score: tentative_g + heuristic(next, goal),
                });
            }
        }
    }

    Err(CoreError::InvalidState(format!(
        "No path from ({}, {}) to ({}, {})",
        start.x, start.z, goal.x, goal.z
    )))
}

/// Whether a traverser at `start` can get next to `goal` within a region cap.
#[must_use]
pub fn can_reach(
    grid: &NavGrid,
    start: Cell,
    goal: Cell,
    traverse: TraverseParams,
    max_regions: Option<u32>,
) -> bool {
    let budget = max_regions.map(|regions| regions as usize * REGION_CELLS);
    find_path(grid, start, goal, PathEnd::Touch, traverse, budget).is_ok()
}

/// Chebyshev distance heuristic (suitable for 8-directional movement).
#[inline]
fn heuristic(from: Cell, to: Cell) -> Fixed {
    Fixed::from_num(from.chebyshev(to))
}

fn reconstruct_path(came_from: &HashMap<Cell, Cell>, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Check for a clear sight line between two cells.
///
/// The end cell itself never blocks; the start cell blocks only when
/// `skip_first` is false. A diagonal step is blocked when both corner cells
/// block sight.
#[must_use]
pub fn has_line_of_sight(grid: &NavGrid, from: Cell, to: Cell, skip_first: bool) -> bool {
    if !grid.in_bounds(from) || !grid.in_bounds(to) {
        return false;
    }

    let mut previous: Option<Cell> = None;
    for cell in ShotLineCells::new(from, to) {
        if let Some(prev) = previous {
            let (dx, dz) = (cell.x - prev.x, cell.z - prev.z);
            if dx != 0
                && dz != 0
                && !grid.can_be_seen_over(prev.offset(dx, 0))
                && !grid.can_be_seen_over(prev.offset(0, dz))
            {
                return false;
            }
        }
        previous = Some(cell);

        if cell == to {
            break;
        }
        if cell == from && skip_first {
            continue;
        }
        if !grid.can_be_seen_over(cell) {
            return false;
        }
    }
    true
}
