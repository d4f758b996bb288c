//! Grid terrain model.
//!
//! The grid is static level data: every cell is either [`Terrain::Ground`] or
//! [`Terrain::Wall`]. Who stands where is not part of the grid; it is captured per query
//! in an [`Occupancy`] snapshot built from the live unit positions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, Side, UnitId};
use crate::error::{GameError, Result};

/// Integer grid coordinate. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPos {
    /// Create a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two cells.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Offset this position by a step vector.
    #[must_use]
    pub const fn offset(self, step: Step) -> Self {
        Self::new(self.x + step.dx, self.y + step.dy)
    }

    /// Per-axis sign of the vector from `self` to `other`.
    ///
    /// May be diagonal, e.g. `(1, 1)`.
    #[must_use]
    pub const fn direction_to(self, other: Self) -> Step {
        Step::new((other.x - self.x).signum(), (other.y - self.y).signum())
    }

    /// The four cardinal neighbours in [`Direction::CARDINALS`] order.
    #[must_use]
    pub fn neighbors(self) -> [GridPos; 4] {
        Direction::CARDINALS.map(|dir| self.offset(dir.step()))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A small displacement vector between cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Step {
    /// Column delta.
    pub dx: i32,
    /// Row delta.
    pub dy: i32,
}

impl Step {
    /// Create a new step.
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Scale both components.
    #[must_use]
    pub const fn scaled(self, factor: i32) -> Self {
        Self::new(self.dx * factor, self.dy * factor)
    }

    /// The opposite step.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self::new(-self.dx, -self.dy)
    }

    /// Rotated a quarter turn counter-clockwise on screen (`y` grows downward).
    #[must_use]
    pub const fn rotated_ccw(self) -> Self {
        Self::new(self.dy, -self.dx)
    }

    /// Rotated a quarter turn clockwise on screen (`y` grows downward).
    #[must_use]
    pub const fn rotated_cw(self) -> Self {
        Self::new(-self.dy, self.dx)
    }

    /// True for the zero vector.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// +x
    Right,
    /// -y
    Up,
    /// -x
    Left,
    /// +y
    Down,
}

impl Direction {
    /// Fixed neighbour iteration order used by every search in the crate.
    pub const CARDINALS: [Direction; 4] = [
        Direction::Right,
        Direction::Up,
        Direction::Left,
        Direction::Down,
    ];

    /// Unit step for this direction.
    #[must_use]
    pub const fn step(self) -> Step {
        match self {
            Self::Right => Step::new(1, 0),
            Self::Up => Step::new(0, -1),
            Self::Left => Step::new(-1, 0),
            Self::Down => Step::new(0, 1),
        }
    }
}

/// Terrain classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Walkable floor.
    #[default]
    Ground,
    /// Impassable for movement and pathfinding; abilities reach over it.
    Wall,
}

impl Terrain {
    /// Parse a map glyph. `.` is ground, `#` is a wall.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(Self::Ground),
            '#' => Some(Self::Wall),
            _ => None,
        }
    }

    /// Map glyph for this terrain.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Ground => '.',
            Self::Wall => '#',
        }
    }

    /// Returns true if units can stand on this terrain.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Ground)
    }
}

/// Static terrain for one encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    /// Grid width in cells.
    width: u32,
    /// Grid height in cells.
    height: u32,
    /// Cell data stored in row-major order.
    cells: Vec<Terrain>,
}

impl TerrainGrid {
    /// Create a grid with every cell set to ground.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "TerrainGrid width must be positive");
        assert!(height > 0, "TerrainGrid height must be positive");

        Self {
            width,
            height,
            cells: vec![Terrain::Ground; (width as usize) * (height as usize)],
        }
    }

    /// Build a grid from text rows (`.` ground, `#` wall).
    ///
    /// # Errors
    ///
    /// Returns an error for empty input, rows of unequal length or unknown glyphs.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
        if height == 0 || width == 0 {
            return Err(GameError::EmptyGrid);
        }

        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != width {
                return Err(GameError::RaggedGrid {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let terrain =
                    Terrain::from_glyph(glyph).ok_or(GameError::UnknownTerrain { glyph, x, y })?;
                cells.push(terrain);
            }
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            cells,
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

    /// Number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn index(&self, pos: GridPos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Check if a position lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Terrain at a position, `None` outside the grid.
    #[must_use]
    pub fn terrain_at(&self, pos: GridPos) -> Option<Terrain> {
        if self.in_bounds(pos) {
            Some(self.cells[self.index(pos)])
        } else {
            None
        }
    }

    /// Set terrain at a position. Returns `false` if out of bounds.
    pub fn set_terrain(&mut self, pos: GridPos, terrain: Terrain) -> bool {
        if self.in_bounds(pos) {
            let index = self.index(pos);
            self.cells[index] = terrain;
            true
        } else {
            false
        }
    }

    /// In bounds and ground.
    #[must_use]
    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.terrain_at(pos).is_some_and(Terrain::is_walkable)
    }

    /// Render the terrain back into text rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|t| t.glyph()).collect())
            .collect()
    }
}

/// Snapshot of which living units stand on which cell.
///
/// Rebuilt from the roster for every query instead of being maintained incrementally,
/// so it can never go stale. Dead units are not recorded: their cells count as ground.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    cells: BTreeMap<GridPos, Vec<(UnitId, Side)>>,
}

impl Occupancy {
    /// Build a snapshot from every combatant.
    pub fn from_units<'a, I>(units: I) -> Self
    where
        I: IntoIterator<Item = &'a Combatant>,
    {
        let mut cells: BTreeMap<GridPos, Vec<(UnitId, Side)>> = BTreeMap::new();
        for unit in units.into_iter().filter(|u| !u.is_dead()) {
            cells
                .entry(unit.position)
                .or_default()
                .push((unit.id, unit.side));
        }
        Self { cells }
    }

    /// Living unit ids at a cell.
    pub fn occupied_by(&self, pos: GridPos) -> impl Iterator<Item = UnitId> + '_ {
        self.cells
            .get(&pos)
            .into_iter()
            .flat_map(|units| units.iter().map(|&(id, _)| id))
    }

    /// Is any living unit standing here?
    #[must_use]
    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Is a living unit of `side` standing here?
    #[must_use]
    pub fn is_occupied_by_side(&self, pos: GridPos, side: Side) -> bool {
        self.cells
            .get(&pos)
            .is_some_and(|units| units.iter().any(|&(_, s)| s == side))
    }

    /// All occupied cells.
    pub fn positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.cells.keys().copied()
    }

    /// Occupied cells excluding the given ones.
    #[must_use]
    pub fn blocked_except(&self, keep_open: &[GridPos]) -> Vec<GridPos> {
        self.positions()
            .filter(|pos| !keep_open.contains(pos))
            .collect()
    }
}

/// Terrain plus occupancy: "can a unit step here right now?"
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    /// Static terrain.
    pub grid: &'a TerrainGrid,
    /// Living unit positions.
    pub occupancy: &'a Occupancy,
}

impl<'a> GridView<'a> {
    /// Create a new view.
    #[must_use]
    pub const fn new(grid: &'a TerrainGrid, occupancy: &'a Occupancy) -> Self {
        Self { grid, occupancy }
    }

    /// In bounds, ground and free of living units.
    #[must_use]
    pub fn is_steppable(&self, pos: GridPos) -> bool {
        self.grid.is_walkable(pos) && !self.occupancy.is_occupied(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan() {
        assert_eq!(GridPos::new(0, 0).manhattan(GridPos::new(3, -4)), 7);
        assert_eq!(GridPos::new(2, 2).manhattan(GridPos::new(2, 2)), 0);
    }

    #[test]
    fn test_direction_to_is_sign_vector() {
        let from = GridPos::new(1, 1);
        assert_eq!(from.direction_to(GridPos::new(5, 1)), Step::new(1, 0));
        assert_eq!(from.direction_to(GridPos::new(0, 9)), Step::new(-1, 1));
        assert!(from.direction_to(from).is_zero());
    }

    #[test]
    fn test_rotations_are_perpendicular() {
        let right = Direction::Right.step();
        assert_eq!(right.rotated_ccw(), Direction::Up.step());
        assert_eq!(right.rotated_cw(), Direction::Down.step());
        assert_eq!(right.rotated_cw().rotated_ccw(), right);
    }

    #[test]
    fn test_neighbors_order() {
        let n = GridPos::new(0, 0).neighbors();
        assert_eq!(
            n,
            [
                GridPos::new(1, 0),
                GridPos::new(0, -1),
                GridPos::new(-1, 0),
                GridPos::new(0, 1)
            ]
        );
    }

    #[test]
    fn test_from_rows() {
        let grid = TerrainGrid::from_rows(&["..#", "#.."]).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.terrain_at(GridPos::new(2, 0)), Some(Terrain::Wall));
        assert_eq!(grid.terrain_at(GridPos::new(1, 1)), Some(Terrain::Ground));
        assert_eq!(grid.terrain_at(GridPos::new(3, 0)), None);
        assert_eq!(grid.to_rows(), vec!["..#".to_string(), "#..".to_string()]);
    }

    #[test]
    fn test_from_rows_errors() {
        let empty: [&str; 0] = [];
        assert_eq!(TerrainGrid::from_rows(&empty), Err(GameError::EmptyGrid));
        assert!(matches!(
            TerrainGrid::from_rows(&["...", ".."]),
            Err(GameError::RaggedGrid { row: 1, .. })
        ));
        assert!(matches!(
            TerrainGrid::from_rows(&[".x."]),
            Err(GameError::UnknownTerrain { glyph: 'x', .. })
        ));
    }

    #[test]
    fn test_bounds() {
        let grid = TerrainGrid::new(4, 3);
        assert!(grid.in_bounds(GridPos::new(0, 0)));
        assert!(grid.in_bounds(GridPos::new(3, 2)));
        assert!(!grid.in_bounds(GridPos::new(4, 0)));
        assert!(!grid.in_bounds(GridPos::new(-1, 0)));
    }

    #[test]
    fn test_set_terrain() {
        let mut grid = TerrainGrid::new(3, 3);
        assert!(grid.is_walkable(GridPos::new(1, 1)));
        assert!(grid.set_terrain(GridPos::new(1, 1), Terrain::Wall));
        assert!(!grid.is_walkable(GridPos::new(1, 1)));
        assert!(!grid.set_terrain(GridPos::new(9, 9), Terrain::Wall));
    }
}
