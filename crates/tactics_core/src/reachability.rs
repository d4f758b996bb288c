//! Range-limited flood fill.
//!
//! Computes which cells a unit can reach (movement) or target (abilities) from
//! its current cell within a budget, together with the cost of each cell. Every edge
//! costs 1, so breadth-first order discovers each cell at its minimal cost.

use std::collections::{BTreeMap, VecDeque};

use crate::combatant::Side;
use crate::grid::{GridPos, GridView};

/// Cell -> cost map. Ordered so iteration is deterministic.
pub type CostMap = BTreeMap<GridPos, u32>;

/// Which admissibility rules the flood fill applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReachMode {
    /// Walking. Walls and living opponents block; friends and corpses do not.
    Movement {
        /// Side of the moving unit.
        side: Side,
    },
    /// Ability targeting. Only distance matters.
    Targeting,
}

impl ReachMode {
    fn admits(self, view: &GridView<'_>, pos: GridPos) -> bool {
        match self {
            Self::Movement { side } => {
                view.grid.is_walkable(pos)
                    && !view.occupancy.is_occupied_by_side(pos, side.opponent())
            }
            Self::Targeting => view.grid.in_bounds(pos),
        }
    }
}

/// Flood fill from `origin` up to and including `budget`.
///
/// The origin is always present with cost 0.
#[must_use]
pub fn reachable(view: &GridView<'_>, origin: GridPos, budget: u32, mode: ReachMode) -> CostMap {
    let mut cells = CostMap::new();
    let mut queue = VecDeque::new();

    cells.insert(origin, 0);
    queue.push_back((origin, 0u32));

    while let Some((current, distance)) = queue.pop_front() {
        if distance >= budget {
            continue;
        }

        for next in current.neighbors() {
            if cells.contains_key(&next) || !mode.admits(view, next) {
                continue;
            }
            cells.insert(next, distance + 1);
            queue.push_back((next, distance + 1));
        }
    }

    tracing::trace!(?origin, budget, ?mode, reached = cells.len(), "Flood fill");
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{Combatant, UnitId};
    use crate::grid::{Occupancy, Terrain, TerrainGrid};
    use crate::math::Fixed;

    fn unit(id: u32, side: Side, x: i32, y: i32) -> Combatant {
        Combatant::new(
            UnitId(id),
            side,
            "unit",
            GridPos::new(x, y),
            Fixed::from_num(10),
            3,
            Vec::new(),
        )
    }

    fn fill(
        grid: &TerrainGrid,
        units: &[Combatant],
        origin: GridPos,
        budget: u32,
        mode: ReachMode,
    ) -> CostMap {
        let occupancy = Occupancy::from_units(units);
        reachable(&GridView::new(grid, &occupancy), origin, budget, mode)
    }

    const MOVE: ReachMode = ReachMode::Movement { side: Side::Player };

    #[test]
    fn test_straight_corridor() {
        let grid = TerrainGrid::from_rows(&["......", "######"]).unwrap();
        let cells = fill(&grid, &[], GridPos::new(0, 0), 3, MOVE);

        assert_eq!(cells.get(&GridPos::new(0, 0)), Some(&0));
        assert_eq!(cells.get(&GridPos::new(1, 0)), Some(&1));
        assert_eq!(cells.get(&GridPos::new(2, 0)), Some(&2));
        assert_eq!(cells.get(&GridPos::new(3, 0)), Some(&3));
        assert!(!cells.contains_key(&GridPos::new(4, 0)));
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn test_zero_budget_is_origin_only() {
        let grid = TerrainGrid::new(5, 5);
        let cells = fill(&grid, &[], GridPos::new(2, 2), 0, MOVE);
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn test_walls_force_detour() {
        // Wall at (1,0) and (1,1): reaching (2,0) costs 6 around the bottom.
        let grid = TerrainGrid::from_rows(&[".#.", ".#.", "..."]).unwrap();
        let cells = fill(&grid, &[], GridPos::new(0, 0), 10, MOVE);

        assert!(!cells.contains_key(&GridPos::new(1, 0)));
        assert_eq!(cells.get(&GridPos::new(2, 0)), Some(&6));
    }

    #[test]
    fn test_opponents_block_friends_and_corpses_do_not() {
        let grid = TerrainGrid::from_rows(&["....."]).unwrap();
        let friend = unit(2, Side::Player, 1, 0);
        let enemy = unit(3, Side::Ai, 3, 0);
        let cells = fill(&grid, &[friend, enemy.clone()], GridPos::new(0, 0), 5, MOVE);

        assert_eq!(cells.get(&GridPos::new(1, 0)), Some(&1));
        assert_eq!(cells.get(&GridPos::new(2, 0)), Some(&2));
        assert!(!cells.contains_key(&GridPos::new(3, 0)));
        assert!(!cells.contains_key(&GridPos::new(4, 0)));

        let mut corpse = enemy;
        corpse.take_hit(Fixed::from_num(100));
        let cells = fill(&grid, &[corpse], GridPos::new(0, 0), 5, MOVE);
        assert_eq!(cells.get(&GridPos::new(4, 0)), Some(&4));
    }

    #[test]
    fn test_enemy_side_movement_is_mirrored() {
        let grid = TerrainGrid::from_rows(&["...."]).unwrap();
        let player = unit(1, Side::Player, 1, 0);
        let cells = fill(
            &grid,
            &[player],
            GridPos::new(0, 0),
            3,
            ReachMode::Movement { side: Side::Ai },
        );
        assert!(!cells.contains_key(&GridPos::new(1, 0)));
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn test_targeting_reaches_over_walls_and_units() {
        let grid = TerrainGrid::from_rows(&[".#...", "#####", "....."]).unwrap();
        let enemy = unit(3, Side::Ai, 2, 0);
        let cells = fill(&grid, &[enemy], GridPos::new(0, 0), 2, ReachMode::Targeting);

        assert_eq!(cells.get(&GridPos::new(1, 0)), Some(&1));
        assert_eq!(cells.get(&GridPos::new(2, 0)), Some(&2));
        assert_eq!(cells.get(&GridPos::new(0, 2)), Some(&2));
        assert_eq!(cells.get(&GridPos::new(1, 1)), Some(&2));
        // Manhattan diamond of radius 2 clipped to the grid: 6 cells.
        assert_eq!(cells.len(), 6);
    }

    #[test]
    fn test_targeting_cost_is_manhattan() {
        let mut grid = TerrainGrid::new(9, 9);
        grid.set_terrain(GridPos::new(4, 3), Terrain::Wall);
        let origin = GridPos::new(4, 4);
        let cells = fill(&grid, &[], origin, 3, ReachMode::Targeting);

        for (pos, cost) in &cells {
            assert_eq!(*cost, origin.manhattan(*pos));
        }
        // Full diamond of radius 3: 1 + 4 + 8 + 12 cells.
        assert_eq!(cells.len(), 25);
    }
}
