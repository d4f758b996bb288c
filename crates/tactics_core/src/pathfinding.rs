//! Grid pathfinding using A* plus the step-level rules built on top of it.
//!
//! - [`find_path`]: four-directional A* with a Manhattan heuristic and a pluggable
//!   passability predicate.
//! - [`next_step`] / [`step_toward`]: the first move along a path, with the
//!   occupancy-aware search falling back to an occupancy-blind one.
//! - [`OscillationGuard`]: rejects steps back into recently visited cells and
//!   proposes alternatives.
//! - [`find_jump`]: hop over an adjacent unit when that gets closer to the goal.
//!
//! All searches iterate neighbours in [`Direction::CARDINALS`] order and break
//! ties deterministically, so identical inputs always produce identical steps.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use crate::grid::{Direction, GridPos, GridView, TerrainGrid};

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    pos: GridPos,
    /// f_score = g_score + heuristic
    f_score: u32,
    /// Heuristic alone; prefers nodes closer to the goal on equal f.
    h_score: u32,
    /// Tie-breaker for determinism: lower coordinates first.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so comparisons are reversed for min-heap behavior.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.h_score.cmp(&self.h_score))
            .then_with(|| other.tie_breaker.cmp(&self.tie_breaker))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Convert coordinates to a tie-breaker value for deterministic ordering.
#[inline]
fn coords_to_tie_breaker(pos: GridPos) -> u64 {
    ((pos.y as u32 as u64) << 32) | (pos.x as u32 as u64)
}

/// Find a path from `start` to `goal`, both included.
///
/// Walls and cells outside the grid are never traversable. `passable` decides every
/// other cell except `start` and `goal`, which are always allowed. Returns `None` when
/// either end is outside the grid or on a wall, or no path exists.
pub fn find_path<F>(grid: &TerrainGrid, start: GridPos, goal: GridPos, passable: F) -> Option<Vec<GridPos>>
where
    F: Fn(GridPos) -> bool,
{
    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        return None;
    }

    // Early exit if start == goal
    if start == goal {
        return Some(vec![start]);
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<GridPos, GridPos> = HashMap::new();
    let mut g_score: HashMap<GridPos, u32> = HashMap::new();

    let start_h = start.manhattan(goal);
    g_score.insert(start, 0);
    open_set.push(AStarNode {
        pos: start,
        f_score: start_h,
        h_score: start_h,
        tie_breaker: coords_to_tie_breaker(start),
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return Some(reconstruct_path(&came_from, goal));
        }

        let current_g = g_score.get(&current.pos).copied().unwrap_or(u32::MAX);
        // Stale heap entry
        if current.f_score > current_g.saturating_add(current.h_score) {
            continue;
        }

        for next in current.pos.neighbors() {
            if !grid.is_walkable(next) {
                continue;
            }
            if next != goal && !passable(next) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_score.get(&next).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(next, current.pos);
                g_score.insert(next, tentative_g);

                let h = next.manhattan(goal);
                open_set.push(AStarNode {
                    pos: next,
                    f_score: tentative_g + h,
                    h_score: h,
                    tie_breaker: coords_to_tie_breaker(next),
                });
            }
        }
    }

    None
}

/// Reconstruct path from came_from map.
fn reconstruct_path(came_from: &HashMap<GridPos, GridPos>, goal: GridPos) -> Vec<GridPos> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

/// First step from `start` toward `goal` avoiding `blocked` cells.
///
/// Returns `None` if there is no path or the path has fewer than two nodes.
#[must_use]
pub fn next_step(grid: &TerrainGrid, start: GridPos, goal: GridPos, blocked: &[GridPos]) -> Option<GridPos> {
    let path = find_path(grid, start, goal, |pos| !blocked.contains(&pos))?;
    path.get(1).copied()
}

/// First step toward `goal`, first treating living units as obstacles and, if that
/// finds nothing, ignoring them.
///
/// The fallback lets a unit close in on a goal that is walled off by other units; the
/// step it yields may be occupied and is vetted by the caller.
#[must_use]
pub fn step_toward(view: &GridView<'_>, start: GridPos, goal: GridPos) -> Option<GridPos> {
    let blocked = view.occupancy.blocked_except(&[start, goal]);
    if let Some(step) = next_step(view.grid, start, goal, &blocked) {
        return Some(step);
    }

    let step = next_step(view.grid, start, goal, &[]);
    if step.is_none() {
        tracing::debug!(?start, ?goal, "No path found");
    }
    step
}

/// Rejects moves back into a unit's recent positions.
#[derive(Debug, Clone, Copy)]
pub struct OscillationGuard<'a> {
    history: &'a VecDeque<GridPos>,
}

impl<'a> OscillationGuard<'a> {
    /// Guard over a unit's position history.
    #[must_use]
    pub const fn new(history: &'a VecDeque<GridPos>) -> Self {
        Self { history }
    }

    /// Would stepping onto `pos` revisit a recent position?
    #[must_use]
    pub fn rejects(&self, pos: GridPos) -> bool {
        self.history.contains(&pos)
    }

    /// Accept `candidate` if it is a legal, fresh single step; otherwise pick the best
    /// other cardinal neighbour of `start`, nearest to `goal` first.
    ///
    /// Returns `None` when every neighbour is illegal or oscillating.
    #[must_use]
    pub fn vet(&self, view: &GridView<'_>, start: GridPos, candidate: GridPos, goal: GridPos) -> Option<GridPos> {
        if start.manhattan(candidate) == 1 && view.is_steppable(candidate) && !self.rejects(candidate) {
            return Some(candidate);
        }

        let mut alternatives: Vec<GridPos> = start
            .neighbors()
            .into_iter()
            .filter(|&pos| pos != candidate && view.is_steppable(pos) && !self.rejects(pos))
            .collect();
        // Stable sort keeps cardinal order on equal distance.
        alternatives.sort_by_key(|pos| pos.manhattan(goal));

        let chosen = alternatives.first().copied();
        tracing::debug!(?start, ?candidate, ?chosen, "Step rejected by oscillation guard");
        chosen
    }
}

/// Look for a two-cell hop over an adjacent living unit.
///
/// A hop is possible in a direction when the adjacent cell is occupied, the cell
/// beyond it is steppable, landing there strictly reduces the distance to `goal`,
/// and the landing cell is not in the guard's history. Directions are tried in
/// [`Direction::CARDINALS`] order. Endurance is the caller's concern.
#[must_use]
pub fn find_jump(view: &GridView<'_>, start: GridPos, goal: GridPos, guard: &OscillationGuard<'_>) -> Option<GridPos> {
    let current_distance = start.manhattan(goal);

    Direction::CARDINALS.iter().find_map(|dir| {
        let over = start.offset(dir.step());
        let landing = over.offset(dir.step());

        let hop = view.occupancy.is_occupied(over)
            && view.is_steppable(landing)
            && landing.manhattan(goal) < current_distance
            && !guard.rejects(landing);
        hop.then_some(landing)
    })
}
