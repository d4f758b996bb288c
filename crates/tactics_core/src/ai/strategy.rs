//! Movement strategies.
//!
//! Each [`MovementStrategy`] turns "where am I, where is my target" into a [`StepPlan`]. All of
//! them share the path engine; the returned step is a suggestion that the caller still runs
//! through the oscillation guard.

use crate::combatant::{AiMemory, MovementStrategy};
use crate::config::EngineConfig;
use crate::grid::{GridPos, GridView, Step};
use crate::pathfinding::{step_toward, OscillationGuard};

/// What a strategy wants to do this action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPlan {
    /// Step onto `step` on the way to `goal`.
    Advance {
        /// Adjacent cell to enter.
        step: GridPos,
        /// Where the unit is ultimately heading.
        goal: GridPos,
    },
    /// Stay put and end the turn.
    Hold,
}

impl StepPlan {
    fn toward(view: &GridView<'_>, start: GridPos, goal: GridPos) -> Self {
        step_toward(view, start, goal).map_or(Self::Hold, |step| Self::Advance { step, goal })
    }
}

impl MovementStrategy {
    /// Plan the next step from `start` toward a unit standing at `target`.
    ///
    /// Flanking strategies update `memory.diving`; no other state is touched.
    pub fn plan(
        self,
        view: &GridView<'_>,
        config: &EngineConfig,
        start: GridPos,
        target: GridPos,
        memory: &mut AiMemory,
    ) -> StepPlan {
        match self {
            Self::Direct => StepPlan::toward(view, start, target),
            Self::Flanking => flank(view, config, start, target, memory, true),
            Self::Circling => flank(view, config, start, target, memory, false),
            Self::Cautious => keep_distance(view, config, start, target, memory),
        }
    }
}

/// Approach to the flank distance, dive in once, then work around the target's side.
fn flank(
    view: &GridView<'_>,
    config: &EngineConfig,
    start: GridPos,
    target: GridPos,
    memory: &mut AiMemory,
    counter_clockwise_first: bool,
) -> StepPlan {
    let distance = start.manhattan(target);
    let threshold = config.flank_distance;

    if distance > threshold {
        memory.diving = true;
        return unvisited(StepPlan::toward(view, start, target), memory);
    }

    if distance == threshold {
        if memory.diving {
            memory.diving = false;
            return StepPlan::Hold;
        }
        memory.diving = true;
        return unvisited(StepPlan::toward(view, start, target), memory);
    }

    memory.diving = false;

    let base = start.direction_to(target);
    let sides: [Step; 2] = if counter_clockwise_first {
        [base.rotated_ccw(), base.rotated_cw()]
    } else {
        [base.rotated_cw(), base.rotated_ccw()]
    };

    for &k in &config.flank_offsets {
        for side in sides {
            let flank_cell = target.offset(side.scaled(k));
            if flank_cell == start || !view.is_steppable(flank_cell) {
                continue;
            }
            if let Some(step) = step_toward(view, start, flank_cell) {
                if !memory.visited.contains(&step) {
                    return StepPlan::Advance {
                        step,
                        goal: flank_cell,
                    };
                }
            }
        }
    }

    unvisited(StepPlan::toward(view, start, target), memory)
}

fn unvisited(plan: StepPlan, memory: &AiMemory) -> StepPlan {
    match plan {
        StepPlan::Advance { step, .. } if memory.visited.contains(&step) => StepPlan::Hold,
        other => other,
    }
}

/// Hold at the ideal distance, back off when too close, close in when too far.
fn keep_distance(
    view: &GridView<'_>,
    config: &EngineConfig,
    start: GridPos,
    target: GridPos,
    memory: &AiMemory,
) -> StepPlan {
    let distance = start.manhattan(target);
    let ideal = config.cautious_distance;

    if distance > ideal {
        return StepPlan::toward(view, start, target);
    }
    if distance == ideal || start == target {
        return StepPlan::Hold;
    }

    let away = target.direction_to(start);
    let candidates: Vec<Step> = if away.dx != 0 && away.dy != 0 {
        // Diagonal: either axis component still increases the distance.
        vec![Step::new(away.dx, 0), Step::new(0, away.dy)]
    } else {
        vec![away, away.rotated_ccw(), away.rotated_cw()]
    };

    let guard = OscillationGuard::new(&memory.history);
    candidates
        .into_iter()
        .map(|step| start.offset(step))
        .find(|&cell| view.is_steppable(cell) && !guard.rejects(cell))
        .map_or(StepPlan::Hold, |cell| StepPlan::Advance {
            step: cell,
            goal: cell,
        })
}
