//! AI decision engine.
//!
//! [`decide`] picks one action for one AI-driven unit: use an ability if something is in
//! range, otherwise move (jump, then strategy, then oscillation guard), otherwise end the
//! turn. It reads the board through an [`AiContext`] and writes only to the unit's own
//! [`AiMemory`].

pub mod strategy;

use serde::{Deserialize, Serialize};

use crate::combatant::{AiMemory, Combatant, UnitId};
use crate::config::EngineConfig;
use crate::grid::{GridPos, GridView, Occupancy, TerrainGrid};
use crate::pathfinding::{find_jump, OscillationGuard};

pub use strategy::StepPlan;

/// One AI action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiAction {
    /// Use ability `ability` on `target`.
    UseAbility {
        /// Index into the unit's ability list.
        ability: usize,
        /// Unit to hit or heal.
        target: UnitId,
    },
    /// Move to `to`, spending `cost` endurance.
    Move {
        /// Destination cell.
        to: GridPos,
        /// Endurance spent.
        cost: u32,
    },
    /// Stop acting this round.
    EndTurn,
}

/// Read-only view of the board for decision making.
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    /// Static terrain.
    pub grid: &'a TerrainGrid,
    /// Every unit in the encounter, in roster order.
    pub units: &'a [Combatant],
    /// Thresholds.
    pub config: &'a EngineConfig,
}

impl<'a> AiContext<'a> {
    /// Nearest living unit matching `filter`, ties broken by roster order.
    fn nearest<F>(&self, from: GridPos, filter: F) -> Option<&'a Combatant>
    where
        F: Fn(&Combatant) -> bool,
    {
        self.units
            .iter()
            .filter(|&u| !u.is_dead() && filter(u))
            .min_by_key(|u| from.manhattan(u.position))
    }
}

/// Decide the next action for `actor`.
///
/// `memory` is the actor's scratch state, passed separately so that `ctx.units` can stay
/// borrowed while it is updated. The current position is always pushed onto the history.
#[must_use]
pub fn decide(ctx: &AiContext<'_>, actor: &Combatant, memory: &mut AiMemory) -> AiAction {
    let start = actor.position;
    memory.record(start, ctx.config.history_len);

    if actor.is_dead() || actor.endurance() == 0 {
        return AiAction::EndTurn;
    }

    let opponent = actor.side.opponent();
    let Some(target) = ctx.nearest(start, |u| u.side == opponent) else {
        tracing::debug!(unit = %actor.id, "No opponents left");
        return AiAction::EndTurn;
    };

    if let Some(action) = pick_ability(ctx, actor) {
        tracing::debug!(unit = %actor.id, ?action, "AI uses ability");
        return action;
    }

    let occupancy = Occupancy::from_units(ctx.units);
    let view = GridView::new(ctx.grid, &occupancy);

    let action = pick_move(ctx, &view, actor, target.position, memory);
    if let AiAction::Move { to, .. } = action {
        memory.visited.insert(to);
    }
    tracing::debug!(unit = %actor.id, ?action, strategy = ?actor.strategy, "AI decision");
    action
}

/// First affordable ability, in list order, with a valid target in range.
///
/// Damaging abilities go for the nearest opponent. Healing abilities go for the nearest
/// wounded ally, the actor included.
fn pick_ability(ctx: &AiContext<'_>, actor: &Combatant) -> Option<AiAction> {
    let start = actor.position;
    let opponent = actor.side.opponent();

    actor
        .abilities()
        .iter()
        .enumerate()
        .filter(|(_, ability)| ability.cost <= actor.endurance())
        .find_map(|(index, ability)| {
            let target = if ability.is_healing() {
                ctx.nearest(start, |u| u.side == actor.side && u.health() < u.max_health())
            } else {
                ctx.nearest(start, |u| u.side == opponent)
            }?;
            (start.manhattan(target.position) <= ability.range).then_some(AiAction::UseAbility {
                ability: index,
                target: target.id,
            })
        })
}

fn pick_move(
    ctx: &AiContext<'_>,
    view: &GridView<'_>,
    actor: &Combatant,
    target: GridPos,
    memory: &mut AiMemory,
) -> AiAction {
    let start = actor.position;
    let jump_cost = ctx.config.jump_cost;

    if actor.endurance() >= jump_cost {
        let guard = OscillationGuard::new(&memory.history);
        if let Some(to) = find_jump(view, start, target, &guard) {
            return AiAction::Move { to, cost: jump_cost };
        }
    }

    let plan = actor.strategy.plan(view, ctx.config, start, target, memory);
    let StepPlan::Advance { step, goal } = plan else {
        return AiAction::EndTurn;
    };

    let guard = OscillationGuard::new(&memory.history);
    let Some(to) = guard.vet(view, start, step, goal) else {
        return AiAction::EndTurn;
    };

    let cost = start.manhattan(to);
    if cost > actor.endurance() {
        return AiAction::EndTurn;
    }
    AiAction::Move { to, cost }
}
