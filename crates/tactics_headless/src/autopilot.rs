//! Autopilot: both sides driven by the decision engine.
//!
//! The AI side plays through [`Encounter::advance_ai`] as usual. The player side is played
//! by running the same decision engine for the active player unit and translating its
//! choice into ordinary player [`Command`]s, so every autopilot move goes through the same
//! legality checks a human controller would.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tactics_core::ai::{decide, AiContext};
use tactics_core::combatant::AiMemory;
use tactics_core::prelude::*;
use std::result::Result;

use crate::scenario::{Scenario, ScenarioError};

/// Encounter result as seen from the player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Every AI unit is dead.
    Victory,
    /// Every player unit is dead.
    Defeat,
    /// Both sides still have living units.
    Ongoing,
}

/// Classify the encounter.
#[must_use]
pub fn outcome(encounter: &Encounter) -> Outcome {
    if encounter.side(Side::Ai).all(Combatant::is_dead) {
        Outcome::Victory
    } else if encounter.side(Side::Player).all(Combatant::is_dead) {
        Outcome::Defeat
    } else {
        Outcome::Ongoing
    }
}

/// Plays the player side with the decision engine.
///
/// Keeps its own scratch memory per player unit so that oscillation history and flanking
/// state persist across turns, just as they do for AI units.
#[derive(Debug, Default)]
pub struct Autopilot {
    memories: BTreeMap<UnitId, AiMemory>,
    /// Round and unit of the turn in progress.
    active: Option<(u32, UnitId)>,
}

impl Autopilot {
    /// Create an autopilot with empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide and apply one action for the active player unit.
    ///
    /// Returns the action taken, or `None` outside the player phase. An action the
    /// encounter refuses is replaced by ending the unit's turn.
    pub fn step(&mut self, encounter: &mut Encounter) -> Option<AiAction> {
        if !encounter.state().is_player_phase() {
            return None;
        }
        let actor = encounter.active_unit()?.clone();

        let memory = self.memories.entry(actor.id).or_default();
        let turn = (encounter.round(), actor.id);
        if self.active != Some(turn) {
            memory.begin_turn();
            self.active = Some(turn);
        }

        let action = {
            let ctx = AiContext {
                grid: encounter.grid(),
                units: encounter.units(),
                config: encounter.config(),
            };
            decide(&ctx, &actor, memory)
        };

        let applied = commands_for(encounter, action)
            .into_iter()
            .all(|command| encounter.apply_command(command).is_applied());

        if applied {
            tracing::debug!(unit = %actor.id, ?action, "Autopilot acted");
            Some(action)
        } else {
            tracing::debug!(unit = %actor.id, ?action, "Autopilot action refused, ending turn");
            encounter.apply_command(Command::EndTurn);
            Some(AiAction::EndTurn)
        }
    }
}

/// Player commands that carry out `action` for the active unit.
fn commands_for(encounter: &Encounter, action: AiAction) -> Vec<Command> {
    match action {
        AiAction::EndTurn => vec![Command::EndTurn],
        AiAction::Move { to, .. } => vec![
            Command::SelectActionMode(ActionMode::Move),
            Command::SelectCell(to),
        ],
        AiAction::UseAbility { ability, target } => match encounter.unit(target) {
            Some(target) => vec![
                Command::SelectActionMode(ActionMode::Ability),
                Command::SelectAbility(ability),
                Command::SelectCell(target.position),
            ],
            None => vec![Command::EndTurn],
        },
    }
}

/// Summary of one autopilot run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// How it ended.
    pub outcome: Outcome,
    /// Round reached.
    pub rounds: u32,
    /// Actions taken by player units, turn ends included.
    pub player_actions: u32,
    /// AI moves and ability uses.
    pub ai_actions: u32,
    /// Living units per side at the end: (player, ai).
    pub survivors: (usize, usize),
    /// State hash at the start of every round, then the final hash.
    pub hashes: Vec<u64>,
}

impl SimulationReport {
    /// Hash of the final state.
    #[must_use]
    pub fn final_hash(&self) -> u64 {
        self.hashes.last().copied().unwrap_or_default()
    }
}

/// Run `encounter` with both sides on autopilot until one side is wiped out or the round
/// counter passes `max_rounds`.
pub fn simulate(encounter: &mut Encounter, max_rounds: u32) -> SimulationReport {
    let mut autopilot = Autopilot::new();
    let mut player_actions = 0;
    let mut ai_actions = 0;
    let mut hashes = vec![encounter.state_hash()];

    let mut round = encounter.round();

    while outcome(encounter) == Outcome::Ongoing && encounter.round() <= max_rounds {
        if encounter.state().is_player_phase() {
            if autopilot.step(encounter).is_some() {
                player_actions += 1;
            }
        } else if let AiStep::Acted { .. } = encounter.advance_ai() {
            ai_actions += 1;
        }

        // A round can close on either side's action.
        if encounter.round() != round {
            round = encounter.round();
            hashes.push(encounter.state_hash());
        }
    }

    hashes.push(encounter.state_hash());
    let alive = |side| encounter.side(side).filter(|u| !u.is_dead()).count();
    let report = SimulationReport {
        outcome: outcome(encounter),
        rounds: encounter.round(),
        player_actions,
        ai_actions,
        survivors: (alive(Side::Player), alive(Side::Ai)),
        hashes,
    };
    tracing::info!(
        outcome = ?report.outcome,
        rounds = report.rounds,
        player_actions = report.player_actions,
        ai_actions = report.ai_actions,
        "Simulation finished"
    );
    report
}

/// Run the scenario `runs` times and check that every run is identical.
pub fn verify_determinism(
    scenario: &Scenario,
    runs: u32,
    max_rounds: u32,
) -> Result<bool, ScenarioError> {
    let expected = simulate(&mut scenario.build_encounter()?, max_rounds);
    for run in 1..runs {
        let report = simulate(&mut scenario.build_encounter()?, max_rounds);
        if report != expected {
            tracing::error!(
                run,
                expected = expected.final_hash(),
                actual = report.final_hash(),
                "Determinism violation"
            );
            return Ok(false);
        }
    }
    Ok(true)
}
