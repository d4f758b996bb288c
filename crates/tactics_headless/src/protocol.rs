//! JSON protocol for headless encounter control.
//!
//! The runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** player commands from the controller
//! **Output (stdout):** applied changes, rejections and turn changes
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready",...}` followed by the first `phase`
//! 2. Controller sends commands for the active player unit
//! 3. Runner answers every command with `updates` or `rejected`, and `phase` on handover
//! 4. After the player phase the AI acts; each AI action is reported as `updates`
//! 5. When one side is wiped out, outputs `{"type":"game_over","result":"victory"|"defeat"}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"training_grounds","round":1}
//! <- {"type":"phase","phase":"player","round":1,"unit":1}
//! -> {"cmd":"select_cell","x":4,"y":3}
//! <- {"type":"updates","units":[{"id":1,"x":4,"y":3,"health":20.0,"endurance":2,"alive":true}]}
//! -> {"cmd":"select_mode","mode":"ability"}
//! <- {"type":"updates","units":[]}
//! -> {"cmd":"end_turn"}
//! <- {"type":"updates","units":[]}
//! <- {"type":"phase","phase":"player","round":1,"unit":2}
//! -> {"cmd":"query"}
//! <- {"type":"state","round":1,...}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tactics_core::prelude::*;
use std::result::Result;

/// Error type for protocol input.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The line is not a known command.
    #[error("Malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The line holds nothing but whitespace.
    #[error("Empty command line")]
    Empty,
}

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Switch between moving and using abilities.
    SelectMode { mode: ModeName },

    /// Act on a cell in the current mode.
    SelectCell { x: i32, y: i32 },

    /// Choose which ability Ability mode uses.
    SelectAbility { index: usize },

    /// Hand control to the next unit.
    EndTurn,

    /// Report the full encounter state without changing it.
    Query,

    /// Stop the runner.
    Quit,
}

/// Wire name of an [`ActionMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeName {
    Move,
    Ability,
}

impl From<ModeName> for ActionMode {
    fn from(mode: ModeName) -> Self {
        match mode {
            ModeName::Move => Self::Move,
            ModeName::Ability => Self::Ability,
        }
    }
}

impl From<ActionMode> for ModeName {
    fn from(mode: ActionMode) -> Self {
        match mode {
            ActionMode::Move => Self::Move,
            ActionMode::Ability => Self::Ability,
        }
    }
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        scenario: String,
        round: u32,
    },

    /// Units changed by a command or an AI action.
    Updates {
        /// The AI unit that acted, absent for player commands.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        actor: Option<u32>,
        units: Vec<UnitUpdateOutput>,
    },

    /// A command was refused or could not be parsed. Nothing changed.
    Rejected {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        cmd: Option<String>,
    },

    /// Full encounter state.
    State {
        round: u32,
        turn: TurnOutput,
        units: Vec<UnitState>,
        legal_cells: Vec<[i32; 2]>,
        hash: u64,
    },

    /// Control passed to another unit or side.
    Phase {
        phase: PhaseName,
        round: u32,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        unit: Option<u32>,
    },

    /// One side has been wiped out.
    GameOver { result: GameResult, round: u32 },
}

// ============================================================================
// State Types
// ============================================================================

/// A [`UnitUpdate`] with health as a plain number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitUpdateOutput {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub health: f64,
    pub endurance: u32,
    pub alive: bool,
}

impl From<&UnitUpdate> for UnitUpdateOutput {
    fn from(update: &UnitUpdate) -> Self {
        Self {
            id: update.id.0,
            x: update.position.x,
            y: update.position.y,
            health: update.health.to_num(),
            endurance: update.endurance,
            alive: update.alive,
        }
    }
}

/// Everything a controller needs to know about one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub id: u32,
    pub name: String,
    pub side: SideName,
    pub x: i32,
    pub y: i32,
    pub health: f64,
    pub max_health: f64,
    pub endurance: u32,
    pub max_endurance: u32,
    pub alive: bool,
    pub abilities: Vec<String>,
    pub selected_ability: usize,
}

impl From<&Combatant> for UnitState {
    fn from(unit: &Combatant) -> Self {
        Self {
            id: unit.id.0,
            name: unit.name.clone(),
            side: unit.side.into(),
            x: unit.position.x,
            y: unit.position.y,
            health: unit.health().to_num(),
            max_health: unit.max_health().to_num(),
            endurance: unit.endurance(),
            max_endurance: unit.max_endurance(),
            alive: !unit.is_dead(),
            abilities: unit.abilities().iter().map(|a| a.name.clone()).collect(),
            selected_ability: unit.selected_ability_index(),
        }
    }
}

/// Wire name of a [`Side`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideName {
    Player,
    Ai,
}

impl From<Side> for SideName {
    fn from(side: Side) -> Self {
        match side {
            Side::Player => Self::Player,
            Side::Ai => Self::Ai,
        }
    }
}

/// Whose turn it is, with the active unit's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutput {
    pub phase: PhaseName,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<ModeName>,
}

/// Phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Player,
    Ai,
}

/// How the encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Victory,
    Defeat,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(scenario: &str, round: u32) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            scenario: scenario.to_string(),
            round,
        }
    }

    /// Updates caused by a player command.
    pub fn updates(updates: &[UnitUpdate]) -> Self {
        Self::Updates {
            actor: None,
            units: updates.iter().map(UnitUpdateOutput::from).collect(),
        }
    }

    /// Updates caused by an AI action.
    pub fn ai_updates(actor: UnitId, updates: &[UnitUpdate]) -> Self {
        Self::Updates {
            actor: Some(actor.0),
            units: updates.iter().map(UnitUpdateOutput::from).collect(),
        }
    }

    /// Create a rejection.
    pub fn rejected(reason: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Rejected {
            reason: reason.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Snapshot of the whole encounter.
    pub fn state(encounter: &Encounter) -> Self {
        Self::State {
            round: encounter.round(),
            turn: turn_output(encounter),
            units: encounter.units().iter().map(UnitState::from).collect(),
            legal_cells: encounter
                .legal_cells()
                .keys()
                .map(|pos| [pos.x, pos.y])
                .collect(),
            hash: encounter.state_hash(),
        }
    }

    /// The current phase and active unit.
    pub fn phase(encounter: &Encounter) -> Self {
        let turn = turn_output(encounter);
        Self::Phase {
            phase: turn.phase,
            round: encounter.round(),
            unit: turn.unit,
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"rejected","reason":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

fn turn_output(encounter: &Encounter) -> TurnOutput {
    let unit = encounter.active_unit().map(|u| u.id.0);
    match encounter.state() {
        TurnState::PlayerPhase { mode, .. } => TurnOutput {
            phase: PhaseName::Player,
            unit,
            mode: Some(mode.into()),
        },
        TurnState::AiPhase { .. } => TurnOutput {
            phase: PhaseName::Ai,
            unit,
            mode: None,
        },
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let json = json.trim();
        if json.is_empty() {
            return Err(ProtocolError::Empty);
        }
        Ok(serde_json::from_str(json)?)
    }

    /// The core command, or `None` for runner-level commands.
    pub fn to_core(&self) -> Option<tactics_core::turn::Command> {
        use tactics_core::turn::Command as Core;
        match *self {
            Self::SelectMode { mode } => Some(Core::SelectActionMode(mode.into())),
            Self::SelectCell { x, y } => Some(Core::SelectCell(GridPos::new(x, y))),
            Self::SelectAbility { index } => Some(Core::SelectAbility(index)),
            Self::EndTurn => Some(Core::EndTurn),
            Self::Query | Self::Quit => None,
        }
    }

    /// Get command name for rejections.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectMode { .. } => "select_mode",
            Self::SelectCell { .. } => "select_cell",
            Self::SelectAbility { .. } => "select_ability",
            Self::EndTurn => "end_turn",
            Self::Query => "query",
            Self::Quit => "quit",
        }
    }
}
