//! Turn state and the command vocabulary of an encounter.
//!
//! Player input arrives as a [`Command`] and is answered with a [`CommandOutcome`]. Illegal
//! commands are not errors: they come back as [`CommandOutcome::Rejected`] with a
//! [`Rejection`] and leave the encounter untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::AiAction;
use crate::combatant::{Combatant, UnitId};
use crate::grid::GridPos;
use crate::math::{fixed_serde, Fixed};

/// What a selected cell means during the player phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionMode {
    /// Selecting a cell moves the active unit there.
    #[default]
    Move,
    /// Selecting a cell uses the selected ability on whoever stands there.
    Ability,
}

/// Whose turn it is.
///
/// `unit` is an index into the acting side's roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// A player unit is waiting for input.
    PlayerPhase {
        /// Roster slot of the active player unit.
        unit: usize,
        /// How the next selected cell is interpreted.
        mode: ActionMode,
    },
    /// AI units act one step at a time.
    AiPhase {
        /// Roster slot of the acting AI unit.
        unit: usize,
    },
}

impl TurnState {
    /// Is the player in control?
    #[must_use]
    pub const fn is_player_phase(&self) -> bool {
        matches!(self, Self::PlayerPhase { .. })
    }
}

/// Classified player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Switch between moving and using abilities.
    SelectActionMode(ActionMode),
    /// Act on a cell in the current mode.
    SelectCell(GridPos),
    /// Choose which ability Ability mode uses.
    SelectAbility(usize),
    /// Hand control to the next unit.
    EndTurn,
}

/// Presentation record for one unit after a mutating action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitUpdate {
    /// Which unit changed.
    pub id: UnitId,
    /// Where it stands now.
    pub position: GridPos,
    /// Health after the action.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Endurance after the action.
    pub endurance: u32,
    /// False once the unit has died.
    pub alive: bool,
}

impl From<&Combatant> for UnitUpdate {
    fn from(unit: &Combatant) -> Self {
        Self {
            id: unit.id,
            position: unit.position,
            health: unit.health(),
            endurance: unit.endurance(),
            alive: !unit.is_dead(),
        }
    }
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    /// Commands are only accepted while a player unit is active.
    #[error("Not the player's turn")]
    NotPlayerPhase,

    /// The cell is outside the active unit's legal set.
    #[error("Cell {0} is not a legal choice")]
    IllegalCell(GridPos),

    /// A living unit already stands on the destination.
    #[error("Cell {0} is occupied")]
    CellOccupied(GridPos),

    /// No living unit stands on the targeted cell.
    #[error("No target at {0}")]
    NoTarget(GridPos),

    /// The target has already died.
    #[error("Unit {0} is dead")]
    TargetDead(UnitId),

    /// The unit cannot pay for the action.
    #[error("Needs {cost} endurance, has {available}")]
    Unaffordable {
        /// Endurance required.
        cost: u32,
        /// Endurance left.
        available: u32,
    },

    /// Ability index out of range for the unit.
    #[error("No ability at index {0}")]
    NoSuchAbility(usize),

    /// The unit has no abilities at all.
    #[error("Unit has no abilities")]
    NoAbilities,
}

/// Answer to a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// The command took effect. Lists every unit whose observable state changed.
    Applied(Vec<UnitUpdate>),
    /// Nothing changed.
    Rejected(Rejection),
}

impl CommandOutcome {
    /// Did the command take effect?
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Result of one [`Encounter::advance_ai`](crate::encounter::Encounter::advance_ai) call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiStep {
    /// An AI unit moved or used an ability.
    Acted {
        /// Acting unit.
        unit: UnitId,
        /// What it did.
        action: AiAction,
        /// Units whose state changed.
        updates: Vec<UnitUpdate>,
    },
    /// An AI unit finished its turn without acting.
    TurnEnded {
        /// The unit whose turn ended.
        unit: UnitId,
    },
    /// Called outside the AI phase; nothing happened.
    Idle,
}
