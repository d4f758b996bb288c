//! Error types for the tactics core.
//!
//! Only encounter construction can fail. Once an [`Encounter`](crate::encounter::Encounter)
//! exists, illegal player commands come back as [`Rejection`](crate::turn::Rejection) values
//! and the AI always has a fallback, so nothing inside the running engine returns
//! [`GameError`].

use thiserror::Error;

use crate::combatant::UnitId;
use crate::grid::GridPos;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for encounter setup and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Grid has no rows or no columns.
    #[error("Grid must have at least one row and one column")]
    EmptyGrid,

    /// Grid rows have different lengths.
    #[error("Grid row {row} has {found} cells, expected {expected}")]
    RaggedGrid {
        /// Offending row index.
        row: usize,
        /// Expected row width.
        expected: usize,
        /// Actual row width.
        found: usize,
    },

    /// Unknown terrain glyph in a grid row.
    #[error("Unknown terrain glyph '{glyph}' at ({x}, {y})")]
    UnknownTerrain {
        /// The glyph that could not be classified.
        glyph: char,
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },

    /// The player roster is empty.
    #[error("Encounter needs at least one player unit")]
    EmptyPlayerRoster,

    /// A unit starts outside the grid.
    #[error("Unit '{name}' starts outside the grid at {pos}")]
    UnitOutOfBounds {
        /// Unit name.
        name: String,
        /// Starting position.
        pos: GridPos,
    },

    /// A unit starts on a wall.
    #[error("Unit '{name}' starts on a wall at {pos}")]
    UnitOnWall {
        /// Unit name.
        name: String,
        /// Starting position.
        pos: GridPos,
    },

    /// Two units start on the same cell.
    #[error("Units {first} and {second} both start at {pos}")]
    StackedUnits {
        /// First unit on the cell.
        first: UnitId,
        /// Second unit on the cell.
        second: UnitId,
        /// Shared position.
        pos: GridPos,
    },

    /// A saved encounter does not describe a reachable state.
    #[error("Saved encounter is inconsistent: {0}")]
    InconsistentSave(&'static str),

    /// A unit was configured with non-positive maximum health.
    #[error("Unit '{0}' must have positive max health")]
    NonPositiveHealth(String),

    /// An ability would cost nothing, which lets an AI unit act forever.
    #[error("Ability '{ability}' of unit '{unit}' must cost at least 1 endurance")]
    FreeAbility {
        /// Owning unit name.
        unit: String,
        /// Ability name.
        ability: String,
    },

    /// Engine configuration value out of range.
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}
