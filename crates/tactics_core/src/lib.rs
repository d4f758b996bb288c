//! # Tactics Core
//!
//! Deterministic simulation core for grid-based, turn-based tactics encounters.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! Presentation, input decoding and level loading live with the consumer, which feeds
//! [`turn::Command`]s in and reads [`turn::UnitUpdate`]s back.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Terrain, occupancy snapshots and cell coordinates
//! - [`combatant`] - Units, abilities and their resource rules
//! - [`reachability`] - Budgeted flood fill for movement and targeting
//! - [`pathfinding`] - A*, oscillation guard and jumps
//! - [`ai`] - Decision engine and movement strategies
//! - [`combat`] - Ability resolution
//! - [`turn`] - Turn state and command vocabulary
//! - [`encounter`] - The turn engine tying it all together
//! - [`config`] - Tunable thresholds
//! - [`math`] - Fixed-point helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod combat;
pub mod combatant;
pub mod config;
pub mod encounter;
pub mod error;
pub mod grid;
pub mod math;
pub mod pathfinding;
pub mod reachability;
pub mod turn;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiAction, StepPlan};
    pub use crate::combatant::{Ability, Combatant, MovementStrategy, Side, UnitId};
    pub use crate::config::EngineConfig;
    pub use crate::encounter::{AbilitySetup, Encounter, EncounterSetup, UnitSetup};
    pub use crate::error::{GameError, Result};
    pub use crate::grid::{Direction, GridPos, Terrain, TerrainGrid};
    pub use crate::math::Fixed;
    pub use crate::reachability::{reachable, CostMap, ReachMode};
    pub use crate::turn::{
        ActionMode, AiStep, Command, CommandOutcome, Rejection, TurnState, UnitUpdate,
    };
}
