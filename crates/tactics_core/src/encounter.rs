//! The encounter: board, rosters and the turn engine.
//!
//! An [`Encounter`] owns every combatant and the [`TurnState`]. It is driven from outside:
//! player input through [`Encounter::apply_command`], the AI phase through
//! [`Encounter::advance_ai`] (one action per call) or [`Encounter::run_ai_phase`] (batch).
//!
//! # Determinism
//!
//! - No floating-point math in the simulation (health uses [`Fixed`])
//! - No randomness
//! - Units act in roster order and every search iterates neighbours in a fixed order
//!
//! Two encounters built from the same setup and fed the same commands always produce the
//! same [`Encounter::state_hash`].
//!
//! # Example
//!
//! ```
//! use tactics_core::prelude::*;
//!
//! let setup = EncounterSetup {
//!     map: vec!["......".into(), "......".into()],
//!     party: vec![UnitSetup::new("Hero", GridPos::new(0, 0), 10.0, 2)],
//!     enemies: vec![UnitSetup::new("Dog", GridPos::new(5, 1), 5.0, 1)],
//!     config: EngineConfig::default(),
//! };
//! let mut encounter = Encounter::from_setup(&setup).unwrap();
//!
//! let outcome = encounter.apply_command(Command::SelectCell(GridPos::new(2, 0)));
//! assert!(outcome.is_applied());
//! assert!(!encounter.state().is_player_phase());
//!
//! encounter.run_ai_phase();
//! assert_eq!(encounter.round(), 2);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::{decide, AiAction, AiContext};
use crate::combat::resolve;
use crate::combatant::{Ability, Combatant, MovementStrategy, Side, UnitId};
use crate::config::EngineConfig;
use crate::error::{GameError, Result};
use crate::grid::{GridPos, GridView, Occupancy, TerrainGrid};
use crate::math::{fixed_decimal_serde, Fixed};
use crate::reachability::{reachable, CostMap, ReachMode};
use crate::turn::{ActionMode, AiStep, Command, CommandOutcome, Rejection, TurnState, UnitUpdate};

/// Ability as written in encounter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilitySetup {
    /// Display name.
    pub name: String,
    /// Positive damages, negative heals.
    #[serde(with = "fixed_decimal_serde")]
    pub power: Fixed,
    /// Manhattan reach.
    pub range: u32,
    /// Endurance per use.
    pub cost: u32,
}

impl From<&AbilitySetup> for Ability {
    fn from(setup: &AbilitySetup) -> Self {
        Ability::new(setup.name.clone(), setup.power, setup.range, setup.cost)
    }
}

/// One unit as written in encounter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSetup {
    /// Display name.
    pub name: String,
    /// Starting cell.
    pub position: GridPos,
    /// Starting and maximum health.
    #[serde(with = "fixed_decimal_serde")]
    pub max_health: Fixed,
    /// Endurance restored each round.
    pub max_endurance: u32,
    /// Abilities in priority order.
    #[serde(default)]
    pub abilities: Vec<AbilitySetup>,
    /// Movement personality when AI-driven.
    #[serde(default)]
    pub strategy: MovementStrategy,
}

impl UnitSetup {
    /// A unit without abilities using the default strategy.
    #[must_use]
    pub fn new(name: impl Into<String>, position: GridPos, max_health: f64, max_endurance: u32) -> Self {
        Self {
            name: name.into(),
            position,
            max_health: Fixed::from_num(max_health),
            max_endurance,
            abilities: Vec::new(),
            strategy: MovementStrategy::default(),
        }
    }

    /// Builder method to add an ability.
    #[must_use]
    pub fn with_ability(mut self, name: impl Into<String>, power: f64, range: u32, cost: u32) -> Self {
        self.abilities.push(AbilitySetup {
            name: name.into(),
            power: Fixed::from_num(power),
            range,
            cost,
        });
        self
    }

    /// Builder method to set the movement strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: MovementStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn build(&self, id: UnitId, side: Side) -> Combatant {
        Combatant::new(
            id,
            side,
            self.name.clone(),
            self.position,
            self.max_health,
            self.max_endurance,
            self.abilities.iter().map(Ability::from).collect(),
        )
        .with_strategy(self.strategy)
    }
}

/// Everything needed to start an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSetup {
    /// Terrain rows, `.` ground and `#` wall.
    pub map: Vec<String>,
    /// Player-controlled units in roster order.
    pub party: Vec<UnitSetup>,
    /// AI-controlled units in roster order.
    pub enemies: Vec<UnitSetup>,
    /// Engine thresholds.
    #[serde(default)]
    pub config: EngineConfig,
}

/// A running encounter.
///
/// Deserializing re-runs the construction checks, so a saved encounter with bad rosters or
/// an out-of-range turn slot is rejected instead of loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SavedEncounter")]
pub struct Encounter {
    grid: TerrainGrid,
    units: Vec<Combatant>,
    /// Indices into `units` for each side, in roster order.
    player_roster: Vec<usize>,
    ai_roster: Vec<usize>,
    state: TurnState,
    round: u32,
    config: EngineConfig,
}

impl Encounter {
    /// Build an encounter from configuration.
    ///
    /// Party units get ids `1..`, enemies continue the sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the map does not parse or the units or config are invalid.
    pub fn from_setup(setup: &EncounterSetup) -> Result<Self> {
        let grid = TerrainGrid::from_rows(&setup.map)?;

        let party = setup.party.iter().map(|u| (u, Side::Player));
        let enemies = setup.enemies.iter().map(|u| (u, Side::Ai));
        let units = party
            .chain(enemies)
            .zip(1u32..)
            .map(|((unit, side), id)| unit.build(UnitId(id), side))
            .collect();

        Self::new(grid, units, setup.config.clone())
    }

    /// Build an encounter from ready-made combatants.
    ///
    /// # Errors
    ///
    /// - [`GameError::EmptyPlayerRoster`] without player units.
    /// - [`GameError::UnitOutOfBounds`] / [`GameError::UnitOnWall`] for bad positions.
    /// - [`GameError::StackedUnits`] when two living units share a cell.
    /// - [`GameError::NonPositiveHealth`] / [`GameError::FreeAbility`] for bad stats.
    /// - [`GameError::InvalidConfig`] for bad thresholds.
    pub fn new(grid: TerrainGrid, units: Vec<Combatant>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        validate_units(&grid, &units)?;

        let player_roster = side_roster(&units, Side::Player);
        let ai_roster = side_roster(&units, Side::Ai);
        if player_roster.is_empty() {
            return Err(GameError::EmptyPlayerRoster);
        }

        let mut encounter = Self {
            grid,
            units,
            player_roster,
            ai_roster,
            state: TurnState::PlayerPhase {
                unit: 0,
                mode: ActionMode::Move,
            },
            round: 1,
            config,
        };
        encounter.begin_player_phase();

        tracing::info!(
            players = encounter.player_roster.len(),
            enemies = encounter.ai_roster.len(),
            "Encounter started"
        );
        Ok(encounter)
    }

    /// Static terrain.
    #[must_use]
    pub const fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    /// All combatants, party first.
    #[must_use]
    pub fn units(&self) -> &[Combatant] {
        &self.units
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Combatant> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Units of one side in roster order.
    pub fn side(&self, side: Side) -> impl Iterator<Item = &Combatant> + '_ {
        self.roster(side).iter().map(move |&i| &self.units[i])
    }

    /// Current turn state.
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// Current round, starting at 1.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The unit whose turn it is, if any is alive.
    #[must_use]
    pub fn active_unit(&self) -> Option<&Combatant> {
        self.active_index().map(|i| &self.units[i])
    }

    fn roster(&self, side: Side) -> &[usize] {
        match side {
            Side::Player => &self.player_roster,
            Side::Ai => &self.ai_roster,
        }
    }

    fn active_index(&self) -> Option<usize> {
        match self.state {
            TurnState::PlayerPhase { unit, .. } => self.player_roster.get(unit).copied(),
            TurnState::AiPhase { unit } => self.ai_roster.get(unit).copied(),
        }
    }

    fn occupancy(&self) -> Occupancy {
        Occupancy::from_units(&self.units)
    }

    /// Cells the active player unit may select in its current mode, with their costs.
    ///
    /// Empty during the AI phase.
    #[must_use]
    pub fn legal_cells(&self) -> CostMap {
        let TurnState::PlayerPhase { mode, .. } = self.state else {
            return CostMap::new();
        };
        let Some(index) = self.active_index() else {
            return CostMap::new();
        };
        let unit = &self.units[index];
        match mode {
            ActionMode::Move => {
                self.reach(unit, unit.endurance(), ReachMode::Movement { side: unit.side })
            }
            ActionMode::Ability => unit
                .selected_ability()
                .map(|ability| self.reach(unit, ability.range, ReachMode::Targeting))
                .unwrap_or_default(),
        }
    }

    fn reach(&self, unit: &Combatant, budget: u32, mode: ReachMode) -> CostMap {
        let occupancy = self.occupancy();
        reachable(&GridView::new(&self.grid, &occupancy), unit.position, budget, mode)
    }

    /// Apply one player command.
    ///
    /// Illegal commands are rejected without changing anything.
    pub fn apply_command(&mut self, command: Command) -> CommandOutcome {
        let TurnState::PlayerPhase { unit: slot, mode } = self.state else {
            return CommandOutcome::Rejected(Rejection::NotPlayerPhase);
        };
        let Some(index) = self.active_index() else {
            return CommandOutcome::Rejected(Rejection::NotPlayerPhase);
        };

        let result = match command {
            Command::SelectActionMode(new_mode) => {
                if new_mode == ActionMode::Ability && self.units[index].abilities().is_empty() {
                    Err(Rejection::NoAbilities)
                } else {
                    self.state = TurnState::PlayerPhase {
                        unit: slot,
                        mode: new_mode,
                    };
                    Ok(Vec::new())
                }
            }
            Command::SelectAbility(ability) => {
                if self.units[index].select_ability(ability) {
                    Ok(Vec::new())
                } else {
                    Err(Rejection::NoSuchAbility(ability))
                }
            }
            Command::EndTurn => {
                tracing::debug!(unit = %self.units[index].id, "Player ended turn");
                self.advance_player_turn();
                Ok(Vec::new())
            }
            Command::SelectCell(pos) => match mode {
                ActionMode::Move => self.player_move(index, pos),
                ActionMode::Ability => self.player_ability(index, pos),
            },
        };

        match result {
            Ok(updates) => CommandOutcome::Applied(updates),
            Err(rejection) => {
                tracing::debug!(?command, %rejection, "Command rejected");
                CommandOutcome::Rejected(rejection)
            }
        }
    }

    fn player_move(
        &mut self,
        index: usize,
        pos: GridPos,
    ) -> std::result::Result<Vec<UnitUpdate>, Rejection> {
        let unit = &self.units[index];
        let legal = self.reach(unit, unit.endurance(), ReachMode::Movement { side: unit.side });

        let cost = match legal.get(&pos) {
            Some(&cost) if pos != unit.position => cost,
            _ => return Err(Rejection::IllegalCell(pos)),
        };
        if self.occupancy().is_occupied(pos) {
            return Err(Rejection::CellOccupied(pos));
        }

        let unit = &mut self.units[index];
        if !unit.spend_endurance(cost) {
            return Err(Rejection::Unaffordable {
                cost,
                available: unit.endurance(),
            });
        }
        unit.position = pos;
        tracing::debug!(unit = %unit.id, to = %pos, cost, "Player moved");

        let updates = vec![UnitUpdate::from(&*unit)];
        self.end_turn_if_exhausted(index);
        Ok(updates)
    }

    fn player_ability(
        &mut self,
        index: usize,
        pos: GridPos,
    ) -> std::result::Result<Vec<UnitUpdate>, Rejection> {
        let unit = &self.units[index];
        let ability_index = unit.selected_ability_index();
        let Some(ability) = unit.selected_ability() else {
            return Err(Rejection::NoAbilities);
        };
        let legal = self.reach(unit, ability.range, ReachMode::Targeting);
        if !legal.contains_key(&pos) {
            return Err(Rejection::IllegalCell(pos));
        }

        let target = self
            .units
            .iter()
            .position(|u| !u.is_dead() && u.position == pos)
            .ok_or(Rejection::NoTarget(pos))?;

        let updates = resolve(&mut self.units, index, ability_index, target, &legal)?;
        self.end_turn_if_exhausted(index);
        Ok(updates)
    }

    fn end_turn_if_exhausted(&mut self, index: usize) {
        if self.units[index].endurance() == 0 {
            self.advance_player_turn();
        }
    }

    /// Hand control to the next living player unit, or start the AI phase.
    fn advance_player_turn(&mut self) {
        let TurnState::PlayerPhase { unit: slot, .. } = self.state else {
            return;
        };
        let next = (slot + 1..self.player_roster.len())
            .find(|&s| !self.units[self.player_roster[s]].is_dead());

        match next {
            Some(next) => {
                self.state = TurnState::PlayerPhase {
                    unit: next,
                    mode: ActionMode::Move,
                };
                tracing::debug!(unit = %self.units[self.player_roster[next]].id, "Next player unit");
            }
            None => {
                tracing::debug!(round = self.round, "AI phase begins");
                self.activate_ai_from(0);
            }
        }
    }

    /// Activate the first living player unit, or go straight to the AI phase if there is none.
    ///
    /// With no living player unit and no AI unit able to act, the encounter parks in the AI
    /// phase with no active unit.
    fn begin_player_phase(&mut self) {
        let first = self
            .player_roster
            .iter()
            .position(|&i| !self.units[i].is_dead());
        match first {
            Some(slot) => {
                self.state = TurnState::PlayerPhase {
                    unit: slot,
                    mode: ActionMode::Move,
                };
            }
            None => {
                if !self.enter_ai_slot(0) {
                    self.state = TurnState::AiPhase {
                        unit: self.ai_roster.len(),
                    };
                }
            }
        }
    }

    /// Make the first AI unit at or after `from` that can act the active unit.
    ///
    /// Returns `false`, leaving the state untouched, when no such unit remains.
    fn enter_ai_slot(&mut self, from: usize) -> bool {
        let next = (from..self.ai_roster.len()).find(|&s| self.units[self.ai_roster[s]].can_act());
        let Some(slot) = next else {
            return false;
        };
        self.state = TurnState::AiPhase { unit: slot };
        let index = self.ai_roster[slot];
        self.units[index].memory.begin_turn();
        true
    }

    /// Hand the AI phase to the next unit that can act, or close the round.
    fn activate_ai_from(&mut self, slot: usize) {
        if !self.enter_ai_slot(slot) {
            self.finish_round();
        }
    }

    /// Execute exactly one AI action or one turn end.
    ///
    /// Afterwards the active unit is always a living AI unit with endurance left, or the
    /// phase is over: when no AI unit is left to act, every living unit's endurance is
    /// restored, the round counter increments and control returns to the first living
    /// player unit within the same call.
    pub fn advance_ai(&mut self) -> AiStep {
        let TurnState::AiPhase { unit: slot } = self.state else {
            return AiStep::Idle;
        };
        let Some(&index) = self.ai_roster.get(slot) else {
            return AiStep::Idle;
        };

        let mut memory = std::mem::take(&mut self.units[index].memory);
        let action = {
            let ctx = AiContext {
                grid: &self.grid,
                units: &self.units,
                config: &self.config,
            };
            decide(&ctx, &self.units[index], &mut memory)
        };
        self.units[index].memory = memory;

        let id = self.units[index].id;
        let updates = match action {
            AiAction::EndTurn => None,
            AiAction::Move { to, cost } => self.ai_move(index, to, cost),
            AiAction::UseAbility { ability, target } => self.ai_ability(index, ability, target),
        };

        match updates {
            Some(updates) => {
                if self.units[index].endurance() == 0 {
                    self.activate_ai_from(slot + 1);
                }
                AiStep::Acted {
                    unit: id,
                    action,
                    updates,
                }
            }
            None => {
                tracing::debug!(unit = %id, "AI unit ended turn");
                self.activate_ai_from(slot + 1);
                AiStep::TurnEnded { unit: id }
            }
        }
    }

    fn ai_move(&mut self, index: usize, to: GridPos, cost: u32) -> Option<Vec<UnitUpdate>> {
        let unit = &mut self.units[index];
        if !unit.spend_endurance(cost) {
            return None;
        }
        unit.position = to;
        Some(vec![UnitUpdate::from(&*unit)])
    }

    fn ai_ability(&mut self, index: usize, ability: usize, target: UnitId) -> Option<Vec<UnitUpdate>> {
        let target = self.units.iter().position(|u| u.id == target)?;
        let range = self.units[index].abilities().get(ability)?.range;
        let legal = self.reach(&self.units[index], range, ReachMode::Targeting);

        match resolve(&mut self.units, index, ability, target, &legal) {
            Ok(updates) => {
                self.units[index].select_ability(ability);
                Some(updates)
            }
            Err(rejection) => {
                tracing::debug!(%rejection, "AI ability failed");
                None
            }
        }
    }

    fn finish_round(&mut self) {
        for unit in &mut self.units {
            unit.restore_endurance();
        }
        self.round += 1;
        tracing::info!(round = self.round, "New round");
        self.begin_player_phase();
    }

    /// Drive [`advance_ai`](Self::advance_ai) until the current AI phase completes.
    ///
    /// Returns every step taken. Does nothing outside the AI phase.
    pub fn run_ai_phase(&mut self) -> Vec<AiStep> {
        let round = self.round;
        let mut steps = Vec::new();
        while self.round == round {
            match self.advance_ai() {
                AiStep::Idle => break,
                step => steps.push(step),
            }
        }
        steps
    }

    /// Calculate a hash of the observable encounter state.
    ///
    /// Two encounters with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.round.hash(&mut hasher);
        self.state.hash(&mut hasher);

        self.units.len().hash(&mut hasher);
        for unit in &self.units {
            unit.id.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.health().to_bits().hash(&mut hasher);
            unit.endurance().hash(&mut hasher);
            unit.is_dead().hash(&mut hasher);
            unit.selected_ability_index().hash(&mut hasher);

            // AI scratch state drives future decisions
            unit.memory.history.hash(&mut hasher);
            unit.memory.diving.hash(&mut hasher);
        }

        hasher.finish()
    }
}

/// Wire form of an [`Encounter`].
#[derive(Deserialize)]
struct SavedEncounter {
    grid: TerrainGrid,
    units: Vec<Combatant>,
    player_roster: Vec<usize>,
    ai_roster: Vec<usize>,
    state: TurnState,
    round: u32,
    config: EngineConfig,
}

impl TryFrom<SavedEncounter> for Encounter {
    type Error = GameError;

    fn try_from(saved: SavedEncounter) -> Result<Self> {
        saved.config.validate()?;
        validate_units(&saved.grid, &saved.units)?;

        if saved.player_roster != side_roster(&saved.units, Side::Player)
            || saved.ai_roster != side_roster(&saved.units, Side::Ai)
        {
            return Err(GameError::InconsistentSave("rosters do not match unit sides"));
        }
        if saved.player_roster.is_empty() {
            return Err(GameError::EmptyPlayerRoster);
        }

        // One past the AI roster is the parked state.
        let slot_ok = match saved.state {
            TurnState::PlayerPhase { unit, .. } => saved
                .player_roster
                .get(unit)
                .is_some_and(|&i| !saved.units[i].is_dead()),
            TurnState::AiPhase { unit } => match saved.ai_roster.get(unit) {
                Some(&i) => saved.units[i].can_act(),
                None => unit == saved.ai_roster.len(),
            },
        };
        if !slot_ok {
            return Err(GameError::InconsistentSave("active slot is not a unit that can act"));
        }

        Ok(Self {
            grid: saved.grid,
            units: saved.units,
            player_roster: saved.player_roster,
            ai_roster: saved.ai_roster,
            state: saved.state,
            round: saved.round,
            config: saved.config,
        })
    }
}

/// Indices of `side`'s units, in roster order.
fn side_roster(units: &[Combatant], side: Side) -> Vec<usize> {
    units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.side == side)
        .map(|(i, _)| i)
        .collect()
}

fn validate_units(grid: &TerrainGrid, units: &[Combatant]) -> Result<()> {
    for (i, unit) in units.iter().enumerate() {
        if !grid.in_bounds(unit.position) {
            return Err(GameError::UnitOutOfBounds {
                name: unit.name.clone(),
                pos: unit.position,
            });
        }
        if !grid.is_walkable(unit.position) {
            return Err(GameError::UnitOnWall {
                name: unit.name.clone(),
                pos: unit.position,
            });
        }
        if unit.max_health() <= Fixed::ZERO {
            return Err(GameError::NonPositiveHealth(unit.name.clone()));
        }
        if let Some(free) = unit.abilities().iter().find(|a| a.cost == 0) {
            return Err(GameError::FreeAbility {
                unit: unit.name.clone(),
                ability: free.name.clone(),
            });
        }
        let stacked = units[..i]
            .iter()
            .find(|o| !unit.is_dead() && !o.is_dead() && o.position == unit.position);
        if let Some(other) = stacked {
            return Err(GameError::StackedUnits {
                first: other.id,
                second: unit.id,
                pos: unit.position,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skirmish() -> EncounterSetup {
        EncounterSetup {
            map: vec!["........".into(), "........".into(), "........".into()],
            party: vec![
                UnitSetup::new("Zash", GridPos::new(0, 0), 30.0, 2).with_ability("Cleave", 10.0, 1, 1),
                UnitSetup::new("Domli", GridPos::new(0, 2), 20.0, 3).with_ability("Ray", -5.0, 3, 1),
            ],
            enemies: vec![UnitSetup::new("Dog", GridPos::new(7, 1), 10.0, 1).with_ability("Bite", 5.0, 1, 1)],
            config: EngineConfig::default(),
        }
    }

    #[test]
    fn test_initial_state() {
        let encounter = Encounter::from_setup(&skirmish()).unwrap();
        assert_eq!(
            encounter.state(),
            TurnState::PlayerPhase {
                unit: 0,
                mode: ActionMode::Move
            }
        );
        assert_eq!(encounter.round(), 1);
        assert_eq!(encounter.active_unit().map(|u| u.name.as_str()), Some("Zash"));
        assert_eq!(encounter.units()[2].id, UnitId(3));
        assert_eq!(encounter.side(Side::Ai).count(), 1);
    }

    #[test]
    fn test_setup_validation() {
        let mut setup = skirmish();
        setup.party.clear();
        assert_eq!(Encounter::from_setup(&setup).unwrap_err(), GameError::EmptyPlayerRoster);

        let mut setup = skirmish();
        setup.enemies[0].position = GridPos::new(0, 0);
        assert!(matches!(
            Encounter::from_setup(&setup),
            Err(GameError::StackedUnits { .. })
        ));

        let mut setup = skirmish();
        setup.enemies[0].position = GridPos::new(9, 1);
        assert!(matches!(
            Encounter::from_setup(&setup),
            Err(GameError::UnitOutOfBounds { .. })
        ));

        let mut setup = skirmish();
        setup.map[1] = ".......#".into();
        assert!(matches!(
            Encounter::from_setup(&setup),
            Err(GameError::UnitOnWall { .. })
        ));

        let mut setup = skirmish();
        setup.enemies[0].abilities[0].cost = 0;
        assert!(matches!(
            Encounter::from_setup(&setup),
            Err(GameError::FreeAbility { .. })
        ));

        let mut setup = skirmish();
        setup.config.history_len = 0;
        assert!(matches!(
            Encounter::from_setup(&setup),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_move_spends_endurance_and_hands_over() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();

        let outcome = encounter.apply_command(Command::SelectCell(GridPos::new(1, 0)));
        assert!(outcome.is_applied());
        assert_eq!(encounter.units()[0].endurance(), 1);
        assert!(matches!(encounter.state(), TurnState::PlayerPhase { unit: 0, .. }));

        encounter.apply_command(Command::SelectCell(GridPos::new(2, 0)));
        assert_eq!(encounter.units()[0].endurance(), 0);
        assert!(matches!(encounter.state(), TurnState::PlayerPhase { unit: 1, .. }));
    }

    #[test]
    fn test_illegal_commands_change_nothing() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        let before = encounter.state_hash();

        // Too far
        assert_eq!(
            encounter.apply_command(Command::SelectCell(GridPos::new(5, 0))),
            CommandOutcome::Rejected(Rejection::IllegalCell(GridPos::new(5, 0)))
        );
        // Own cell
        assert!(!encounter.apply_command(Command::SelectCell(GridPos::new(0, 0))).is_applied());
        // Unknown ability
        assert_eq!(
            encounter.apply_command(Command::SelectAbility(3)),
            CommandOutcome::Rejected(Rejection::NoSuchAbility(3))
        );
        // Nobody to hit
        encounter.apply_command(Command::SelectActionMode(ActionMode::Ability));
        assert_eq!(
            encounter.apply_command(Command::SelectCell(GridPos::new(1, 0))),
            CommandOutcome::Rejected(Rejection::NoTarget(GridPos::new(1, 0)))
        );
        encounter.apply_command(Command::SelectActionMode(ActionMode::Move));

        assert_eq!(encounter.state_hash(), before);
    }

    #[test]
    fn test_friendly_cell_is_traversable_but_not_selectable() {
        let mut setup = skirmish();
        setup.party[1].position = GridPos::new(1, 0);
        let mut encounter = Encounter::from_setup(&setup).unwrap();

        let legal = encounter.legal_cells();
        assert_eq!(legal.get(&GridPos::new(2, 0)), Some(&2));
        assert_eq!(
            encounter.apply_command(Command::SelectCell(GridPos::new(1, 0))),
            CommandOutcome::Rejected(Rejection::CellOccupied(GridPos::new(1, 0)))
        );
    }

    #[test]
    fn test_healing_an_ally() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        encounter.units[0].take_hit(Fixed::from_num(12));
        encounter.apply_command(Command::EndTurn);

        encounter.apply_command(Command::SelectActionMode(ActionMode::Ability));
        let outcome = encounter.apply_command(Command::SelectCell(GridPos::new(0, 0)));

        let CommandOutcome::Applied(updates) = outcome else {
            panic!("heal rejected");
        };
        assert_eq!(updates.len(), 2);
        assert_eq!(encounter.units()[0].health(), Fixed::from_num(23));
        assert_eq!(encounter.units()[1].endurance(), 2);
    }

    #[test]
    fn test_commands_rejected_during_ai_phase() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        encounter.apply_command(Command::EndTurn);
        encounter.apply_command(Command::EndTurn);
        assert_eq!(encounter.state(), TurnState::AiPhase { unit: 0 });
        assert!(encounter.legal_cells().is_empty());
        assert_eq!(
            encounter.apply_command(Command::EndTurn),
            CommandOutcome::Rejected(Rejection::NotPlayerPhase)
        );
    }

    #[test]
    fn test_ai_phase_round_trip() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        encounter.apply_command(Command::SelectCell(GridPos::new(2, 0)));
        encounter.apply_command(Command::EndTurn);

        let steps = encounter.run_ai_phase();
        assert!(matches!(steps.first(), Some(AiStep::Acted { .. })));

        assert_eq!(encounter.round(), 2);
        assert_eq!(
            encounter.state(),
            TurnState::PlayerPhase {
                unit: 0,
                mode: ActionMode::Move
            }
        );
        for unit in encounter.units() {
            assert_eq!(unit.endurance(), unit.max_endurance());
        }
    }

    #[test]
    fn test_exhausted_ai_units_are_skipped() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        encounter.units[2].spend_endurance(1);
        encounter.apply_command(Command::EndTurn);
        encounter.apply_command(Command::EndTurn);

        // The only AI unit cannot act, so the round closes on the handover itself.
        assert!(encounter.state().is_player_phase());
        assert_eq!(encounter.round(), 2);
        assert_eq!(encounter.units()[2].endurance(), 1);
        assert_eq!(encounter.advance_ai(), AiStep::Idle);
    }

    #[test]
    fn test_dead_player_units_are_never_active() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        encounter.units[1].take_hit(Fixed::from_num(100));
        encounter.apply_command(Command::EndTurn);

        // Domli is dead: straight to the AI phase.
        assert!(!encounter.state().is_player_phase());
        encounter.run_ai_phase();
        assert_eq!(encounter.active_unit().map(|u| u.id), Some(UnitId(1)));
    }

    #[test]
    fn test_wiped_party_keeps_ai_cycling() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        encounter.units[0].take_hit(Fixed::from_num(100));
        encounter.units[1].take_hit(Fixed::from_num(100));
        encounter.apply_command(Command::EndTurn);

        encounter.run_ai_phase();
        assert_eq!(encounter.round(), 2);
        assert_eq!(encounter.state(), TurnState::AiPhase { unit: 0 });
    }

    #[test]
    fn test_saved_encounter_is_checked_on_load() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        encounter.apply_command(Command::SelectCell(GridPos::new(1, 0)));

        let text = ron::to_string(&encounter).unwrap();
        let restored: Encounter = ron::from_str(&text).unwrap();
        assert_eq!(restored.state_hash(), encounter.state_hash());

        let mut bad_roster = encounter.clone();
        bad_roster.player_roster = vec![0, 5];
        let err = ron::from_str::<Encounter>(&ron::to_string(&bad_roster).unwrap()).unwrap_err();
        assert!(err.to_string().contains("rosters do not match"));

        let mut bad_slot = encounter.clone();
        bad_slot.state = TurnState::AiPhase { unit: 7 };
        assert!(ron::from_str::<Encounter>(&ron::to_string(&bad_slot).unwrap()).is_err());
    }

    #[test]
    fn test_corpses_do_not_count_as_stacked() {
        let mut encounter = Encounter::from_setup(&skirmish()).unwrap();
        encounter.units[2].take_hit(Fixed::from_num(100));
        encounter.units[2].position = GridPos::new(0, 0);

        let text = ron::to_string(&encounter).unwrap();
        assert!(ron::from_str::<Encounter>(&text).is_ok());
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let a = Encounter::from_setup(&skirmish()).unwrap();
        let mut b = Encounter::from_setup(&skirmish()).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());

        b.apply_command(Command::SelectCell(GridPos::new(1, 0)));
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
