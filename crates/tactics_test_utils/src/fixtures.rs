//! Test fixtures and helpers.
//!
//! Pre-built grids, units and encounters for consistent testing.

use fixed::types::I32F32;
use serde::de::DeserializeOwned;
use tactics_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for [`GridPos::new`].
#[must_use]
pub const fn pos(x: i32, y: i32) -> GridPos {
    GridPos::new(x, y)
}

/// Parse grid rows, panicking on malformed input.
///
/// # Panics
///
/// Panics if the rows are not a valid map.
#[must_use]
pub fn grid(rows: &[&str]) -> TerrainGrid {
    TerrainGrid::from_rows(rows).expect("fixture grid must parse")
}

/// A single row of ground cells with a wall row beneath: the classic corridor.
#[must_use]
pub fn corridor(length: usize) -> TerrainGrid {
    let floor = ".".repeat(length);
    let wall = "#".repeat(length);
    grid(&[floor.as_str(), wall.as_str()])
}

/// Parse any RON fixture.
///
/// # Panics
///
/// Panics if the text does not deserialize.
#[must_use]
pub fn from_ron<T: DeserializeOwned>(text: &str) -> T {
    ron::from_str(text).expect("fixture RON must parse")
}

/// Builder for test combatants.
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    id: u32,
    side: Side,
    name: String,
    position: GridPos,
    health: Fixed,
    endurance: u32,
    abilities: Vec<Ability>,
    strategy: MovementStrategy,
}

impl UnitBuilder {
    /// A 10 hp, 2 endurance unit with no abilities.
    #[must_use]
    pub fn new(id: u32, side: Side, position: GridPos) -> Self {
        Self {
            id,
            side,
            name: format!("unit{id}"),
            position,
            health: fixed(10),
            endurance: 2,
            abilities: Vec::new(),
            strategy: MovementStrategy::Direct,
        }
    }

    /// Set the name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set max health.
    #[must_use]
    pub fn health(mut self, health: i32) -> Self {
        self.health = fixed(health);
        self
    }

    /// Set max endurance.
    #[must_use]
    pub fn endurance(mut self, endurance: u32) -> Self {
        self.endurance = endurance;
        self
    }

    /// Add an ability.
    #[must_use]
    pub fn ability(mut self, name: &str, power: i32, range: u32, cost: u32) -> Self {
        self.abilities
            .push(Ability::new(name, fixed(power), range, cost));
        self
    }

    /// Set the movement strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: MovementStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Build the combatant.
    #[must_use]
    pub fn build(self) -> Combatant {
        Combatant::new(
            UnitId(self.id),
            self.side,
            self.name,
            self.position,
            self.health,
            self.endurance,
            self.abilities,
        )
        .with_strategy(self.strategy)
    }
}

/// Melee hero: 30 hp, 2 endurance, 10 damage at range 1.
#[must_use]
pub fn swordsman(name: &str, position: GridPos) -> UnitSetup {
    UnitSetup::new(name, position, 30.0, 2).with_ability("Cleave", 10.0, 1, 1)
}

/// Support hero: 20 hp, 3 endurance, heals 5 at range 3.
#[must_use]
pub fn healer(name: &str, position: GridPos) -> UnitSetup {
    UnitSetup::new(name, position, 20.0, 3).with_ability("Mend", -5.0, 3, 1)
}

/// Weak melee enemy: 10 hp, 1 endurance, 5 damage at range 1.
#[must_use]
pub fn hound(position: GridPos) -> UnitSetup {
    UnitSetup::new("Hound", position, 10.0, 1).with_ability("Bite", 5.0, 1, 1)
}

/// Two heroes against three hounds on an open 12x8 field with a short wall.
#[must_use]
pub fn skirmish() -> EncounterSetup {
    EncounterSetup {
        map: vec![
            "............".into(),
            "............".into(),
            ".....#......".into(),
            ".....#......".into(),
            ".....#......".into(),
            "............".into(),
            "............".into(),
            "............".into(),
        ],
        party: vec![
            swordsman("Swordsman", pos(1, 3)),
            healer("Healer", pos(0, 5)),
        ],
        enemies: vec![
            hound(pos(10, 2)),
            hound(pos(10, 5)).with_strategy(MovementStrategy::Flanking),
            hound(pos(11, 7)).with_strategy(MovementStrategy::Circling),
        ],
        config: EngineConfig::default(),
    }
}

/// Build the [`skirmish`] encounter.
///
/// # Panics
///
/// Panics if the fixture is invalid.
#[must_use]
pub fn skirmish_encounter() -> Encounter {
    Encounter::from_setup(&skirmish()).expect("skirmish fixture must be valid")
}

/// Play one full round with a passive party: every player unit ends its turn, then the AI
/// phase runs to completion.
pub fn pass_round(encounter: &mut Encounter) {
    while encounter.state().is_player_phase() {
        encounter.apply_command(Command::EndTurn);
    }
    encounter.run_ai_phase();
}
