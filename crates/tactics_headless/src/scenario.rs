//! Scenario loading and configuration.
//!
//! Scenarios define the starting state of an encounter: the map, both rosters and
//! optional engine tuning. They are written in RON and map one-to-one onto
//! [`EncounterSetup`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tactics_core::prelude::*;
use std::result::Result;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario parsed but cannot start an encounter.
    #[error("Invalid scenario '{name}': {source}")]
    Invalid {
        /// Scenario name.
        name: String,
        /// What the core rejected.
        source: GameError,
    },
}

/// Names accepted by [`Scenario::builtin`].
pub const BUILTIN_SCENARIOS: [&str; 2] = ["training_grounds", "kennel"];

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Terrain rows, `.` ground and `#` wall.
    pub map: Vec<String>,
    /// Player units in roster order.
    pub party: Vec<UnitSetup>,
    /// AI units in roster order.
    pub enemies: Vec<UnitSetup>,
    /// Engine tuning; defaults apply when omitted.
    #[serde(default)]
    pub config: EngineConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::training_grounds()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Look up a built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "training_grounds" => Some(Self::training_grounds()),
            "kennel" => Some(Self::kennel()),
            _ => None,
        }
    }

    /// Resolve a CLI argument: a built-in name first, otherwise a file path.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => Ok(scenario),
            None => Self::load(name_or_path),
        }
    }

    /// The setup handed to the core.
    #[must_use]
    pub fn setup(&self) -> EncounterSetup {
        EncounterSetup {
            map: self.map.clone(),
            party: self.party.clone(),
            enemies: self.enemies.clone(),
            config: self.config.clone(),
        }
    }

    /// Start a fresh encounter from this scenario.
    pub fn build_encounter(&self) -> Result<Encounter, ScenarioError> {
        Encounter::from_setup(&self.setup()).map_err(|source| ScenarioError::Invalid {
            name: self.name.clone(),
            source,
        })
    }

    /// Check that the scenario can start an encounter.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.build_encounter().map(|_| ())
    }

    /// Two heroes against two dogs across an open field with a little cover.
    #[must_use]
    pub fn training_grounds() -> Self {
        Self {
            name: "training_grounds".to_string(),
            description: "Zash and Domli face two dogs across an open field".to_string(),
            map: rows(&[
                "....................",
                "....................",
                "....................",
                "....................",
                ".........##.........",
                ".........##.........",
                ".........##.........",
                ".........##.........",
                ".........##.........",
                "....................",
                "...#................",
                "...#................",
                "....................",
                "....................",
            ]),
            party: vec![
                domli(GridPos::new(3, 3)),
                zash(GridPos::new(5, 5)),
            ],
            enemies: vec![dog(GridPos::new(15, 11)), dog(GridPos::new(17, 11))],
            config: EngineConfig::default(),
        }
    }

    /// Two dogs break out of a walled kennel and try to work around the heroes.
    #[must_use]
    pub fn kennel() -> Self {
        Self {
            name: "kennel".to_string(),
            description: "A flanking dog and a circling dog rush out of their kennel".to_string(),
            map: rows(&[
                "........................",
                "........................",
                "..................######",
                "..................#.....",
                "..................#.....",
                "........................",
                "........................",
                "..................#.....",
                "..................#.....",
                "..................######",
                "........................",
                "......##................",
                "........................",
                "........................",
            ]),
            party: vec![
                zash(GridPos::new(4, 9)),
                domli(GridPos::new(3, 7)),
            ],
            enemies: vec![
                dog(GridPos::new(20, 5)).with_strategy(MovementStrategy::Flanking),
                dog(GridPos::new(20, 6)).with_strategy(MovementStrategy::Circling),
            ],
            config: EngineConfig::default(),
        }
    }
}

fn rows(rows: &[&str]) -> Vec<String> {
    rows.iter().map(|row| (*row).to_string()).collect()
}

/// Frontline fighter: 30 hp, 2 endurance, a heavy melee cleave.
#[must_use]
pub fn zash(position: GridPos) -> UnitSetup {
    UnitSetup::new("Zash", position, 30.0, 2).with_ability("Skysplitter Cleave", 10.0, 1, 1)
}

/// Healer: 20 hp, 3 endurance, heals 5 at range 3.
#[must_use]
pub fn domli(position: GridPos) -> UnitSetup {
    UnitSetup::new("Domli", position, 20.0, 3).with_ability("Healing Ray", -5.0, 3, 1)
}

/// Basic enemy: 10 hp, 1 endurance, a weak bite.
#[must_use]
pub fn dog(position: GridPos) -> UnitSetup {
    UnitSetup::new("Dog", position, 10.0, 1).with_ability("Bite", 5.0, 1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_are_valid() {
        for name in BUILTIN_SCENARIOS {
            let scenario = Scenario::builtin(name).unwrap();
            assert_eq!(scenario.name, name);
            scenario.validate().unwrap();
        }
        assert!(Scenario::builtin("nope").is_none());
    }

    #[test]
    fn test_archetypes() {
        let zash = zash(GridPos::new(0, 0));
        assert_eq!(zash.max_endurance, 2);
        assert_eq!(zash.abilities[0].name, "Skysplitter Cleave");

        let domli = domli(GridPos::new(0, 0));
        assert!(domli.abilities[0].power < Fixed::ZERO);
        assert_eq!(domli.abilities[0].range, 3);

        assert_eq!(dog(GridPos::new(0, 0)).max_health, Fixed::from_num(10));
    }

    #[test]
    fn test_training_grounds_layout() {
        let encounter = Scenario::training_grounds().build_encounter().unwrap();
        assert_eq!(encounter.grid().width(), 20);
        assert_eq!(encounter.grid().height(), 14);
        assert_eq!(encounter.side(Side::Player).count(), 2);
        assert_eq!(encounter.side(Side::Ai).count(), 2);
        assert_eq!(encounter.active_unit().unwrap().name, "Domli");
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                map: ["....", "...."],
                party: [
                    (name: "Hero", position: (x: 0, y: 0), max_health: 12.5, max_endurance: 2),
                ],
                enemies: [
                    (
                        name: "Rat",
                        position: (x: 3, y: 1),
                        max_health: 4.0,
                        max_endurance: 1,
                        abilities: [(name: "Gnaw", power: 1.5, range: 1, cost: 1)],
                        strategy: Cautious,
                    ),
                ],
                config: (cautious_distance: 3),
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert!(scenario.description.is_empty());
        assert_eq!(scenario.party[0].max_health, Fixed::from_num(12.5));
        assert_eq!(scenario.enemies[0].strategy, MovementStrategy::Cautious);
        assert_eq!(scenario.config.cautious_distance, 3);
        assert_eq!(scenario.config.flank_distance, EngineConfig::default().flank_distance);
        scenario.validate().unwrap();
    }

    #[test]
    fn test_invalid_scenario_reports_core_error() {
        let mut scenario = Scenario::training_grounds();
        scenario.party[0].position = GridPos::new(9, 4);

        let err = scenario.validate().unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Invalid {
                source: GameError::UnitOnWall { .. },
                ..
            }
        ));
        assert!(err.to_string().contains("training_grounds"));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kennel.ron");
        let scenario = Scenario::kennel();
        std::fs::write(
            &path,
            ron::ser::to_string_pretty(&scenario, ron::ser::PrettyConfig::default()).unwrap(),
        )
        .unwrap();

        assert_eq!(Scenario::load(&path).unwrap(), scenario);
        assert_eq!(Scenario::resolve(path.to_str().unwrap()).unwrap(), scenario);
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::resolve("does/not/exist.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_bundled_scenario_files_parse() {
        let scenario =
            Scenario::from_ron_str(include_str!("../scenarios/crossroads.ron")).unwrap();
        scenario.validate().unwrap();
    }
}
