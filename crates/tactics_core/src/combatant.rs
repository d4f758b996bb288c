//! Entity model: combatants and their abilities.
//!
//! Components are plain data. The only behavior here is resource bookkeeping:
//! taking a hit, spending and restoring endurance, and the death rule.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::GridPos;
use crate::math::{clamp_fixed, fixed_serde, Fixed};

/// Stable unit identifier, unique within an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which side controls a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Commanded through player input.
    Player,
    /// Driven by the decision engine.
    Ai,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Ai,
            Self::Ai => Self::Player,
        }
    }
}

/// How an AI-driven unit approaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementStrategy {
    /// Path straight at the nearest target.
    #[default]
    Direct,
    /// Hold at the flank distance, dive in, then work around to the target's side.
    Flanking,
    /// Flanking that swings around the opposite side.
    Circling,
    /// Keep a fixed distance from the target.
    Cautious,
}

/// Immutable ability descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    /// Display name.
    pub name: String,
    /// Positive damages, negative heals.
    #[serde(with = "fixed_serde")]
    pub power: Fixed,
    /// Maximum Manhattan distance to the target.
    pub range: u32,
    /// Endurance spent per use.
    pub cost: u32,
}

impl Ability {
    /// Create a new ability.
    #[must_use]
    pub fn new(name: impl Into<String>, power: Fixed, range: u32, cost: u32) -> Self {
        Self {
            name: name.into(),
            power,
            range,
            cost,
        }
    }

    /// Negative power restores health.
    #[must_use]
    pub fn is_healing(&self) -> bool {
        self.power < Fixed::ZERO
    }
}

/// Per-unit scratch state used by the decision engine.
///
/// Owned by the unit so that nothing leaks between units or encounters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiMemory {
    /// Recent decision positions, oldest first.
    pub history: VecDeque<GridPos>,
    /// Set while a flanking unit is committed to its dive.
    pub diving: bool,
    /// Cells entered during the current turn.
    pub visited: BTreeSet<GridPos>,
}

impl AiMemory {
    /// Push a position, dropping the oldest beyond `capacity`.
    pub fn record(&mut self, pos: GridPos, capacity: usize) {
        self.history.push_back(pos);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }

    /// Was this cell visited recently?
    #[must_use]
    pub fn recently_visited(&self, pos: GridPos) -> bool {
        self.history.contains(&pos)
    }

    /// Reset per-turn state.
    pub fn begin_turn(&mut self) {
        self.visited.clear();
    }
}

/// A unit on the board.
///
/// Invariants: `0 <= health <= max_health`, dead iff `health == 0`, and a dead unit
/// always has zero endurance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Stable identifier.
    pub id: UnitId,
    /// Controlling side.
    pub side: Side,
    /// Display name.
    pub name: String,
    /// Current cell.
    pub position: GridPos,
    #[serde(with = "fixed_serde")]
    health: Fixed,
    #[serde(with = "fixed_serde")]
    max_health: Fixed,
    endurance: u32,
    max_endurance: u32,
    abilities: Vec<Ability>,
    selected_ability: usize,
    dead: bool,
    /// Movement personality when driven by the decision engine.
    pub strategy: MovementStrategy,
    /// Decision engine scratch state.
    pub memory: AiMemory,
}

impl Combatant {
    /// Create a unit at full health and endurance.
    #[must_use]
    pub fn new(
        id: UnitId,
        side: Side,
        name: impl Into<String>,
        position: GridPos,
        max_health: Fixed,
        max_endurance: u32,
        abilities: Vec<Ability>,
    ) -> Self {
        Self {
            id,
            side,
            name: name.into(),
            position,
            health: max_health,
            max_health,
            endurance: max_endurance,
            max_endurance,
            abilities,
            selected_ability: 0,
            dead: false,
            strategy: MovementStrategy::default(),
            memory: AiMemory::default(),
        }
    }

    /// Builder method to set the movement strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: MovementStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> Fixed {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> Fixed {
        self.max_health
    }

    /// Current endurance.
    #[must_use]
    pub const fn endurance(&self) -> u32 {
        self.endurance
    }

    /// Maximum endurance.
    #[must_use]
    pub const fn max_endurance(&self) -> u32 {
        self.max_endurance
    }

    /// Abilities in priority order.
    #[must_use]
    pub fn abilities(&self) -> &[Ability] {
        &self.abilities
    }

    /// Index of the selected ability.
    #[must_use]
    pub const fn selected_ability_index(&self) -> usize {
        self.selected_ability
    }

    /// The selected ability, if the unit has any.
    #[must_use]
    pub fn selected_ability(&self) -> Option<&Ability> {
        self.abilities.get(self.selected_ability)
    }

    /// Select an ability by index. Returns `false` if there is no such ability.
    pub fn select_ability(&mut self, index: usize) -> bool {
        if index < self.abilities.len() {
            self.selected_ability = index;
            true
        } else {
            false
        }
    }

    /// Dead units stay dead for the rest of the encounter.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Alive and with endurance left.
    #[must_use]
    pub const fn can_act(&self) -> bool {
        !self.dead && self.endurance > 0
    }

    /// Apply a signed amount: positive damages, negative heals.
    ///
    /// Returns `true` if this hit killed the unit.
    pub fn take_hit(&mut self, amount: Fixed) -> bool {
        if self.dead {
            return false;
        }
        self.health = clamp_fixed(
            self.health.saturating_sub(amount),
            Fixed::ZERO,
            self.max_health,
        );
        if self.health == Fixed::ZERO {
            self.dead = true;
            self.endurance = 0;
            return true;
        }
        false
    }

    /// Spend endurance. Returns `false` and changes nothing if unaffordable.
    pub fn spend_endurance(&mut self, amount: u32) -> bool {
        if self.endurance < amount {
            return false;
        }
        self.endurance -= amount;
        true
    }

    /// Refill endurance at the start of a round. Dead units stay at zero.
    pub fn restore_endurance(&mut self) {
        if !self.dead {
            self.endurance = self.max_endurance;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(health: i32, endurance: u32) -> Combatant {
        Combatant::new(
            UnitId(1),
            Side::Player,
            "Tester",
            GridPos::new(0, 0),
            Fixed::from_num(health),
            endurance,
            vec![Ability::new("Poke", Fixed::from_num(1), 1, 1)],
        )
    }

    #[test]
    fn test_starts_full() {
        let u = unit(10, 3);
        assert_eq!(u.health(), Fixed::from_num(10));
        assert_eq!(u.endurance(), 3);
        assert!(!u.is_dead());
        assert_eq!(u.selected_ability().map(|a| a.name.as_str()), Some("Poke"));
    }

    #[test]
    fn test_damage_and_heal_clamp() {
        let mut u = unit(10, 3);
        assert!(!u.take_hit(Fixed::from_num(4)));
        assert_eq!(u.health(), Fixed::from_num(6));

        // Overheal clamps to max
        u.take_hit(Fixed::from_num(-20));
        assert_eq!(u.health(), Fixed::from_num(10));
    }

    #[test]
    fn test_death_zeroes_endurance_and_sticks() {
        let mut u = unit(3, 3);
        assert!(u.take_hit(Fixed::from_num(5)));
        assert!(u.is_dead());
        assert_eq!(u.health(), Fixed::ZERO);
        assert_eq!(u.endurance(), 0);

        // No resurrection, no refill
        assert!(!u.take_hit(Fixed::from_num(-5)));
        assert_eq!(u.health(), Fixed::ZERO);
        u.restore_endurance();
        assert_eq!(u.endurance(), 0);
    }

    #[test]
    fn test_non_lethal_hit_keeps_endurance() {
        let mut u = unit(10, 3);
        u.take_hit(Fixed::from_num(9.5));
        assert!(!u.is_dead());
        assert_eq!(u.endurance(), 3);
    }

    #[test]
    fn test_spend_endurance() {
        let mut u = unit(10, 2);
        assert!(!u.spend_endurance(3));
        assert_eq!(u.endurance(), 2);
        assert!(u.spend_endurance(2));
        assert_eq!(u.endurance(), 0);
        assert!(!u.can_act());
        u.restore_endurance();
        assert_eq!(u.endurance(), 2);
    }

    #[test]
    fn test_select_ability() {
        let mut u = unit(10, 2);
        assert!(!u.select_ability(1));
        assert_eq!(u.selected_ability_index(), 0);
        assert!(u.select_ability(0));
    }

    #[test]
    fn test_memory_is_bounded() {
        let mut memory = AiMemory::default();
        for x in 0..6 {
            memory.record(GridPos::new(x, 0), 4);
        }
        assert_eq!(memory.history.len(), 4);
        assert!(!memory.recently_visited(GridPos::new(1, 0)));
        assert!(memory.recently_visited(GridPos::new(5, 0)));
    }
}
