//! Ability resolution.
//!
//! Applies one unit's ability to another. Health changes go through
//! [`Combatant::take_hit`], which owns the clamping and death rules.

use crate::combatant::Combatant;
use crate::reachability::CostMap;
use crate::turn::{Rejection, UnitUpdate};

/// Use `units[user]`'s ability `ability` on `units[target]`.
///
/// `legal` is the user's targeting set for this ability. `user` and `target` may be the
/// same index (self-healing). On failure nothing is mutated. On success the user pays the
/// ability cost and the returned updates list the user, then the target if distinct.
///
/// # Errors
///
/// - [`Rejection::NoSuchAbility`] if the user has no such ability.
/// - [`Rejection::TargetDead`] if the target has died.
/// - [`Rejection::IllegalCell`] if the target stands outside `legal`.
/// - [`Rejection::Unaffordable`] if the user lacks endurance.
pub fn resolve(
    units: &mut [Combatant],
    user: usize,
    ability: usize,
    target: usize,
    legal: &CostMap,
) -> Result<Vec<UnitUpdate>, Rejection> {
    let (power, cost, name) = {
        let chosen = units[user]
            .abilities()
            .get(ability)
            .ok_or(Rejection::NoSuchAbility(ability))?;
        (chosen.power, chosen.cost, chosen.name.clone())
    };

    let victim = &units[target];
    if victim.is_dead() {
        return Err(Rejection::TargetDead(victim.id));
    }
    if !legal.contains_key(&victim.position) {
        return Err(Rejection::IllegalCell(victim.position));
    }

    let available = units[user].endurance();
    if !units[user].spend_endurance(cost) {
        return Err(Rejection::Unaffordable { cost, available });
    }

    let killed = units[target].take_hit(power);
    tracing::debug!(
        user = %units[user].id,
        target = %units[target].id,
        ability = %name,
        health = %units[target].health(),
        killed,
        "Ability resolved"
    );

    let mut updates = vec![UnitUpdate::from(&units[user])];
    if target != user {
        updates.push(UnitUpdate::from(&units[target]));
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{Ability, Side, UnitId};
    use crate::grid::{GridPos, GridView, Occupancy, TerrainGrid};
    use crate::math::Fixed;
    use crate::reachability::{reachable, ReachMode};

    fn fighter(id: u32, side: Side, x: i32, health: i32, endurance: u32, ability: Ability) -> Combatant {
        Combatant::new(
            UnitId(id),
            side,
            format!("unit{id}"),
            GridPos::new(x, 0),
            Fixed::from_num(health),
            endurance,
            vec![ability],
        )
    }

    fn targets(units: &[Combatant], user: usize, range: u32) -> CostMap {
        let grid = TerrainGrid::new(8, 1);
        let occupancy = Occupancy::from_units(units);
        reachable(
            &GridView::new(&grid, &occupancy),
            units[user].position,
            range,
            ReachMode::Targeting,
        )
    }

    #[test]
    fn test_lethal_hit() {
        let bite = Ability::new("Bite", Fixed::from_num(5), 1, 1);
        let mut units = vec![
            fighter(1, Side::Player, 0, 10, 1, bite.clone()),
            fighter(2, Side::Ai, 1, 3, 1, bite),
        ];
        let legal = targets(&units, 0, 1);

        let updates = resolve(&mut units, 0, 0, 1, &legal).unwrap();

        assert_eq!(units[0].endurance(), 0);
        assert_eq!(units[1].health(), Fixed::ZERO);
        assert!(units[1].is_dead());
        assert_eq!(units[1].endurance(), 0);
        assert_eq!(updates.len(), 2);
        assert!(!updates[1].alive);
    }

    #[test]
    fn test_healing_is_capped() {
        let ray = Ability::new("Ray", Fixed::from_num(-5), 3, 1);
        let mut units = vec![
            fighter(1, Side::Player, 0, 20, 3, ray.clone()),
            fighter(2, Side::Player, 2, 10, 3, ray),
        ];
        units[1].take_hit(Fixed::from_num(3));
        let legal = targets(&units, 0, 3);

        resolve(&mut units, 0, 0, 1, &legal).unwrap();
        assert_eq!(units[1].health(), Fixed::from_num(10));
        assert_eq!(units[0].endurance(), 2);
    }

    #[test]
    fn test_self_target_reports_once() {
        let ray = Ability::new("Ray", Fixed::from_num(-5), 3, 1);
        let mut units = vec![fighter(1, Side::Player, 0, 20, 3, ray)];
        units[0].take_hit(Fixed::from_num(8));
        let legal = targets(&units, 0, 3);

        let updates = resolve(&mut units, 0, 0, 0, &legal).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(units[0].health(), Fixed::from_num(17));
    }

    #[test]
    fn test_failures_leave_state_untouched() {
        let cleave = Ability::new("Cleave", Fixed::from_num(10), 1, 2);
        let mut units = vec![
            fighter(1, Side::Player, 0, 30, 1, cleave.clone()),
            fighter(2, Side::Ai, 1, 10, 1, cleave.clone()),
            fighter(3, Side::Ai, 5, 10, 1, cleave),
        ];
        let before = units.clone();
        let legal = targets(&units, 0, 1);

        // Unaffordable
        assert_eq!(
            resolve(&mut units, 0, 0, 1, &legal),
            Err(Rejection::Unaffordable { cost: 2, available: 1 })
        );
        // Out of range
        assert_eq!(
            resolve(&mut units, 0, 0, 2, &legal),
            Err(Rejection::IllegalCell(GridPos::new(5, 0)))
        );
        // Unknown ability
        assert_eq!(
            resolve(&mut units, 0, 4, 1, &legal),
            Err(Rejection::NoSuchAbility(4))
        );
        assert_eq!(units, before);
    }

    #[test]
    fn test_dead_target_rejected() {
        let bite = Ability::new("Bite", Fixed::from_num(5), 1, 1);
        let mut units = vec![
            fighter(1, Side::Player, 0, 10, 2, bite.clone()),
            fighter(2, Side::Ai, 1, 3, 1, bite),
        ];
        units[1].take_hit(Fixed::from_num(99));
        let legal = targets(&units, 0, 1);
        let before = units.clone();

        assert_eq!(
            resolve(&mut units, 0, 0, 1, &legal),
            Err(Rejection::TargetDead(UnitId(2)))
        );
        assert_eq!(units, before);
    }
}
