//! Property tests for the search engines and ability resolution.

use proptest::prelude::*;
use tactics_core::combat::resolve;
use tactics_core::grid::{GridView, Occupancy};
use tactics_core::pathfinding::{find_path, next_step};
use tactics_core::prelude::*;
use tactics_test_utils::determinism::strategies::{
    arb_ability, arb_grid, arb_health, arb_pos, arb_power, arb_strategy,
};
use tactics_test_utils::fixtures::UnitBuilder;

const W: i32 = 10;
const H: i32 = 8;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn movement_costs_are_shortest_admissible_paths(
        grid in arb_grid(W as usize, H as usize),
        origin in arb_pos(W, H),
        enemy in arb_pos(W, H),
        budget in 0u32..8,
    ) {
        prop_assume!(grid.is_walkable(origin) && enemy != origin);
        let units = vec![UnitBuilder::new(9, Side::Ai, enemy).build()];
        let occupancy = Occupancy::from_units(&units);
        let view = GridView::new(&grid, &occupancy);

        let cells = reachable(&view, origin, budget, ReachMode::Movement { side: Side::Player });
        prop_assert_eq!(cells.get(&origin), Some(&0));

        for (&cell, &cost) in &cells {
            prop_assert!(cost <= budget);
            prop_assert!(grid.is_walkable(cell));
            prop_assert!(cell != enemy);
            let path = find_path(&grid, origin, cell, |p| p != enemy).unwrap();
            prop_assert_eq!(path.len() as u32 - 1, cost);
        }
    }

    #[test]
    fn targeting_ignores_terrain_and_units(
        grid in arb_grid(W as usize, H as usize),
        origin in arb_pos(W, H),
        range in 0u32..6,
    ) {
        let units = vec![UnitBuilder::new(9, Side::Ai, origin).build()];
        let occupancy = Occupancy::from_units(&units);
        let cells = reachable(&GridView::new(&grid, &occupancy), origin, range, ReachMode::Targeting);

        for x in 0..W {
            for y in 0..H {
                let cell = GridPos::new(x, y);
                let in_range = origin.manhattan(cell) <= range;
                prop_assert_eq!(cells.contains_key(&cell), in_range);
                if in_range {
                    prop_assert_eq!(cells[&cell], origin.manhattan(cell));
                }
            }
        }
    }

    #[test]
    fn next_step_never_enters_walls_or_blocked_cells(
        grid in arb_grid(W as usize, H as usize),
        start in arb_pos(W, H),
        goal in arb_pos(W, H),
        blocked in proptest::collection::vec(arb_pos(W, H), 0..8),
    ) {
        if let Some(step) = next_step(&grid, start, goal, &blocked) {
            prop_assert_eq!(step.manhattan(start), 1);
            prop_assert!(grid.is_walkable(step));
            prop_assert!(step == goal || !blocked.contains(&step));
        }
    }

    #[test]
    fn resolution_clamps_health_and_death_is_final(
        health in arb_health(),
        hits in proptest::collection::vec(arb_power(), 1..10),
    ) {
        let attacker = Combatant::new(
            UnitId(1),
            Side::Player,
            "Attacker",
            GridPos::new(0, 0),
            Fixed::from_num(10),
            hits.len() as u32,
            hits.iter().map(|&power| Ability::new("Hit", power, 1, 1)).collect(),
        );
        let target = UnitBuilder::new(2, Side::Ai, GridPos::new(1, 0)).health(health).build();
        let mut units = vec![attacker, target];
        let grid = TerrainGrid::new(2, 1);
        let legal = {
            let occupancy = Occupancy::from_units(&units);
            reachable(&GridView::new(&grid, &occupancy), GridPos::new(0, 0), 1, ReachMode::Targeting)
        };
        let mut was_dead = false;

        for index in 0..hits.len() {
            let result = resolve(&mut units, 0, index, 1, &legal);
            let target = &units[1];

            prop_assert!(target.health() >= Fixed::ZERO);
            prop_assert!(target.health() <= target.max_health());
            prop_assert_eq!(target.is_dead(), target.health() == Fixed::ZERO);
            if target.is_dead() {
                prop_assert_eq!(target.endurance(), 0);
            }
            if was_dead {
                prop_assert_eq!(result, Err(Rejection::TargetDead(UnitId(2))));
            } else {
                prop_assert!(result.is_ok());
            }
            was_dead = target.is_dead();
        }
    }

    #[test]
    fn unaffordable_abilities_change_nothing(ability in arb_ability(), endurance in 0u32..3) {
        prop_assume!(ability.cost > endurance);
        let broke = Combatant::new(
            UnitId(1),
            Side::Player,
            "Broke",
            GridPos::new(0, 0),
            Fixed::from_num(10),
            endurance,
            vec![ability.clone()],
        );
        let mut units = vec![broke, UnitBuilder::new(2, Side::Ai, GridPos::new(1, 0)).build()];
        let before = units.clone();
        let grid = TerrainGrid::new(2, 1);
        let occupancy = Occupancy::from_units(&units);
        let legal = reachable(&GridView::new(&grid, &occupancy), GridPos::new(0, 0), ability.range, ReachMode::Targeting);

        let result = resolve(&mut units, 0, 0, 1, &legal);
        prop_assert_eq!(
            result,
            Err(Rejection::Unaffordable { cost: ability.cost, available: endurance })
        );
        prop_assert_eq!(units, before);
    }

    #[test]
    fn ai_phase_finishes_with_only_able_units_in_control(
        grid in arb_grid(W as usize, H as usize),
        hero in arb_pos(W, H),
        pack in proptest::collection::vec((arb_pos(W, H), arb_strategy()), 1..4),
        rounds in 1u32..4,
    ) {
        let mut units = vec![UnitBuilder::new(1, Side::Player, hero).health(50).build()];
        for (i, &(position, strategy)) in pack.iter().enumerate() {
            units.push(
                UnitBuilder::new(i as u32 + 2, Side::Ai, position)
                    .ability("Bite", 3, 1, 1)
                    .strategy(strategy)
                    .build(),
            );
        }
        let encounter = Encounter::new(grid, units, EngineConfig::default());
        prop_assume!(encounter.is_ok());
        let mut encounter = encounter.unwrap();

        for _ in 0..rounds {
            while encounter.state().is_player_phase() {
                encounter.apply_command(Command::EndTurn);
            }
            let round = encounter.round();
            let mut steps = 0;
            while encounter.round() == round {
                steps += 1;
                prop_assert!(steps <= 16, "AI phase did not finish");

                let step = encounter.advance_ai();
                prop_assert_ne!(&step, &AiStep::Idle);
                if let AiStep::Acted { action: AiAction::Move { to, .. }, .. } = &step {
                    prop_assert!(encounter.grid().is_walkable(*to));
                }
                if let TurnState::AiPhase { .. } = encounter.state() {
                    let active = encounter.active_unit().unwrap();
                    prop_assert_eq!(active.side, Side::Ai);
                    prop_assert!(active.can_act());
                }
            }
        }
    }
}
