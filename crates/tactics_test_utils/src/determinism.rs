//! Determinism testing utilities.
//!
//! Provides a harness for verifying that encounters produce identical results given
//! identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism to guard against:
//!
//! - **Floating-point math**: health and power use [`tactics_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Reachability results are `BTreeMap`s and units act in roster order.
//!
//! - **Search tie-breaks**: A* and flood fill expand neighbours in one fixed order and
//!   break equal priorities by coordinates.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual module determinism (pathing, strategies, etc.)
//! 2. **Property tests**: Random command sequences must still replay identically
//! 3. **Integration tests**: Full encounters are reproducible round by round
//! 4. **Parallel tests**: Running N encounters on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tactics_core::encounter::Encounter;

use crate::fixtures::pass_round;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic encounter).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Encounter is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stateful process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use tactics_test_utils::determinism::verify_determinism;
/// use tactics_test_utils::fixtures::{pass_round, skirmish_encounter};
///
/// let result = verify_determinism(
///     3,  // Run 3 times
///     10, // 10 rounds each
///     skirmish_encounter,
///     pass_round,
///     |encounter| encounter.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(?hashes, "Runs diverged");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Run an encounter twice for `rounds` passive rounds and compare final hashes.
pub fn verify_encounter_determinism<F>(setup_fn: F, rounds: u64) -> bool
where
    F: Fn() -> Encounter,
{
    verify_determinism(2, rounds, &setup_fn, pass_round, Encounter::state_hash).is_deterministic
}

/// Run N encounters on scoped threads and collect their final hashes.
///
/// Catches hidden global state: every thread must land on the same hash.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_encounters<F>(setup_fn: F, num_runs: usize, rounds: u64) -> Vec<u64>
where
    F: Fn() -> Encounter + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| {
                s.spawn(|| {
                    let mut encounter = setup_fn();
                    for _ in 0..rounds {
                        pass_round(&mut encounter);
                    }
                    encounter.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Compare two encounters AI step by AI step, finding the first divergence.
///
/// Drives both encounters through `rounds` passive rounds, checking hashes after every
/// single [`Encounter::advance_ai`] call.
///
/// # Returns
///
/// `None` if the encounters stay identical, `Some(step)` at the first differing step.
pub fn find_first_divergence<F>(setup_fn: F, rounds: u64) -> Option<u64>
where
    F: Fn() -> Encounter,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    let mut step = 0;
    for _ in 0..rounds {
        while a.state().is_player_phase() {
            a.apply_command(tactics_core::turn::Command::EndTurn);
            b.apply_command(tactics_core::turn::Command::EndTurn);
        }
        let round = a.round();
        while a.round() == round {
            let step_a = a.advance_ai();
            let step_b = b.advance_ai();
            step += 1;

            if step_a != step_b || a.state_hash() != b.state_hash() {
                return Some(step);
            }
            if step_a == tactics_core::turn::AiStep::Idle {
                break;
            }
        }
    }

    None
}

/// Verify that a RON round-trip preserves encounter state exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, rounds: u64) -> bool
where
    F: Fn() -> Encounter,
{
    let mut encounter = setup_fn();
    for _ in 0..rounds {
        pass_round(&mut encounter);
    }

    let hash_before = encounter.state_hash();

    let Ok(text) = ron::to_string(&encounter) else {
        return false;
    };
    let Ok(restored) = ron::from_str::<Encounter>(&text) else {
        return false;
    };

    hash_before == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for encounter testing.
///
/// These strategies generate random but reproducible inputs for property-based tests.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::prelude::*;

    /// Generate a map of `width` x `height` cells, roughly one wall in five.
    pub fn arb_grid(width: usize, height: usize) -> impl Strategy<Value = TerrainGrid> {
        proptest::collection::vec(prop::bool::weighted(0.2), width * height).prop_map(
            move |walls| {
                let rows: Vec<String> = walls
                    .chunks(width)
                    .map(|row| row.iter().map(|&w| if w { '#' } else { '.' }).collect())
                    .collect();
                TerrainGrid::from_rows(&rows).expect("generated rows are rectangular")
            },
        )
    }

    /// Generate a cell inside a `width` x `height` grid.
    pub fn arb_pos(width: i32, height: i32) -> impl Strategy<Value = GridPos> {
        (0..width, 0..height).prop_map(|(x, y)| GridPos::new(x, y))
    }

    /// Generate signed ability power (-20 to 20), in quarter steps.
    pub fn arb_power() -> impl Strategy<Value = Fixed> {
        (-80i32..=80i32).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4))
    }

    /// Generate health values (1-50).
    pub fn arb_health() -> impl Strategy<Value = i32> {
        1i32..=50i32
    }

    /// Generate an ability with positive cost.
    pub fn arb_ability() -> impl Strategy<Value = Ability> {
        (arb_power(), 1u32..=4u32, 1u32..=3u32)
            .prop_map(|(power, range, cost)| Ability::new("Generated", power, range, cost))
    }

    /// Generate a movement strategy.
    pub fn arb_strategy() -> impl Strategy<Value = MovementStrategy> {
        prop_oneof![
            Just(MovementStrategy::Direct),
            Just(MovementStrategy::Flanking),
            Just(MovementStrategy::Circling),
            Just(MovementStrategy::Cautious),
        ]
    }

    /// Generate a player command over a `width` x `height` grid.
    pub fn arb_command(width: i32, height: i32) -> impl Strategy<Value = Command> {
        prop_oneof![
            4 => arb_pos(width, height).prop_map(Command::SelectCell),
            1 => Just(Command::SelectActionMode(ActionMode::Move)),
            1 => Just(Command::SelectActionMode(ActionMode::Ability)),
            1 => (0usize..3).prop_map(Command::SelectAbility),
            1 => Just(Command::EndTurn),
        ]
    }

    /// Generate a sequence of commands.
    pub fn arb_command_sequence(
        width: i32,
        height: i32,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<Command>> {
        proptest::collection::vec(arb_command(width, height), 0..max_len)
    }
}
