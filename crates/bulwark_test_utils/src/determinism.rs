//! Determinism testing utilities.
//!
//! Provides a harness for verifying that target selection and interception
//! produce identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`bulwark_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Candidate lists come from `BTreeSet`s and are visited in id order.
//!
//! - **System randomness**: The weighted pick only draws from the RNG the
//!   caller passes in, seeded explicitly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use bulwark_core::arena::Arena;
use bulwark_core::components::EntityId;
use bulwark_core::config::ScoringConfig;
use bulwark_core::targeting::{AttackMemory, TargetSearchParams, TargetSelector};

use crate::fixtures::seeded_rng;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Runs are non-deterministic!\n\
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
/// * `runs` - Number of times to run the process
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute state hash
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

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Repeated target picks for one searcher, with the attack memory carried
/// between picks.
///
/// # Panics
///
/// Panics if a pick returns an error.
#[must_use]
pub fn pick_sequence(
    arena: &Arena,
    searcher: EntityId,
    params: &TargetSearchParams,
    picks: u64,
    seed: u64,
) -> Vec<Option<EntityId>> {
    let config = ScoringConfig::default();
    let selector = TargetSelector::new(arena, &config);
    let mut cache = arena.target_cache();
    let mut memory = AttackMemory::new();
    let mut rng = seeded_rng(seed);

    (0..picks)
        .map(|_| {
            selector
                .best_attack_target(&mut cache, &mut memory, searcher, params, None, &mut rng)
                .expect("target search failed")
        })
        .collect()
}

/// Run [`pick_sequence`] `runs` times from fresh state and compare hashes.
pub fn verify_selection_determinism<Setup>(
    runs: usize,
    picks: u64,
    seed: u64,
    searcher: EntityId,
    params: &TargetSearchParams,
    setup: Setup,
) -> DeterminismResult
where
    Setup: Fn() -> Arena,
{
    let hashes: Vec<u64> = (0..runs)
        .map(|_| compute_hash(&pick_sequence(&setup(), searcher, params, picks, seed)))
        .collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps: picks,
    }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for geometry, picks and cache maintenance.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use bulwark_core::components::EntityId;
    use bulwark_core::factions::FactionId;
    use bulwark_core::math::{Fixed, Vec3Fixed};
    use proptest::prelude::*;

    /// Generate a fixed-point coordinate in a reasonable range.
    ///
    /// Range: -20000 to 20000 with quarter-cell resolution. Differences
    /// squared leave the integer range of [`Fixed`].
    pub fn arb_fixed_coord() -> impl Strategy<Value = Fixed> {
        (-80_000i32..80_000i32).prop_map(|q| Fixed::from_num(q) / Fixed::from_num(4))
    }

    /// Generate a ground-level point.
    pub fn arb_ground_point() -> impl Strategy<Value = Vec3Fixed> {
        (arb_fixed_coord(), arb_fixed_coord()).prop_map(|(x, z)| Vec3Fixed::new(x, Fixed::ZERO, z))
    }

    /// Generate a circle radius (1 to 50).
    pub fn arb_radius() -> impl Strategy<Value = Fixed> {
        (1i32..=50).prop_map(Fixed::from_num)
    }

    /// Generate a score in -100..100 with tenth resolution.
    pub fn arb_score() -> impl Strategy<Value = Fixed> {
        (-1000i32..1000).prop_map(|t| Fixed::from_num(t) / Fixed::from_num(10))
    }

    /// Generate a non-empty list of `(id, score)` pairs with distinct ids.
    pub fn arb_scored(max_len: usize) -> impl Strategy<Value = Vec<(EntityId, Fixed)>> {
        prop::collection::vec(arb_score(), 1..=max_len).prop_map(|scores| {
            scores
                .into_iter()
                .enumerate()
                .map(|(i, score)| (i as EntityId + 1, score))
                .collect()
        })
    }

    /// One maintenance notification applied to a target cache.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CacheOp {
        /// Spawn an entity of a faction at a cell column.
        Spawn(EntityId, FactionId),
        /// Despawn an entity.
        Despawn(EntityId),
        /// Change hostility between two factions.
        SetHostile(FactionId, FactionId, bool),
        /// Toggle an entity's aggressive mental state.
        Aggro(EntityId, bool),
    }

    fn arb_faction() -> impl Strategy<Value = FactionId> {
        (1u32..=3).prop_map(FactionId)
    }

    fn arb_entity() -> impl Strategy<Value = EntityId> {
        1u64..=12
    }

    /// Generate one cache notification.
    pub fn arb_cache_op() -> impl Strategy<Value = CacheOp> {
        prop_oneof![
            3 => (arb_entity(), arb_faction()).prop_map(|(id, f)| CacheOp::Spawn(id, f)),
            2 => arb_entity().prop_map(CacheOp::Despawn),
            2 => (arb_faction(), arb_faction(), any::<bool>())
                .prop_map(|(a, b, hostile)| CacheOp::SetHostile(a, b, hostile)),
            1 => (arb_entity(), any::<bool>()).prop_map(|(id, on)| CacheOp::Aggro(id, on)),
        ]
    }

    /// Generate a sequence of cache notifications.
    pub fn arb_cache_ops(max_len: usize) -> impl Strategy<Value = Vec<CacheOp>> {
        prop::collection::vec(arb_cache_op(), 0..=max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{gunner, open_arena, pawn, BLUE, RED};

    #[test]
    fn test_verify_determinism_counter() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 7, |n| *n);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes(), vec![70]);
    }

    #[test]
    fn test_selection_is_reproducible() {
        let setup = || {
            let mut arena = open_arena(30, 30);
            arena.spawn(gunner(1, 2, 2, BLUE, 30)).unwrap();
            arena.spawn(pawn(2, 10, 2, RED)).unwrap();
            arena.spawn(pawn(3, 12, 4, RED)).unwrap();
            arena.spawn(pawn(4, 9, 6, RED)).unwrap();
            arena
        };
        let result =
            verify_selection_determinism(4, 50, 99, 1, &TargetSearchParams::default(), setup);
        result.assert_deterministic();
    }
}
