//! Target cache maintenance tests.
//!
//! After any sequence of spawn, despawn, hostility and aggression
//! notifications the cache must match a fresh look at the arena.

use std::collections::BTreeSet;

use bulwark_core::prelude::*;
use bulwark_test_utils::determinism::strategies::{arb_cache_ops, CacheOp};
use bulwark_test_utils::fixtures::{gunner, open_arena, pawn, seeded_rng, BLUE, RED};
use proptest::prelude::*;

const FACTIONS: [FactionId; 3] = [FactionId(1), FactionId(2), FactionId(3)];

fn fresh_arena() -> Arena {
    let mut arena = open_arena(16, 4);
    for faction in FACTIONS {
        arena.relations_mut().add_faction(faction);
    }
    arena
}

fn set_aggro(arena: &mut Arena, id: u64, on: bool) -> bool {
    match arena.combatant_mut(id).map(|c| &mut c.kind) {
        Some(CombatantKind::Pawn(traits)) => {
            traits.aggro_mental_state = on;
            true
        }
        _ => false,
    }
}

/// Apply one notification, returning the id it despawned, if any.
fn apply(
    arena: &mut Arena,
    cache: &mut TargetCache,
    memory: &mut AttackMemory,
    op: CacheOp,
) -> Option<u64> {
    match op {
        CacheOp::Spawn(id, faction) => {
            let x = i32::try_from(id).unwrap_or(0);
            if arena.spawn(pawn(id, x, 0, faction)).is_ok() {
                cache.notify_spawned(arena, id);
            }
        }
        CacheOp::Despawn(id) => {
            return arena.despawn_tracked(id, cache, memory).map(|_| id);
        }
        CacheOp::SetHostile(a, b, hostile) => {
            arena.relations_mut().set_hostile(a, b, hostile);
            cache.notify_faction_hostility_changed(arena, a, b);
        }
        CacheOp::Aggro(id, on) => {
            if set_aggro(arena, id, on) {
                cache.update_target(arena, id);
            }
        }
    }
    None
}

fn assert_matches_arena(arena: &Arena, cache: &TargetCache) {
    assert_eq!(cache.validate(arena), Vec::<String>::new());

    let ids: BTreeSet<u64> = arena.combatants().map(|c| c.id).collect();
    assert_eq!(cache.all_targets(), &ids);

    let factions: Vec<FactionId> = arena.relations().factions().collect();
    assert_eq!(cache.factions().collect::<Vec<_>>(), factions);

    for faction in factions {
        let listed: BTreeSet<u64> = cache.targets_hostile_to(faction).collect();
        let expected: BTreeSet<u64> = ids
            .iter()
            .copied()
            .filter(|&id| arena.is_hostile_to_faction(id, faction))
            .collect();
        assert_eq!(listed, expected, "targets hostile to {faction:?}");
    }

    let aggro: BTreeSet<u64> = arena
        .combatants()
        .filter(|c| c.in_aggro_mental_state())
        .map(|c| c.id)
        .collect();
    assert_eq!(cache.aggro_targets(), &aggro);
}

// =============================================================================
// Examples
// =============================================================================

#[test]
fn test_build_indexes_by_hostility() {
    let mut arena = open_arena(8, 4);
    arena.spawn(gunner(1, 0, 0, BLUE, 10)).unwrap();
    arena.spawn(pawn(2, 3, 0, RED)).unwrap();
    arena.spawn(pawn(3, 4, 0, BLUE)).unwrap();

    let cache = arena.target_cache();
    assert_eq!(cache.targets_hostile_to(BLUE).collect::<Vec<_>>(), vec![2]);
    assert_eq!(cache.targets_hostile_to(RED).collect::<Vec<_>>(), vec![1, 3]);
    assert!(cache.aggro_targets().is_empty());
}

#[test]
fn test_double_register_and_unknown_deregister_are_ignored() {
    let mut arena = open_arena(8, 4);
    arena.spawn(pawn(2, 3, 0, RED)).unwrap();
    let mut cache = arena.target_cache();

    cache.notify_spawned(&arena, 2);
    cache.notify_despawned(42);

    assert_eq!(cache.all_targets().len(), 1);
    assert_eq!(cache.targets_hostile_to(BLUE).count(), 1);
    assert_matches_arena(&arena, &cache);
}

#[test]
fn test_faction_added_and_removed() {
    let mut arena = open_arena(8, 4);
    arena.spawn(pawn(2, 3, 0, RED)).unwrap();
    let mut cache = arena.target_cache();

    let green = FactionId(5);
    arena.relations_mut().set_hostile(RED, green, true);
    cache.notify_faction_added(&arena, green);
    assert_eq!(cache.targets_hostile_to(green).collect::<Vec<_>>(), vec![2]);

    cache.notify_faction_removed(green);
    assert_eq!(cache.targets_hostile_to(green).count(), 0);
    assert!(!cache.factions().any(|f| f == green));
}

#[test]
fn test_aggressive_pawn_reaches_its_own_side() {
    let mut arena = open_arena(8, 4);
    let searcher = gunner(1, 0, 0, BLUE, 10);
    arena.spawn(searcher.clone()).unwrap();
    arena.spawn(pawn(2, 3, 0, BLUE)).unwrap();
    let mut cache = arena.target_cache();
    assert!(cache.potential_targets_for(&arena, &searcher).is_empty());

    set_aggro(&mut arena, 2, true);
    cache.update_target(&arena, 2);
    assert_eq!(cache.potential_targets_for(&arena, &searcher), vec![2]);
    assert_matches_arena(&arena, &cache);
}

#[test]
fn test_factionless_searcher_sees_only_hostiles() {
    let mut arena = open_arena(8, 4);
    let mut stray = pawn(1, 0, 0, BLUE);
    stray.faction = None;
    arena.spawn(stray.clone()).unwrap();
    arena.spawn(pawn(2, 3, 0, RED)).unwrap();
    let mut cache = arena.target_cache();

    assert!(cache.potential_targets_for(&arena, &stray).is_empty());

    set_aggro(&mut arena, 2, true);
    cache.update_target(&arena, 2);
    assert_eq!(cache.potential_targets_for(&arena, &stray), vec![2]);
}

#[test]
fn test_despawn_clears_cache_and_attack_memory() {
    let mut arena = open_arena(12, 4);
    arena.spawn(gunner(1, 0, 0, BLUE, 20)).unwrap();
    arena.spawn(pawn(2, 5, 0, RED)).unwrap();
    arena.spawn(pawn(3, 7, 0, RED)).unwrap();
    let mut cache = arena.target_cache();
    let mut memory = AttackMemory::new();

    let config = ScoringConfig::default();
    let pick = TargetSelector::new(&arena, &config)
        .best_attack_target(
            &mut cache,
            &mut memory,
            1,
            &TargetSearchParams::default(),
            None,
            &mut seeded_rng(4),
        )
        .unwrap()
        .unwrap();
    memory.record(pick, 1, 0);
    assert_eq!(memory.last_attack(1).map(|(target, _)| target), Some(pick));

    assert!(arena.despawn_tracked(pick, &mut cache, &mut memory).is_some());
    assert!(!cache.contains(pick));
    assert_eq!(memory.last_attack(1), None);
    assert_eq!(memory.last_attack(pick), None);
    assert_matches_arena(&arena, &cache);

    // Already gone.
    assert!(arena.despawn_tracked(pick, &mut cache, &mut memory).is_none());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_notifications_keep_cache_in_sync(ops in arb_cache_ops(40)) {
        let mut arena = fresh_arena();
        let mut cache = arena.target_cache();

        for op in ops {
            apply(&mut arena, &mut cache, op);
        }
        assert_matches_arena(&arena, &cache);
    }
}
