//! Built-in shield provider tests, driven through the interception engine.

use bulwark_core::arena::Arena;
use bulwark_core::components::{PersonalShield, Projectile, ShieldVariant};
use bulwark_core::config::ShieldConfig;
use bulwark_core::factions::FactionId;
use bulwark_core::intercept::providers::register_builtin;
use bulwark_core::intercept::{
    BlockFlags, InterceptContext, InterceptEvent, InterceptionEngine, InterceptionResult, Registry,
    ShieldEmitter, ShieldScanCache,
};
use bulwark_core::math::{Cell, Vec3Fixed};
use bulwark_test_utils::fixtures::{at, dome, fixed, open_arena, pawn, BLUE, RED};

fn builtin() -> Registry {
    let mut registry = Registry::new();
    register_builtin(&mut registry, &ShieldConfig::default());
    registry
}

fn shot(id: u64, from: (i32, i32), to: (i32, i32)) -> Projectile {
    Projectile::launch(
        id,
        None,
        Vec3Fixed::ground(from.0, from.1),
        Vec3Fixed::ground(to.0, to.1),
        10,
    )
}

fn bombardment_shield(id: u64, energy: i32) -> ShieldEmitter {
    ShieldEmitter::new(
        id,
        Vec3Fixed::ground(20, 5),
        fixed(4),
        fixed(energy),
        BlockFlags::INDIRECT_FIRE,
    )
}

fn arena_with(shield: ShieldEmitter) -> Arena {
    let mut arena = open_arena(40, 12);
    arena.add_shield(shield);
    arena
}

fn owner(result: InterceptionResult) -> Option<u64> {
    match result {
        InterceptionResult::Intercepted { owner, .. } => owner,
        InterceptionResult::NoIntercept => None,
    }
}

// =============================================================================
// Dome shields
// =============================================================================

#[test]
fn test_dome_stops_incoming_fire_at_the_edge() {
    let arena = arena_with(dome(50, 20, 5, 4, 100));
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let projectile = shot(1, (10, 5), (18, 5));
    let result = engine.step(&mut ctx, &projectile, projectile.destination);

    let InterceptionResult::Intercepted { point, owner } = result else {
        panic!("expected the dome to stop the shot");
    };
    assert_eq!(owner, Some(50));
    assert_eq!(point, Vec3Fixed::ground(16, 5));

    let events = ctx.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        InterceptEvent::ShieldAbsorbed { provider: "dome", shield: 50, projectile: 1, .. }
    )));
    assert!(events.iter().any(|e| matches!(e, InterceptEvent::Effect { .. })));
}

#[test]
fn test_dome_lets_outgoing_fire_through_unless_flagged() {
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let projectile = shot(1, (20, 5), (30, 5));

    let open = arena_with(dome(50, 20, 5, 4, 100));
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &open, &mut scans);
    assert_eq!(
        engine.step(&mut ctx, &projectile, projectile.destination),
        InterceptionResult::NoIntercept
    );

    let mut sealed_shield = dome(50, 20, 5, 4, 100);
    sealed_shield.flags |= BlockFlags::OUTGOING_FIRE;
    let sealed = arena_with(sealed_shield);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &sealed, &mut scans);
    let result = engine.step(&mut ctx, &projectile, projectile.destination);
    assert_eq!(owner(result), Some(50));
}

#[test]
fn test_dome_ignores_overhead_fire() {
    let arena = arena_with(dome(50, 20, 5, 4, 100));
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    // Flies over the dome and lands beyond it.
    let projectile = shot(1, (2, 5), (30, 5)).overhead();
    assert!(!engine.step(&mut ctx, &projectile, projectile.destination).is_intercepted());
}

#[test]
fn test_depleted_dome_drops_for_the_rest_of_the_tick() {
    let arena = arena_with(dome(50, 20, 5, 4, 5));
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();

    {
        let mut ctx = InterceptContext::new(1, &arena, &mut scans);
        let first = shot(1, (10, 5), (18, 5));
        assert!(engine.step(&mut ctx, &first, first.destination).is_intercepted());
        assert!(ctx
            .events()
            .iter()
            .any(|e| matches!(e, InterceptEvent::ShieldDepleted { shield: 50, .. })));

        let second = shot(2, (10, 5), (18, 5));
        assert!(!engine.step(&mut ctx, &second, second.destination).is_intercepted());
    }
    assert_eq!(scans.rescans(), 1);

    // The host still reports the emitter charged, so the next tick rescans it.
    let mut ctx = InterceptContext::new(2, &arena, &mut scans);
    let third = shot(3, (10, 5), (18, 5));
    assert!(engine.step(&mut ctx, &third, third.destination).is_intercepted());
    assert_eq!(scans.rescans(), 2);
}

#[test]
fn test_unpowered_dome_is_down() {
    let mut shield = dome(50, 20, 5, 4, 100);
    shield.powered = false;
    let arena = arena_with(shield);
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let projectile = shot(1, (10, 5), (18, 5));
    assert!(!engine.step(&mut ctx, &projectile, projectile.destination).is_intercepted());
}

#[test]
fn test_dome_shelters_friends_only() {
    let mut arena = arena_with(dome(50, 20, 5, 4, 100).with_faction(RED));
    arena.spawn(pawn(1, 20, 5, RED)).unwrap();
    arena.spawn(pawn(2, 21, 5, BLUE)).unwrap();
    arena.spawn(pawn(3, 2, 2, FactionId(9))).unwrap();
    let registry = builtin();
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    // The emitter stops both kinds of fire, so the dome and bombardment
    // providers each report it.
    let zones = registry.shield_zones(&mut ctx, 1);
    assert_eq!(zones.len(), 2);
    assert!(zones.iter().all(|z| z.owner == 50));
    assert!(registry.shield_zones(&mut ctx, 2).is_empty());
    // Not at war with the owner.
    assert_eq!(registry.shield_zones(&mut ctx, 3).len(), 2);

    let groups: Vec<_> = registry.enumerate_shield_zones(&mut ctx, 1).collect();
    assert_eq!(groups.len(), 2);
    assert!(groups[0].clone().any(|c| c == Cell::new(20, 5)));
}

#[test]
fn test_inside_dome_cannot_be_suppressed_from_outside() {
    let mut arena = arena_with(dome(50, 20, 5, 4, 100));
    arena.spawn(pawn(1, 20, 5, RED)).unwrap();
    let registry = builtin();
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    assert!(registry.unsuppressable_from(&mut ctx, 1, Vec3Fixed::ground(2, 5)));
    assert!(!registry.unsuppressable_from(&mut ctx, 1, Vec3Fixed::ground(21, 5)));
    assert!(!registry.unsuppressable_from(&mut ctx, 404, Vec3Fixed::ground(2, 5)));
}

// =============================================================================
// Bombardment shields
// =============================================================================

#[test]
fn test_bombardment_shield_stops_shells_landing_inside() {
    let arena = arena_with(bombardment_shield(60, 100));
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let shell = shot(1, (2, 5), (20, 5)).overhead();
    let result = engine.impact(&mut ctx, &shell);
    assert_eq!(owner(result), Some(60));
    assert!(ctx.events().iter().any(|e| matches!(
        e,
        InterceptEvent::ShieldAbsorbed { provider: "bombardment", shield: 60, .. }
    )));
}

#[test]
fn test_bombardment_shield_checks_cells_in_flight() {
    let arena = arena_with(bombardment_shield(60, 100));
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let shell = shot(1, (2, 5), (21, 5)).overhead();
    let result = engine.step(&mut ctx, &shell, Vec3Fixed::ground(19, 5));
    assert_eq!(owner(result), Some(60));
}

#[test]
fn test_bombardment_shield_ignores_shells_fired_from_inside() {
    let arena = arena_with(bombardment_shield(60, 100));
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let shell = shot(1, (19, 5), (21, 5)).overhead();
    assert!(!engine.impact(&mut ctx, &shell).is_intercepted());
}

#[test]
fn test_bombardment_shield_ignores_direct_fire() {
    let arena = arena_with(bombardment_shield(60, 100));
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let bullet = shot(1, (10, 5), (20, 5));
    assert!(!engine.step(&mut ctx, &bullet, bullet.destination).is_intercepted());
    assert!(!engine.impact(&mut ctx, &bullet).is_intercepted());
}

// =============================================================================
// Personal shields
// =============================================================================

fn shielded_pawn_arena(energy: i32) -> Arena {
    let mut arena = open_arena(40, 12);
    let mut target = pawn(7, 10, 5, RED);
    target.personal_shield = Some(PersonalShield {
        variant: ShieldVariant::Belt,
        energy: fixed(energy),
    });
    arena.spawn(target).unwrap();
    arena
}

#[test]
fn test_personal_shield_stops_ranged_hit() {
    let arena = shielded_pawn_arena(50);
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let bullet = shot(1, (0, 5), (10, 5));
    let result = engine.before_collide(&mut ctx, &bullet, 7);
    assert_eq!(owner(result), Some(7));
    assert!(!ctx
        .events()
        .iter()
        .any(|e| matches!(e, InterceptEvent::ShieldDepleted { .. })));
}

#[test]
fn test_personal_shield_reports_depletion() {
    let arena = shielded_pawn_arena(5);
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let bullet = shot(1, (0, 5), (10, 5));
    assert!(engine.before_collide(&mut ctx, &bullet, 7).is_intercepted());
    assert!(ctx.events().iter().any(|e| matches!(
        e,
        InterceptEvent::ShieldDepleted { provider: "personal", shield: 7 }
    )));
}

#[test]
fn test_depleted_belt_stops_blocking_for_the_tick() {
    let arena = shielded_pawn_arena(5);
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();

    let mut ctx = InterceptContext::new(1, &arena, &mut scans);
    let first = shot(1, (0, 5), (10, 5));
    let second = shot(2, (0, 5), (10, 5));
    assert!(engine.before_collide(&mut ctx, &first, 7).is_intercepted());
    assert!(!engine.before_collide(&mut ctx, &second, 7).is_intercepted());

    let depleted = ctx
        .events()
        .iter()
        .filter(|e| matches!(e, InterceptEvent::ShieldDepleted { provider: "personal", shield: 7 }))
        .count();
    assert_eq!(depleted, 1);
    assert!(!ctx.events().iter().any(|e| matches!(
        e,
        InterceptEvent::ShieldAbsorbed { projectile: 2, .. }
    )));

    // The host has not recharged the belt, so a new tick reads its energy afresh.
    let mut ctx = InterceptContext::new(2, &arena, &mut scans);
    assert!(engine.before_collide(&mut ctx, &second, 7).is_intercepted());
}

#[test]
fn test_belt_absorbs_until_its_energy_runs_out() {
    let arena = shielded_pawn_arena(25);
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    // Ten damage per shot: 25 -> 15 -> 5 -> spent.
    let blocked: Vec<bool> = (1..=4)
        .map(|id| {
            let bullet = shot(id, (0, 5), (10, 5));
            engine.before_collide(&mut ctx, &bullet, 7).is_intercepted()
        })
        .collect();
    assert_eq!(blocked, vec![true, true, true, false]);
    assert_eq!(ctx.personal_shield(7).map(|s| s.is_active()), Some(false));
}

#[test]
fn test_point_blank_shot_gets_under_the_belt() {
    let arena = shielded_pawn_arena(50);
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let bullet = Projectile::launch(1, None, Vec3Fixed::ground(10, 5), at(10, 5), 10);
    assert!(!engine.before_collide(&mut ctx, &bullet, 7).is_intercepted());
}

#[test]
fn test_unshielded_victim_takes_the_hit() {
    let mut arena = open_arena(40, 12);
    arena.spawn(pawn(7, 10, 5, RED)).unwrap();
    let registry = builtin();
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(1, &arena, &mut scans);

    let bullet = shot(1, (0, 5), (10, 5));
    assert!(!engine.before_collide(&mut ctx, &bullet, 7).is_intercepted());
    assert!(!engine.before_collide(&mut ctx, &bullet, 404).is_intercepted());
    assert!(ctx.events().is_empty());
}
