//! Test fixtures and helpers.
//!
//! Pre-built arenas, combatants and shields for consistent testing.

use bulwark_core::arena::Arena;
use bulwark_core::components::{
    Combatant, CombatantKind, EntityId, Intelligence, PawnTraits, Race, Verb,
};
use bulwark_core::factions::FactionId;
use bulwark_core::intercept::{BlockFlags, ShieldEmitter};
use bulwark_core::math::{Fixed, Vec3Fixed};
use bulwark_core::pathfinding::NavGrid;
use fixed::types::I32F32;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Faction used for "our" side in fixtures.
pub const BLUE: FactionId = FactionId(1);

/// Faction hostile to [`BLUE`] in fixtures.
pub const RED: FactionId = FactionId(2);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real interception code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Ground point at the center of cell `(x, z)`.
#[must_use]
pub fn at(x: i32, z: i32) -> Vec3Fixed {
    let half = fixed_f(0.5);
    Vec3Fixed::new(fixed(x) + half, Fixed::ZERO, fixed(z) + half)
}

/// Seeded RNG for reproducible picks.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Open arena of `width × height` walkable cells with [`BLUE`] and [`RED`]
/// hostile to each other.
///
/// # Panics
///
/// Panics if either dimension is zero.
#[must_use]
pub fn open_arena(width: u32, height: u32) -> Arena {
    let grid = NavGrid::new(width, height).expect("arena dimensions must be non-zero");
    let mut arena = Arena::new(grid);
    arena.relations_mut().set_hostile(BLUE, RED, true);
    arena
}

/// Humanlike pawn with no attack.
#[must_use]
pub fn pawn(id: EntityId, x: i32, z: i32, faction: FactionId) -> Combatant {
    let mut combatant = Combatant::new(id, CombatantKind::Pawn(PawnTraits::default()), at(x, z));
    combatant.faction = Some(faction);
    combatant
}

/// Pawn with a melee attack.
#[must_use]
pub fn brawler(id: EntityId, x: i32, z: i32, faction: FactionId) -> Combatant {
    let mut combatant = pawn(id, x, z, faction);
    combatant.verb = Some(Verb::melee());
    combatant
}

/// Pawn with a direct-fire gun of the given range.
#[must_use]
pub fn gunner(id: EntityId, x: i32, z: i32, faction: FactionId, range: i32) -> Combatant {
    let mut combatant = pawn(id, x, z, faction);
    combatant.verb = Some(Verb::gun(fixed(range)));
    combatant
}

/// Animal pawn.
#[must_use]
pub fn animal(id: EntityId, x: i32, z: i32, faction: Option<FactionId>) -> Combatant {
    let traits = PawnTraits {
        race: Race::Animal,
        intelligence: Intelligence::Animal,
        ..PawnTraits::default()
    };
    let mut combatant = Combatant::new(id, CombatantKind::Pawn(traits), at(x, z));
    combatant.faction = faction;
    combatant
}

/// Building owned by `faction`.
#[must_use]
pub fn building(id: EntityId, x: i32, z: i32, faction: FactionId) -> Combatant {
    let mut combatant = Combatant::new(id, CombatantKind::Building, at(x, z));
    combatant.faction = Some(faction);
    combatant
}

/// Powered dome shield stopping direct and indirect fire.
#[must_use]
pub fn dome(id: EntityId, x: i32, z: i32, radius: i32, energy: i32) -> ShieldEmitter {
    ShieldEmitter::new(
        id,
        Vec3Fixed::ground(x, z),
        fixed(radius),
        fixed(energy),
        BlockFlags::DIRECT_FIRE | BlockFlags::INDIRECT_FIRE,
    )
}

/// A small skirmish scenario in RON: a walled yard with two blue gunners
/// and three red targets.
pub const SKIRMISH_RON: &str = r#"(
    map_id: 1,
    tick: 1000,
    layout: [
        "................",
        "................",
        "......#.........",
        "......#.........",
        "................",
        "................",
    ],
    factions: [1, 2],
    hostilities: [(1, 2)],
    combatants: [
        (id: 1, kind: Pawn((downed: false)), position: (x: 4294967296, z: 4294967296), faction: Some(1),
         verb: Some((ranged: true, range: 107374182400, projectile: Some((flies_overhead: false))))),
        (id: 2, kind: Pawn((downed: false)), position: (x: 8589934592, z: 17179869184), faction: Some(1),
         verb: Some((ranged: true, range: 107374182400, projectile: Some((flies_overhead: false))))),
        (id: 10, kind: Pawn((downed: false)), position: (x: 47244640256, z: 4294967296), faction: Some(2),
         verb: Some((ranged: true, range: 107374182400, projectile: Some((flies_overhead: false))))),
        (id: 11, kind: Pawn((juvenile: true)), position: (x: 51539607552, z: 12884901888), faction: Some(2)),
        (id: 12, kind: Building, position: (x: 60129542144, z: 17179869184), faction: Some(2)),
    ],
    shields: [
        (id: 100, faction: Some(2), center: (x: 51539607552, z: 8589934592),
         radius: 12884901888, energy: 429496729600, flags: "DIRECT_FIRE | INDIRECT_FIRE"),
    ],
)"#;
