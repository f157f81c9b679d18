//! Provider registry aggregation tests.
//!
//! Answers are OR-ed across providers per channel, independent of
//! registration order, and undeclared channels are never consulted.

use std::collections::BTreeSet;
use std::sync::Arc;

use bulwark_core::components::{EntityId, Projectile};
use bulwark_core::intercept::{
    BlockFlags, BlockZone, Channels, InterceptContext, InterceptProvider, Registry,
    ShieldScanCache,
};
use bulwark_core::math::{Cell, Fixed, Vec2Fixed, Vec3Fixed};
use bulwark_test_utils::fixtures::open_arena;
use proptest::prelude::*;

/// Gives the same answer on every channel, declared or not.
struct Canned {
    name: &'static str,
    channels: Channels,
    answer: bool,
    owner: EntityId,
}

impl InterceptProvider for Canned {
    fn name(&self) -> &'static str {
        self.name
    }

    fn channels(&self) -> Channels {
        self.channels
    }

    fn check_path(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _projectile: &Projectile,
        _from: Vec3Fixed,
        _to: Vec3Fixed,
    ) -> bool {
        self.answer
    }

    fn check_cell(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _projectile: &Projectile,
        _cell: Cell,
        _launcher: Option<EntityId>,
    ) -> bool {
        self.answer
    }

    fn on_impact(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _projectile: &Projectile,
        _launcher: Option<EntityId>,
    ) -> bool {
        self.answer
    }

    fn before_collide(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _projectile: &Projectile,
        _victim: EntityId,
    ) -> bool {
        self.answer
    }

    fn shield_zones(&self, _ctx: &mut InterceptContext<'_>, _entity: EntityId) -> Vec<BlockZone> {
        if !self.answer {
            return Vec::new();
        }
        vec![BlockZone {
            center: Vec2Fixed::ZERO,
            radius: Fixed::ONE,
            owner: self.owner,
            flags: BlockFlags::DIRECT_FIRE,
        }]
    }

    fn unsuppressable_from(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _pawn: EntityId,
        _origin: Vec3Fixed,
    ) -> bool {
        self.answer
    }
}

const NAMES: [&str; 6] = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];

/// Everything the registry answers, one entry per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Answers {
    check_path: bool,
    check_cell: bool,
    on_impact: bool,
    before_collide: bool,
    zone_owners: BTreeSet<EntityId>,
    unsuppressable: bool,
}

fn query(registry: &Registry) -> Answers {
    let arena = open_arena(8, 8);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(0, &arena, &mut scans);
    let projectile = Projectile::launch(1, None, Vec3Fixed::ZERO, Vec3Fixed::ground(5, 0), 10);

    Answers {
        check_path: registry.check_path(&mut ctx, &projectile, Vec3Fixed::ZERO, Vec3Fixed::ground(1, 0)),
        check_cell: registry.check_cell(&mut ctx, &projectile, Cell::new(0, 0), None),
        on_impact: registry.on_impact(&mut ctx, &projectile, None),
        before_collide: registry.before_collide(&mut ctx, &projectile, 7),
        zone_owners: registry
            .shield_zones(&mut ctx, 7)
            .into_iter()
            .map(|zone| zone.owner)
            .collect(),
        unsuppressable: registry.unsuppressable_from(&mut ctx, 7, Vec3Fixed::ZERO),
    }
}

/// OR of the answers of providers declaring `channel`.
fn expected(providers: &[(Channels, bool)], channel: Channels) -> bool {
    providers
        .iter()
        .any(|&(channels, answer)| channels.contains(channel) && answer)
}

fn build(providers: &[(Channels, bool)], order: &[usize]) -> Registry {
    let mut registry = Registry::new();
    for &i in order {
        let (channels, answer) = providers[i];
        registry.register(Arc::new(Canned {
            name: NAMES[i],
            channels,
            answer,
            owner: i as EntityId + 1,
        }));
    }
    registry
}

fn arb_channels() -> impl Strategy<Value = Channels> {
    any::<u8>().prop_map(Channels::from_bits_truncate)
}

fn arb_providers() -> impl Strategy<Value = Vec<(Channels, bool)>> {
    prop::collection::vec((arb_channels(), any::<bool>()), 1..=NAMES.len())
}

// =============================================================================
// Examples
// =============================================================================

#[test]
fn test_empty_registry_answers_neutrally() {
    let answers = query(&Registry::new());
    assert!(!answers.check_path);
    assert!(!answers.check_cell);
    assert!(!answers.on_impact);
    assert!(!answers.before_collide);
    assert!(answers.zone_owners.is_empty());
    assert!(!answers.unsuppressable);
}

#[test]
fn test_undeclared_channel_is_never_consulted() {
    // Would block everything, but only declares CHECK_CELL.
    let registry = build(&[(Channels::CHECK_CELL, true)], &[0]);
    let answers = query(&registry);

    assert!(answers.check_cell);
    assert!(!answers.check_path);
    assert!(!answers.on_impact);
    assert!(!answers.before_collide);
    assert!(answers.zone_owners.is_empty());
    assert!(!answers.unsuppressable);
    assert_eq!(registry.enabled_channels(), Channels::CHECK_CELL);
}

#[test]
fn test_one_blocker_among_passers_blocks() {
    let providers = [
        (Channels::all(), false),
        (Channels::CHECK_PATH | Channels::ON_IMPACT, true),
        (Channels::all(), false),
    ];
    let answers = query(&build(&providers, &[0, 1, 2]));

    assert!(answers.check_path);
    assert!(answers.on_impact);
    assert!(!answers.check_cell);
    assert!(!answers.before_collide);
}

#[test]
fn test_zones_collected_from_every_provider() {
    let providers = [
        (Channels::SHIELD_ZONES, true),
        (Channels::SHIELD_ZONES, false),
        (Channels::SHIELD_ZONES, true),
    ];
    let answers = query(&build(&providers, &[2, 1, 0]));
    assert_eq!(answers.zone_owners, BTreeSet::from([1, 3]));
}

#[test]
fn test_duplicate_registration_is_kept() {
    let mut registry = build(&[(Channels::CHECK_PATH, false)], &[0, 0]);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.provider_names(), vec!["alpha", "alpha"]);

    registry.register(Arc::new(Canned {
        name: "silent",
        channels: Channels::empty(),
        answer: true,
        owner: 99,
    }));
    assert_eq!(registry.len(), 2);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_registration_order_is_irrelevant(
        (providers, order) in arb_providers().prop_flat_map(|providers| {
            let indices: Vec<usize> = (0..providers.len()).collect();
            (Just(providers), Just(indices).prop_shuffle())
        })
    ) {
        let sorted: Vec<usize> = (0..providers.len()).collect();
        prop_assert_eq!(query(&build(&providers, &order)), query(&build(&providers, &sorted)));
    }

    #[test]
    fn prop_channels_or_aggregate(providers in arb_providers()) {
        let order: Vec<usize> = (0..providers.len()).collect();
        let registry = build(&providers, &order);
        let answers = query(&registry);

        prop_assert_eq!(answers.check_path, expected(&providers, Channels::CHECK_PATH));
        prop_assert_eq!(answers.check_cell, expected(&providers, Channels::CHECK_CELL));
        prop_assert_eq!(answers.on_impact, expected(&providers, Channels::ON_IMPACT));
        prop_assert_eq!(answers.before_collide, expected(&providers, Channels::BEFORE_COLLIDE));
        prop_assert_eq!(answers.unsuppressable, expected(&providers, Channels::UNSUPPRESSABLE));
        prop_assert_eq!(
            !answers.zone_owners.is_empty(),
            expected(&providers, Channels::SHIELD_ZONES)
        );

        let declared = providers
            .iter()
            .fold(Channels::empty(), |acc, &(channels, _)| acc | channels);
        prop_assert_eq!(registry.enabled_channels(), declared);
    }
}
