//! Projectile interception against circular block zones.
//!
//! The engine itself only aggregates: independent providers (one per shield
//! integration) register on the channels they implement in a [`Registry`],
//! and the [`InterceptionEngine`] asks the registry at each projectile step.
//!
//! Provider state that must survive between calls (the per-tick list of
//! active shields) lives in a [`ShieldScanCache`] owned by each region, so
//! one registry can serve many regions at once.

pub mod engine;
pub mod providers;
pub mod registry;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::components::{EntityId, MapId, PersonalShield};
use crate::geometry::{closest_intersection, RadialCells};
use crate::math::{Cell, Fixed, Vec2Fixed, Vec3Fixed};

pub use engine::InterceptionEngine;
pub use providers::{ShieldEmitter, ShieldWorld};
pub use registry::{Channels, InterceptProvider, Registry};

bitflags! {
    /// Which kinds of fire a block zone stops.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BlockFlags: u8 {
        /// Stops direct-fire projectiles crossing the boundary.
        const DIRECT_FIRE   = 1 << 0;
        /// Stops overhead projectiles landing inside.
        const INDIRECT_FIRE = 1 << 1;
        /// Also stops fire leaving the zone from inside.
        const OUTGOING_FIRE = 1 << 2;
    }
}

/// A circular blocking region on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockZone {
    /// Center on the ground plane.
    pub center: Vec2Fixed,
    /// Radius.
    #[serde(with = "crate::math::fixed_serde")]
    pub radius: Fixed,
    /// Entity projecting the zone.
    pub owner: EntityId,
    /// Capabilities.
    pub flags: BlockFlags,
}

impl BlockZone {
    /// Center as a ground-level 3D point.
    #[must_use]
    pub const fn center_3d(&self) -> Vec3Fixed {
        self.center.to_ground(Fixed::ZERO)
    }

    /// Whether a point lies inside the zone (height ignored).
    #[must_use]
    pub fn contains(&self, point: Vec3Fixed) -> bool {
        point.horizontal_2d().distance_squared(self.center) <= self.radius * self.radius
    }

    /// Closest boundary crossing of `from → to`, if any.
    ///
    /// Zones that stop outgoing fire also catch the exit crossing beyond `to`.
    #[must_use]
    pub fn intercept(&self, from: Vec3Fixed, to: Vec3Fixed) -> Option<Vec3Fixed> {
        closest_intersection(
            from,
            to,
            self.center_3d(),
            self.radius,
            self.flags.contains(BlockFlags::OUTGOING_FIRE),
            false,
        )
    }

    /// Lazily enumerate the cells covered by this zone.
    #[must_use]
    pub fn cells(&self) -> RadialCells {
        RadialCells::new(Cell::containing(self.center_3d()), self.radius)
    }
}

/// How a projectile travels, for picking the zones that can stop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireMode {
    /// Straight-line fire.
    Direct,
    /// Overhead fire.
    Indirect,
}

impl FireMode {
    /// Zone capability needed to stop this kind of fire.
    #[must_use]
    pub const fn required_flag(self) -> BlockFlags {
        match self {
            Self::Direct => BlockFlags::DIRECT_FIRE,
            Self::Indirect => BlockFlags::INDIRECT_FIRE,
        }
    }
}

/// Outcome of an interception query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterceptionResult {
    /// The projectile keeps flying.
    NoIntercept,
    /// The projectile was stopped.
    Intercepted {
        /// Where it was stopped.
        point: Vec3Fixed,
        /// The entity that stopped it, when the provider recorded one.
        owner: Option<EntityId>,
    },
}

impl InterceptionResult {
    /// Whether the projectile was stopped.
    #[must_use]
    pub const fn is_intercepted(&self) -> bool {
        matches!(self, Self::Intercepted { .. })
    }
}

/// Side effects produced by providers for the host to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InterceptEvent {
    /// A shield absorbed a projectile.
    ShieldAbsorbed {
        /// Provider that handled the hit.
        provider: &'static str,
        /// Shield owner.
        shield: EntityId,
        /// The projectile stopped.
        projectile: EntityId,
        /// Where the projectile was stopped.
        point: Vec3Fixed,
        /// Energy drained from the shield.
        #[serde(with = "crate::math::fixed_serde")]
        damage: Fixed,
    },
    /// A shield ran out of energy.
    ShieldDepleted {
        /// Provider that handled the hit.
        provider: &'static str,
        /// Shield owner.
        shield: EntityId,
    },
    /// Visual impact effect.
    Effect {
        /// Effect location.
        at: Vec3Fixed,
        /// Effect size.
        #[serde(with = "crate::math::fixed_serde")]
        scale: Fixed,
    },
}

/// Active shields a provider found on one map during one tick.
#[derive(Debug, Clone)]
pub struct ShieldScan {
    tick: u64,
    map: MapId,
    shields: Vec<ShieldEmitter>,
}

/// Per-region cache of provider shield scans, keyed by provider name.
///
/// A provider rescans only when the `(tick, map)` key changes. Damage
/// applied during a tick is written into the cached snapshot.
#[derive(Debug, Clone, Default)]
pub struct ShieldScanCache {
    scans: HashMap<&'static str, ShieldScan>,
    rescans: u64,
    belt_drain: BeltDrain,
}

/// Personal shield energy spent during one `(tick, map)`.
#[derive(Debug, Clone, Default)]
struct BeltDrain {
    key: Option<(u64, MapId)>,
    drained: HashMap<EntityId, Fixed>,
}

impl ShieldScanCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scans actually performed.
    #[must_use]
    pub const fn rescans(&self) -> u64 {
        self.rescans
    }

    /// Personal shield energy already drained from `entity` this tick.
    #[must_use]
    pub fn belt_drained(&self, entity: EntityId, tick: u64, map: MapId) -> Fixed {
        if self.belt_drain.key != Some((tick, map)) {
            return Fixed::ZERO;
        }
        self.belt_drain
            .drained
            .get(&entity)
            .copied()
            .unwrap_or(Fixed::ZERO)
    }

    /// Drain `amount` from `entity`'s personal shield for the rest of the tick.
    pub fn drain_belt(&mut self, entity: EntityId, tick: u64, map: MapId, amount: Fixed) {
        if self.belt_drain.key != Some((tick, map)) {
            self.belt_drain.key = Some((tick, map));
            self.belt_drain.drained.clear();
        }
        let drained = self.belt_drain.drained.entry(entity).or_insert(Fixed::ZERO);
        *drained = drained.saturating_add(amount);
    }

    /// Cached shields for `provider`, rescanning when `(tick, map)` changed.
    pub fn shields_for<F>(
        &mut self,
        provider: &'static str,
        tick: u64,
        map: MapId,
        scan: F,
    ) -> &mut Vec<ShieldEmitter>
    where
        F: FnOnce() -> Vec<ShieldEmitter>,
    {
        match self.scans.entry(provider) {
            Entry::Occupied(mut entry) => {
                let stale = entry.get().tick != tick || entry.get().map != map;
                if stale {
                    let shields = scan();
                    tracing::trace!(provider, tick, map, count = shields.len(), "Shield rescan");
                    self.rescans += 1;
                    entry.insert(ShieldScan { tick, map, shields });
                }
                &mut entry.into_mut().shields
            }
            Entry::Vacant(entry) => {
                let shields = scan();
                tracing::trace!(provider, tick, map, count = shields.len(), "Shield scan");
                self.rescans += 1;
                &mut entry.insert(ShieldScan { tick, map, shields }).shields
            }
        }
    }
}

/// State threaded through one batch of interception queries.
pub struct InterceptContext<'w> {
    tick: u64,
    world: &'w dyn ShieldWorld,
    scans: &'w mut ShieldScanCache,
    events: Vec<InterceptEvent>,
    last_hit: Option<(Vec3Fixed, EntityId)>,
}

impl<'w> InterceptContext<'w> {
    /// Create a context for the given tick and region.
    pub fn new(tick: u64, world: &'w dyn ShieldWorld, scans: &'w mut ShieldScanCache) -> Self {
        Self {
            tick,
            world,
            scans,
            events: Vec::new(),
            last_hit: None,
        }
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The host region being queried.
    #[must_use]
    pub fn world(&self) -> &'w dyn ShieldWorld {
        self.world
    }

    /// Active shields matching `accept`, from the region cache.
    pub fn active_shields<F>(&mut self, provider: &'static str, accept: F) -> &mut Vec<ShieldEmitter>
    where
        F: Fn(&ShieldEmitter) -> bool,
    {
        let world = self.world;
        let map = world.map_id();
        self.scans.shields_for(provider, self.tick, map, || {
            world
                .shield_emitters()
                .into_iter()
                .filter(|s| accept(s))
                .collect()
        })
    }

    /// `entity`'s personal shield with this tick's hits taken off.
    #[must_use]
    pub fn personal_shield(&self, entity: EntityId) -> Option<PersonalShield> {
        let mut shield = self.world.personal_shield(entity)?;
        let drained = self.scans.belt_drained(entity, self.tick, self.world.map_id());
        shield.energy = shield.energy.saturating_sub(drained);
        Some(shield)
    }

    /// Take `amount` off `entity`'s personal shield until the tick ends.
    pub fn drain_personal_shield(&mut self, entity: EntityId, amount: Fixed) {
        let map = self.world.map_id();
        self.scans.drain_belt(entity, self.tick, map, amount);
    }

    /// Record that a shield stopped a projectile.
    pub fn record_hit(
        &mut self,
        provider: &'static str,
        shield: EntityId,
        projectile: EntityId,
        point: Vec3Fixed,
        damage: Fixed,
        effect_scale: Fixed,
    ) {
        self.last_hit = Some((point, shield));
        self.events.push(InterceptEvent::ShieldAbsorbed {
            provider,
            shield,
            projectile,
            point,
            damage,
        });
        self.events.push(InterceptEvent::Effect {
            at: point,
            scale: effect_scale,
        });
    }

    /// Record that a shield ran dry.
    pub fn record_depleted(&mut self, provider: &'static str, shield: EntityId) {
        tracing::debug!(provider, shield, "Shield depleted");
        self.events.push(InterceptEvent::ShieldDepleted { provider, shield });
    }

    /// Take the most recent hit location, clearing it.
    pub fn take_hit(&mut self) -> Option<(Vec3Fixed, EntityId)> {
        self.last_hit.take()
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[InterceptEvent] {
        &self.events
    }

    /// Hand recorded events to the host.
    pub fn drain_events(&mut self) -> Vec<InterceptEvent> {
        std::mem::take(&mut self.events)
    }
}
