//! Provider registry with six independent interception channels.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::components::{EntityId, Projectile};
use crate::geometry::RadialCells;
use crate::intercept::{BlockZone, InterceptContext};
use crate::math::{Cell, Vec3Fixed};

bitflags! {
    /// Interception channels a provider can serve.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Channels: u8 {
        /// Direct-fire test against the flight path.
        const CHECK_PATH     = 1 << 0;
        /// Test for the cell a projectile occupies.
        const CHECK_CELL     = 1 << 1;
        /// Test when a flight concludes.
        const ON_IMPACT      = 1 << 2;
        /// Last-moment test before damaging a victim.
        const BEFORE_COLLIDE = 1 << 3;
        /// Zone enumeration for suppression.
        const SHIELD_ZONES   = 1 << 4;
        /// Suppression immunity.
        const UNSUPPRESSABLE = 1 << 5;
    }
}

/// A pluggable interception integration.
///
/// Every channel method defaults to the neutral answer, so a provider only
/// overrides the channels it declares in [`InterceptProvider::channels`].
/// The registry never calls a method for an undeclared channel.
pub trait InterceptProvider: Send + Sync {
    /// Stable provider name.
    fn name(&self) -> &'static str;

    /// Channels this provider serves.
    fn channels(&self) -> Channels;

    /// Whether the path `from → to` is blocked.
    fn check_path(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _projectile: &Projectile,
        _from: Vec3Fixed,
        _to: Vec3Fixed,
    ) -> bool {
        false
    }

    /// Whether the projectile is blocked in `cell`.
    fn check_cell(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _projectile: &Projectile,
        _cell: Cell,
        _launcher: Option<EntityId>,
    ) -> bool {
        false
    }

    /// Whether the projectile is blocked on landing.
    fn on_impact(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _projectile: &Projectile,
        _launcher: Option<EntityId>,
    ) -> bool {
        false
    }

    /// Whether the projectile is blocked just before hitting `victim`.
    fn before_collide(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _projectile: &Projectile,
        _victim: EntityId,
    ) -> bool {
        false
    }

    /// Zones that shelter `entity`.
    fn shield_zones(&self, _ctx: &mut InterceptContext<'_>, _entity: EntityId) -> Vec<BlockZone> {
        Vec::new()
    }

    /// Whether `pawn` cannot be suppressed by fire from `origin`.
    fn unsuppressable_from(
        &self,
        _ctx: &mut InterceptContext<'_>,
        _pawn: EntityId,
        _origin: Vec3Fixed,
    ) -> bool {
        false
    }
}

type ProviderHandle = Arc<dyn InterceptProvider>;

/// Registered providers, one list per channel.
///
/// Populated once during startup, then shared read-only (`&Registry`)
/// between every region.
#[derive(Default)]
pub struct Registry {
    providers: Vec<ProviderHandle>,
    check_path: Vec<ProviderHandle>,
    check_cell: Vec<ProviderHandle>,
    on_impact: Vec<ProviderHandle>,
    before_collide: Vec<ProviderHandle>,
    shield_zones: Vec<ProviderHandle>,
    unsuppressable: Vec<ProviderHandle>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.provider_names())
            .field("enabled", &self.enabled_channels())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry. Every channel starts inert.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to every channel it declares.
    ///
    /// Registration is not deduplicated.
    pub fn register(&mut self, provider: ProviderHandle) {
        let channels = provider.channels();
        let name = provider.name();
        if channels.is_empty() {
            tracing::warn!(provider = name, "Provider declares no channels; ignoring");
            return;
        }

        for (channel, list) in self.channel_lists_mut() {
            if !channels.contains(channel) {
                continue;
            }
            if list.is_empty() {
                tracing::debug!(provider = name, channel = ?channel, "Interception channel enabled");
            }
            list.push(Arc::clone(&provider));
        }
        tracing::info!(provider = name, channels = ?channels, "Registered interception provider");
        self.providers.push(provider);
    }

    fn channel_lists_mut(&mut self) -> [(Channels, &mut Vec<ProviderHandle>); 6] {
        [
            (Channels::CHECK_PATH, &mut self.check_path),
            (Channels::CHECK_CELL, &mut self.check_cell),
            (Channels::ON_IMPACT, &mut self.on_impact),
            (Channels::BEFORE_COLLIDE, &mut self.before_collide),
            (Channels::SHIELD_ZONES, &mut self.shield_zones),
            (Channels::UNSUPPRESSABLE, &mut self.unsuppressable),
        ]
    }

    /// Channels with at least one provider.
    #[must_use]
    pub fn enabled_channels(&self) -> Channels {
        [
            (Channels::CHECK_PATH, &self.check_path),
            (Channels::CHECK_CELL, &self.check_cell),
            (Channels::ON_IMPACT, &self.on_impact),
            (Channels::BEFORE_COLLIDE, &self.before_collide),
            (Channels::SHIELD_ZONES, &self.shield_zones),
            (Channels::UNSUPPRESSABLE, &self.unsuppressable),
        ]
        .into_iter()
        .filter(|(_, list)| !list.is_empty())
        .fold(Channels::empty(), |acc, (channel, _)| acc | channel)
    }

    /// Names of registered providers, in registration order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Whether any provider blocks the path `from → to`.
    pub fn check_path(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        from: Vec3Fixed,
        to: Vec3Fixed,
    ) -> bool {
        self.check_path
            .iter()
            .any(|p| p.check_path(ctx, projectile, from, to))
    }

    /// Whether any provider blocks the projectile in `cell`.
    pub fn check_cell(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        cell: Cell,
        launcher: Option<EntityId>,
    ) -> bool {
        self.check_cell
            .iter()
            .any(|p| p.check_cell(ctx, projectile, cell, launcher))
    }

    /// Whether any provider blocks the projectile on landing.
    pub fn on_impact(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        launcher: Option<EntityId>,
    ) -> bool {
        self.on_impact
            .iter()
            .any(|p| p.on_impact(ctx, projectile, launcher))
    }

    /// Whether any provider blocks the projectile before it hits `victim`.
    pub fn before_collide(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        victim: EntityId,
    ) -> bool {
        self.before_collide
            .iter()
            .any(|p| p.before_collide(ctx, projectile, victim))
    }

    /// Whether any provider makes `pawn` immune to suppression from `origin`.
    pub fn unsuppressable_from(
        &self,
        ctx: &mut InterceptContext<'_>,
        pawn: EntityId,
        origin: Vec3Fixed,
    ) -> bool {
        self.unsuppressable
            .iter()
            .any(|p| p.unsuppressable_from(ctx, pawn, origin))
    }

    /// Every provider's shelter zones for `entity`, as lazy cell groups.
    pub fn enumerate_shield_zones(
        &self,
        ctx: &mut InterceptContext<'_>,
        entity: EntityId,
    ) -> impl Iterator<Item = RadialCells> {
        let zones: Vec<BlockZone> = self
            .shield_zones
            .iter()
            .flat_map(|p| p.shield_zones(ctx, entity))
            .collect();
        zones.into_iter().map(|zone| zone.cells())
    }

    /// Raw zones for `entity`, in registration order.
    pub fn shield_zones(&self, ctx: &mut InterceptContext<'_>, entity: EntityId) -> Vec<BlockZone> {
        self.shield_zones
            .iter()
            .flat_map(|p| p.shield_zones(ctx, entity))
            .collect()
    }
}
