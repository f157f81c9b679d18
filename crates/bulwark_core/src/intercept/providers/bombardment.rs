//! Shields against overhead fire.
//!
//! Overhead munitions have no meaningful angle of incidence, so these
//! shields only test whether the landing point lies inside them.

use crate::components::{EntityId, Projectile};
use crate::config::ShieldConfig;
use crate::intercept::providers::{friendly_zones, ShieldEmitter};
use crate::intercept::{BlockFlags, BlockZone, Channels, InterceptContext, InterceptProvider};
use crate::math::{Cell, Vec3Fixed};

/// Shields that stop shells landing inside them.
#[derive(Debug, Clone, Default)]
pub struct BombardmentShieldProvider {
    config: ShieldConfig,
}

impl BombardmentShieldProvider {
    /// Provider name used for cache keys and events.
    pub const NAME: &'static str = "bombardment";

    /// Create the provider.
    #[must_use]
    pub const fn new(config: ShieldConfig) -> Self {
        Self { config }
    }

    /// Stop `projectile` at `point` if an up shield covers both the point and
    /// the landing spot but not the launch spot.
    fn try_block(&self, ctx: &mut InterceptContext<'_>, projectile: &Projectile, point: Vec3Fixed) -> bool {
        if !projectile.flies_overhead {
            return false;
        }
        let damage = projectile.damage_fixed();

        let hit = {
            let shields = ctx.active_shields(Self::NAME, is_bombardment);
            let nearest = shields
                .iter()
                .enumerate()
                .filter(|(_, s)| {
                    s.is_up()
                        && s.contains(point)
                        && s.contains(projectile.destination)
                        && !s.contains(projectile.origin)
                })
                .min_by_key(|(_, s)| s.center.horizontal_distance_squared(point))
                .map(|(index, _)| index);

            nearest.map(|index| {
                let shield = &mut shields[index];
                let depleted = shield.absorb(damage);
                (shield.id, depleted)
            })
        };

        let Some((shield, depleted)) = hit else {
            return false;
        };
        tracing::debug!(
            tick = ctx.tick(),
            shield,
            projectile = projectile.id,
            "Bombardment shield absorbed projectile"
        );
        ctx.record_hit(
            Self::NAME,
            shield,
            projectile.id,
            point,
            damage,
            self.config.effect_scale(damage),
        );
        if depleted {
            ctx.record_depleted(Self::NAME, shield);
        }
        true
    }
}

fn is_bombardment(shield: &ShieldEmitter) -> bool {
    shield.flags.contains(BlockFlags::INDIRECT_FIRE)
}

impl InterceptProvider for BombardmentShieldProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn channels(&self) -> Channels {
        Channels::CHECK_CELL | Channels::ON_IMPACT | Channels::SHIELD_ZONES
    }

    fn check_cell(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        cell: Cell,
        _launcher: Option<EntityId>,
    ) -> bool {
        self.try_block(ctx, projectile, cell.center())
    }

    fn on_impact(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        _launcher: Option<EntityId>,
    ) -> bool {
        self.try_block(ctx, projectile, projectile.destination)
    }

    fn shield_zones(&self, ctx: &mut InterceptContext<'_>, entity: EntityId) -> Vec<BlockZone> {
        let world = ctx.world();
        let shields = ctx.active_shields(Self::NAME, is_bombardment);
        friendly_zones(world, shields, entity)
    }
}
