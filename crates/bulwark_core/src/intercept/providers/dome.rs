//! Direct-fire dome shields.

use crate::components::{EntityId, Projectile};
use crate::config::ShieldConfig;
use crate::intercept::providers::friendly_zones;
use crate::intercept::{BlockFlags, BlockZone, Channels, InterceptContext, InterceptProvider};
use crate::math::{Fixed, Vec3Fixed};

/// Domes that stop straight-line fire crossing their boundary.
#[derive(Debug, Clone, Default)]
pub struct DomeShieldProvider {
    config: ShieldConfig,
}

impl DomeShieldProvider {
    /// Provider name used for cache keys and events.
    pub const NAME: &'static str = "dome";

    /// Create the provider.
    #[must_use]
    pub const fn new(config: ShieldConfig) -> Self {
        Self { config }
    }
}

fn is_dome(shield: &super::ShieldEmitter) -> bool {
    shield.flags.contains(BlockFlags::DIRECT_FIRE)
}

/// A shot is leaving when its backward direction points toward the center.
fn is_outgoing(from: Vec3Fixed, to: Vec3Fixed, point: Vec3Fixed, center: Vec3Fixed) -> bool {
    let backward = (from - to).horizontal();
    let inward = (center - point).horizontal();
    backward.dot(inward) > Fixed::ZERO
}

impl InterceptProvider for DomeShieldProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn channels(&self) -> Channels {
        Channels::CHECK_PATH | Channels::SHIELD_ZONES | Channels::UNSUPPRESSABLE
    }

    fn check_path(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        from: Vec3Fixed,
        to: Vec3Fixed,
    ) -> bool {
        if projectile.flies_overhead {
            return false;
        }
        let damage = projectile.damage_fixed();

        let hit = {
            let shields = ctx.active_shields(Self::NAME, is_dome);
            let nearest = shields
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_up())
                .filter_map(|(index, shield)| {
                    let point = shield.zone().intercept(from, to)?;
                    let outgoing = is_outgoing(from, to, point, shield.center);
                    if outgoing && !shield.flags.contains(BlockFlags::OUTGOING_FIRE) {
                        return None;
                    }
                    Some((index, point, from.distance_squared(point)))
                })
                .min_by_key(|&(_, _, dist_sq)| dist_sq);

            nearest.map(|(index, point, _)| {
                let shield = &mut shields[index];
                let depleted = shield.absorb(damage);
                (shield.id, point, depleted)
            })
        };

        let Some((shield, point, depleted)) = hit else {
            return false;
        };
        tracing::debug!(
            tick = ctx.tick(),
            shield,
            projectile = projectile.id,
            "Dome shield absorbed projectile"
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

    fn shield_zones(&self, ctx: &mut InterceptContext<'_>, entity: EntityId) -> Vec<BlockZone> {
        let world = ctx.world();
        let shields = ctx.active_shields(Self::NAME, is_dome);
        friendly_zones(world, shields, entity)
    }

    fn unsuppressable_from(
        &self,
        ctx: &mut InterceptContext<'_>,
        pawn: EntityId,
        origin: Vec3Fixed,
    ) -> bool {
        let Some(position) = ctx.world().position_of(pawn) else {
            return false;
        };
        ctx.active_shields(Self::NAME, is_dome)
            .iter()
            .any(|s| s.is_up() && s.contains(position) && !s.contains(origin))
    }
}
