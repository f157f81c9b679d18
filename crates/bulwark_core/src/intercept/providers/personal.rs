//! Personal shield belts.

use crate::components::{EntityId, Projectile};
use crate::config::ShieldConfig;
use crate::intercept::{Channels, InterceptContext, InterceptProvider};
use crate::math::Vec3Fixed;

/// Belts worn by pawns that stop direct fire at the last moment.
#[derive(Debug, Clone, Default)]
pub struct PersonalShieldProvider {
    config: ShieldConfig,
}

impl PersonalShieldProvider {
    /// Provider name used for events.
    pub const NAME: &'static str = "personal";

    /// Create the provider.
    #[must_use]
    pub const fn new(config: ShieldConfig) -> Self {
        Self { config }
    }
}

impl InterceptProvider for PersonalShieldProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn channels(&self) -> Channels {
        Channels::BEFORE_COLLIDE | Channels::UNSUPPRESSABLE
    }

    fn before_collide(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        victim: EntityId,
    ) -> bool {
        if projectile.flies_overhead {
            return false;
        }
        let Some(shield) = ctx.personal_shield(victim).filter(|s| s.is_active()) else {
            return false;
        };
        let Some(position) = ctx.world().position_of(victim) else {
            return false;
        };
        // Point-blank shots get under the belt.
        let reach = self.config.point_blank_range;
        if projectile.origin.horizontal_distance_squared(position) <= reach * reach {
            return false;
        }

        let damage = projectile.damage_fixed();
        ctx.record_hit(
            Self::NAME,
            victim,
            projectile.id,
            position,
            damage,
            self.config.effect_scale(damage),
        );
        ctx.drain_personal_shield(victim, damage);
        if shield.energy <= damage {
            ctx.record_depleted(Self::NAME, victim);
        }
        true
    }

    fn unsuppressable_from(
        &self,
        ctx: &mut InterceptContext<'_>,
        pawn: EntityId,
        _origin: Vec3Fixed,
    ) -> bool {
        ctx.personal_shield(pawn).is_some_and(|s| s.is_active())
    }
}
