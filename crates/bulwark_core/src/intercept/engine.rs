//! Per-step interception queries over a shared [`Registry`].

use crate::components::{EntityId, Projectile};
use crate::geometry::ShotLine;
use crate::intercept::{BlockZone, FireMode, InterceptContext, InterceptionResult, Registry};
use crate::math::{Cell, Vec3Fixed};

/// Asks registered providers whether a projectile gets stopped.
#[derive(Debug, Clone, Copy)]
pub struct InterceptionEngine<'r> {
    registry: &'r Registry,
}

impl<'r> InterceptionEngine<'r> {
    /// Wrap a registry.
    #[must_use]
    pub const fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// The wrapped registry.
    #[must_use]
    pub const fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Check one flight step of `projectile` from its position to `next`.
    ///
    /// Direct fire is tested against the whole step, then per cell walked.
    /// Overhead fire is only tested in the cell it reaches, and on landing.
    pub fn step(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        next: Vec3Fixed,
    ) -> InterceptionResult {
        ctx.take_hit();
        let launcher = projectile.launcher;

        let blocked = if projectile.flies_overhead {
            self.registry
                .check_cell(ctx, projectile, Cell::containing(next), launcher)
                || (next == projectile.destination
                    && self.registry.on_impact(ctx, projectile, launcher))
        } else {
            self.registry
                .check_path(ctx, projectile, projectile.position, next)
                || ShotLine::new(projectile.position, next)
                    .cells()
                    .any(|cell| self.registry.check_cell(ctx, projectile, cell, launcher))
        };

        Self::resolve(ctx, blocked, projectile.position)
    }

    /// Check a projectile whose flight has concluded.
    pub fn impact(&self, ctx: &mut InterceptContext<'_>, projectile: &Projectile) -> InterceptionResult {
        ctx.take_hit();
        let blocked = self
            .registry
            .on_impact(ctx, projectile, projectile.launcher);
        Self::resolve(ctx, blocked, projectile.position)
    }

    /// Check a projectile just before it damages `victim`.
    pub fn before_collide(
        &self,
        ctx: &mut InterceptContext<'_>,
        projectile: &Projectile,
        victim: EntityId,
    ) -> InterceptionResult {
        ctx.take_hit();
        let blocked = self.registry.before_collide(ctx, projectile, victim);
        Self::resolve(ctx, blocked, projectile.position)
    }

    fn resolve(
        ctx: &mut InterceptContext<'_>,
        blocked: bool,
        fallback: Vec3Fixed,
    ) -> InterceptionResult {
        if !blocked {
            return InterceptionResult::NoIntercept;
        }
        match ctx.take_hit() {
            Some((point, owner)) => InterceptionResult::Intercepted {
                point,
                owner: Some(owner),
            },
            None => InterceptionResult::Intercepted {
                point: fallback,
                owner: None,
            },
        }
    }

    /// Closest crossing of `from → to` among zones able to stop `fire`.
    ///
    /// Pure geometry: no provider is consulted and no energy is drained.
    #[must_use]
    pub fn trace_zones(
        zones: &[BlockZone],
        from: Vec3Fixed,
        to: Vec3Fixed,
        fire: FireMode,
    ) -> InterceptionResult {
        let required = fire.required_flag();
        zones
            .iter()
            .filter(|zone| zone.flags.contains(required))
            .filter_map(|zone| zone.intercept(from, to).map(|point| (zone.owner, point)))
            .min_by_key(|&(_, point)| from.distance_squared(point))
            .map_or(InterceptionResult::NoIntercept, |(owner, point)| {
                InterceptionResult::Intercepted {
                    point,
                    owner: Some(owner),
                }
            })
    }
}
