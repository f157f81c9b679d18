//! Scenario runners: repeated target picks and a projectile flight.

use std::collections::BTreeMap;

use bulwark_core::arena::Arena;
use bulwark_core::components::{EntityId, Projectile};
use bulwark_core::config::{ScoringConfig, ShieldConfig};
use bulwark_core::intercept::providers::register_builtin;
use bulwark_core::intercept::{
    InterceptContext, InterceptEvent, InterceptionEngine, InterceptionResult, Registry,
    ShieldScanCache,
};
use bulwark_core::math::{Fixed, Vec3Fixed};
use bulwark_core::targeting::{
    AttackMemory, TargetScanFlags, TargetSearchParams, TargetSelector, TargetingWorld,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::{Point, ToolError, ToolResult};

/// Entity id given to the probe projectile.
pub const PROBE_PROJECTILE: EntityId = EntityId::MAX;

/// Parse flag names like `need_los_to_all` or `NEED-REACHABLE`.
pub fn parse_flags<S: AsRef<str>>(names: &[S]) -> ToolResult<TargetScanFlags> {
    names.iter().try_fold(TargetScanFlags::empty(), |acc, name| {
        let name = name.as_ref().trim();
        let normalized = name.to_uppercase().replace('-', "_");
        TargetScanFlags::from_name(&normalized)
            .map(|flag| acc | flag)
            .ok_or_else(|| ToolError::UnknownFlag(name.to_string()))
    })
}

/// Picks made for one searcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectReport {
    /// Searcher entity.
    pub searcher: EntityId,
    /// RNG seed.
    pub seed: u64,
    /// Every pick, in order.
    pub picks: Vec<Option<EntityId>>,
    /// How often each target was picked; `none` counts empty picks.
    pub tally: BTreeMap<String, u32>,
}

/// Run `picks` target searches for `searcher` with one seeded RNG.
///
/// The attack memory carries over between picks, so later picks see the
/// sticky bonus of earlier ones.
///
/// # Errors
///
/// Returns an error if the searcher does not exist.
pub fn select(
    arena: &Arena,
    config: &ScoringConfig,
    searcher: EntityId,
    params: &TargetSearchParams,
    picks: u32,
    seed: u64,
) -> ToolResult<SelectReport> {
    let selector = TargetSelector::new(arena, config);
    let mut cache = arena.target_cache();
    let mut memory = AttackMemory::new();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut report = SelectReport {
        searcher,
        seed,
        picks: Vec::with_capacity(picks as usize),
        tally: BTreeMap::new(),
    };
    for _ in 0..picks {
        let pick =
            selector.best_attack_target(&mut cache, &mut memory, searcher, params, None, &mut rng)?;
        let key = pick.map_or_else(|| "none".to_string(), |id| id.to_string());
        *report.tally.entry(key).or_default() += 1;
        report.picks.push(pick);
    }
    Ok(report)
}

/// A projectile to fly through an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireRequest {
    /// Who fires.
    pub launcher: Option<EntityId>,
    /// Launch point.
    pub origin: Vec3Fixed,
    /// Aim point.
    pub destination: Vec3Fixed,
    /// Damage carried.
    pub damage: u32,
    /// Overhead flight.
    pub overhead: bool,
    /// Entity hit on arrival, for the personal shield check.
    pub victim: Option<EntityId>,
}

/// What happened to the projectile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireReport {
    /// Flight steps taken.
    pub steps: u32,
    /// Where it was stopped, if it was.
    pub stopped_at: Option<Point>,
    /// Entity that stopped it.
    pub stopped_by: Option<EntityId>,
    /// Events the providers recorded.
    pub events: Vec<InterceptEvent>,
}

/// Fly a projectile one cell-length step at a time through the built-in
/// shield providers.
#[must_use]
pub fn fire(arena: &Arena, shields: &ShieldConfig, request: &FireRequest) -> FireReport {
    let mut registry = Registry::new();
    register_builtin(&mut registry, shields);
    let engine = InterceptionEngine::new(&registry);
    let mut scans = ShieldScanCache::new();
    let mut ctx = InterceptContext::new(arena.tick(), arena, &mut scans);

    let mut projectile = Projectile::launch(
        PROBE_PROJECTILE,
        request.launcher,
        request.origin,
        request.destination,
        request.damage,
    );
    if request.overhead {
        projectile = projectile.overhead();
    }

    let length = request.origin.horizontal_distance(request.destination);
    let total = length.ceil().to_num::<u32>().max(1);
    let mut steps = 0;
    let mut result = InterceptionResult::NoIntercept;

    for i in 1..=total {
        steps = i;
        let next = if i == total {
            request.destination
        } else {
            request
                .origin
                .lerp(request.destination, Fixed::from_num(i) / Fixed::from_num(total))
        };
        result = engine.step(&mut ctx, &projectile, next);
        if result.is_intercepted() {
            break;
        }
        projectile.position = next;
    }

    if !result.is_intercepted() {
        result = match request.victim {
            Some(victim) => engine.before_collide(&mut ctx, &projectile, victim),
            None if !request.overhead => engine.impact(&mut ctx, &projectile),
            None => result,
        };
    }

    let (stopped_at, stopped_by) = match result {
        InterceptionResult::Intercepted { point, owner } => (Some(Point::from(point)), owner),
        InterceptionResult::NoIntercept => (None, None),
    };
    tracing::debug!(steps, stopped = stopped_at.is_some(), "Projectile flight finished");
    FireReport {
        steps,
        stopped_at,
        stopped_by,
        events: ctx.drain_events(),
    }
}
