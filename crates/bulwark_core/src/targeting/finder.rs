//! Best attack target search.

use std::collections::{BTreeSet, VecDeque};

use rand::Rng;

use crate::components::{Combatant, DutyFocus, EntityId, Intelligence, Verb};
use crate::config::ScoringConfig;
use crate::error::{CoreError, Result};
use crate::math::{Cell, Fixed};
use crate::pathfinding::DIRECTIONS;
use crate::targeting::{
    score_target, weighted_pick, AttackMemory, TargetCache, TargetScanFlags, TargetSearchParams,
    TargetingWorld, Validator, UNBOUNDED_TRAVEL_RADIUS,
};

/// Picks attack targets for searchers in one region.
pub struct TargetSelector<'w> {
    world: &'w dyn TargetingWorld,
    config: &'w ScoringConfig,
}

impl<'w> TargetSelector<'w> {
    /// Create a selector over `world` using `config` for scoring.
    #[must_use]
    pub fn new(world: &'w dyn TargetingWorld, config: &'w ScoringConfig) -> Self {
        Self { world, config }
    }

    /// Find the best target for `searcher`.
    ///
    /// Searchers with a ranged attack (or `only_ranged` set) and not in an
    /// aggressive mental state take a weighted random pick among the targets
    /// they can hit without moving, or the closest valid target when there
    /// are none. Everyone else takes the closest reachable target.
    ///
    /// A successful pick is recorded in `memory` at the current tick.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EntityNotFound` if the searcher does not exist,
    /// and passes through any error the `validator` returns.
    pub fn best_attack_target<R: Rng + ?Sized>(
        &self,
        cache: &mut TargetCache,
        memory: &mut AttackMemory,
        searcher: EntityId,
        params: &TargetSearchParams,
        validator: Option<Validator<'_>>,
        rng: &mut R,
    ) -> Result<Option<EntityId>> {
        let searcher = self
            .world
            .combatant(searcher)
            .ok_or(CoreError::EntityNotFound(searcher))?;
        let Some(verb) = searcher.verb else {
            tracing::error!(searcher = searcher.id, "Searcher has no attack verb");
            return Ok(None);
        };

        let mut search = Search {
            world: self.world,
            searcher,
            verb,
            params,
            validator,
            duty_focus: None,
        };

        let ranged = (verb.ranged || params.only_ranged) && !searcher.in_aggro_mental_state();
        let found = if ranged {
            self.ranged_target(&search, cache, memory, rng)?
        } else {
            search.duty_focus = searcher
                .duty_focus
                .filter(|focus| focus.radius > Fixed::ZERO && !searcher.in_aggro_mental_state());
            self.melee_target(&search, cache)?
        };

        if let Some(target) = found {
            memory.record(searcher.id, target, self.world.tick());
            tracing::trace!(searcher = searcher.id, target, ranged, "Picked attack target");
        }
        Ok(found)
    }

    fn ranged_target<R: Rng + ?Sized>(
        &self,
        search: &Search<'w, '_>,
        cache: &mut TargetCache,
        memory: &AttackMemory,
        rng: &mut R,
    ) -> Result<Option<EntityId>> {
        let candidates: Vec<&'w Combatant> = cache
            .potential_targets_for(self.world, search.searcher)
            .into_iter()
            .filter_map(|id| self.world.combatant(id))
            .filter(|target| !search.should_ignore_non_combatant(target))
            .collect();

        let mut valid = Vec::with_capacity(candidates.len());
        let mut any_hittable = false;
        for target in candidates {
            if search.within_max_dist(target) && search.is_valid(target)? {
                any_hittable = any_hittable || search.can_hit_from_here(target);
                valid.push(target);
            }
        }

        if any_hittable {
            let scored: Vec<(EntityId, Fixed)> = valid
                .into_iter()
                .filter(|target| search.can_hit_from_here(target))
                .map(|target| {
                    let score = score_target(
                        self.world,
                        self.config,
                        memory,
                        search.searcher,
                        &search.verb,
                        target,
                    );
                    (target.id, score)
                })
                .collect();
            return Ok(weighted_pick(&scored, self.config.pick_window, rng));
        }

        let flags = search.params.flags;
        let reach_or_hit = flags.contains(TargetScanFlags::NEED_REACHABLE_IF_CANT_HIT_FROM_MY_POS)
            && !flags.contains(TargetScanFlags::NEED_REACHABLE);
        valid.sort_by_key(|target| (search.distance_squared(target), target.id));
        Ok(valid
            .into_iter()
            .find(|target| {
                !reach_or_hit || search.can_reach(target, None) || search.can_hit_from_here(target)
            })
            .map(|target| target.id))
    }

    fn melee_target(&self, search: &Search<'w, '_>, cache: &TargetCache) -> Result<Option<EntityId>> {
        let region_cap = if search.params.max_dist > self.config.unbounded_search_distance {
            None
        } else {
            Some(self.config.melee_region_cap)
        };

        let mut candidates: Vec<&'w Combatant> = cache
            .all_targets()
            .iter()
            .filter_map(|&id| self.world.combatant(id))
            .filter(|target| search.within_max_dist(target))
            .collect();
        candidates.sort_by_key(|target| (search.distance_squared(target), target.id));

        let mut pathfound = None;
        for target in candidates {
            if search.is_valid(target)? && search.can_reach(target, region_cap) {
                pathfound = Some(target);
                break;
            }
        }
        let Some(pathfound) = pathfound else {
            return Ok(None);
        };

        if search.searcher.collides_with_pawns {
            if let Some(adjacent) = self.reachable_melee_target(search)? {
                let origin = search.searcher.position;
                let d_path = origin.horizontal_distance(pathfound.position);
                let d_melee = origin.horizontal_distance(adjacent.position);
                if (d_path - d_melee).abs() < self.config.melee_prefer_margin {
                    return Ok(Some(adjacent.id));
                }
            }
        }
        Ok(Some(pathfound.id))
    }

    /// Flood fill outward from the searcher over passable cells and return the
    /// first valid target standing next to a visited cell.
    fn reachable_melee_target(&self, search: &Search<'w, '_>) -> Result<Option<&'w Combatant>> {
        let limit = search
            .params
            .max_dist
            .min(Fixed::from_num(self.config.melee_flood_steps));
        let limit_sq = squared(limit);
        let start = search.searcher.cell();
        let traverse = search.params.traverse();

        let mut visited = BTreeSet::from([start]);
        let mut checked = BTreeSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(cell) = queue.pop_front() {
            for (dx, dz) in DIRECTIONS {
                let next = cell.offset(dx, dz);
                if !self.world.in_bounds(next) {
                    continue;
                }
                if checked.insert(next) {
                    for target in self.world.attack_targets_at(next) {
                        if search.is_valid(target)? {
                            return Ok(Some(target));
                        }
                    }
                }
                if next.center().horizontal_distance_squared(start.center()) <= limit_sq
                    && self.world.is_passable(next, traverse)
                    && visited.insert(next)
                {
                    queue.push_back(next);
                }
            }
        }
        Ok(None)
    }
}

/// Squares saturate so that unbounded search distances compare as "anywhere".
fn squared(v: Fixed) -> Fixed {
    v.saturating_mul(v)
}

/// One search's fixed inputs.
struct Search<'w, 'v> {
    world: &'w dyn TargetingWorld,
    searcher: &'w Combatant,
    verb: Verb,
    params: &'v TargetSearchParams,
    validator: Option<Validator<'v>>,
    duty_focus: Option<DutyFocus>,
}

impl Search<'_, '_> {
    fn distance_squared(&self, target: &Combatant) -> Fixed {
        self.searcher
            .position
            .horizontal_distance_squared(target.position)
    }

    fn within_max_dist(&self, target: &Combatant) -> bool {
        self.distance_squared(target) <= squared(self.params.max_dist)
    }

    fn gas_blocks_sight(&self) -> bool {
        self.params
            .flags
            .contains(TargetScanFlags::LOS_BLOCKABLE_BY_GAS)
    }

    /// Sight from the searcher's cell to any cell the target occupies.
    fn can_see(&self, target: &Combatant) -> bool {
        let from = self.searcher.cell();
        let gas = self.gas_blocks_sight();
        target
            .occupied_cells()
            .any(|cell| self.world.line_of_sight(from, cell, true, gas))
    }

    /// In weapon range and in sight, without moving.
    fn can_hit_from_here(&self, target: &Combatant) -> bool {
        let dist_sq = self.distance_squared(target);
        dist_sq >= squared(self.verb.min_range)
            && dist_sq <= squared(self.verb.range)
            && self.can_see(target)
    }

    fn can_reach(&self, target: &Combatant, max_regions: Option<u32>) -> bool {
        self.world.can_reach(
            self.searcher.cell(),
            target.cell(),
            self.params.traverse(),
            max_regions,
        )
    }

    /// Non-combatant pawns are ignored when out of sight, or always with
    /// `IGNORE_NON_COMBATANTS`.
    fn should_ignore_non_combatant(&self, target: &Combatant) -> bool {
        let Some(traits) = target.pawn() else {
            return false;
        };
        if traits.is_combatant() {
            return false;
        }
        if self
            .params
            .flags
            .contains(TargetScanFlags::IGNORE_NON_COMBATANTS)
        {
            return true;
        }
        !self
            .world
            .line_of_sight(self.searcher.cell(), target.cell(), true, false)
    }

    fn is_valid(&self, target: &Combatant) -> Result<bool> {
        let searcher = self.searcher;
        let params = self.params;
        let flags = params.flags;

        if target.id == searcher.id {
            return Ok(false);
        }
        let dist_sq = self.distance_squared(target);
        if dist_sq < squared(params.min_dist) {
            return Ok(false);
        }
        if !params.can_take_targets_closer_than_min_range
            && self.verb.min_range > Fixed::ZERO
            && dist_sq < squared(self.verb.min_range)
        {
            return Ok(false);
        }
        if params.max_travel_radius < UNBOUNDED_TRAVEL_RADIUS {
            let locus = params.locus.unwrap_or(searcher.position);
            let bound = params.max_travel_radius.saturating_add(self.verb.range);
            if target.position.horizontal_distance_squared(locus) > squared(bound) {
                return Ok(false);
            }
        }
        if !self.world.is_hostile(searcher.id, target.id) {
            return Ok(false);
        }
        if let Some(validator) = self.validator {
            if !validator(target)? {
                return Ok(false);
            }
        }
        if let Some(focus) = self.duty_focus {
            if target.position.horizontal_distance_squared(focus.point) > squared(focus.radius) {
                return Ok(false);
            }
        }
        if flags.contains(TargetScanFlags::NEED_NOT_UNDER_THICK_ROOF)
            && self.world.has_thick_roof(target.cell())
        {
            return Ok(false);
        }
        if flags.intersects(TargetScanFlags::NEED_LOS_TO_ALL) && !self.can_see(target) {
            let required = if target.is_pawn() {
                TargetScanFlags::NEED_LOS_TO_PAWNS
            } else {
                TargetScanFlags::NEED_LOS_TO_NON_PAWNS
            };
            if flags.contains(required) {
                return Ok(false);
            }
        }
        if flags.intersects(TargetScanFlags::NEED_THREAT | TargetScanFlags::NEED_AUTO_TARGETABLE)
            && target.threat_is_disabled()
        {
            return Ok(false);
        }
        if flags.contains(TargetScanFlags::NEED_AUTO_TARGETABLE) && !target.auto_targetable {
            return Ok(false);
        }
        if flags.contains(TargetScanFlags::NEED_ACTIVE_THREAT) && !target.is_active_threat() {
            return Ok(false);
        }
        if flags.contains(TargetScanFlags::NEED_NON_BURNING) && target.burning {
            return Ok(false);
        }
        if target.wick_started
            && searcher
                .pawn()
                .is_some_and(|traits| traits.intelligence >= Intelligence::ToolUser)
        {
            return Ok(false);
        }
        if target.occupied_cells().all(|cell: Cell| self.world.is_fogged(cell)) {
            return Ok(false);
        }
        if flags.contains(TargetScanFlags::NEED_REACHABLE) && !self.can_reach(target, None) {
            return Ok(false);
        }
        Ok(true)
    }
}
