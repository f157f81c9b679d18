//! Attack target selection.
//!
//! [`TargetSelector::best_attack_target`] filters the candidates a
//! [`TargetCache`] lists for a searcher, then either runs a weighted random
//! pick among targets it can shoot right now, or falls back to the closest
//! reachable target.
//!
//! The host answers sight, reachability and lookups through
//! [`TargetingWorld`].

mod cache;
mod finder;
mod memory;
mod pick;
mod score;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::components::{Combatant, EntityId};
use crate::error::Result;
use crate::factions::FactionId;
use crate::math::{fixed_serde, Cell, Fixed, Vec3Fixed};
use crate::pathfinding::TraverseParams;

pub use cache::TargetCache;
pub use finder::TargetSelector;
pub use memory::AttackMemory;
pub use pick::{pick_weights, weighted_pick};
pub use score::{friendly_fire_blast_offset, friendly_fire_cone_offset, score_target};

bitflags! {
    /// Requirements a target search imposes on candidates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TargetScanFlags: u16 {
        /// Pawns must be in sight.
        const NEED_LOS_TO_PAWNS                    = 1 << 0;
        /// Non-pawns must be in sight.
        const NEED_LOS_TO_NON_PAWNS                = 1 << 1;
        /// Everything must be in sight.
        const NEED_LOS_TO_ALL = Self::NEED_LOS_TO_PAWNS.bits() | Self::NEED_LOS_TO_NON_PAWNS.bits();
        /// Targets must be reachable on foot.
        const NEED_REACHABLE                       = 1 << 2;
        /// When nothing is hittable from here, the fallback must be reachable or hittable.
        const NEED_REACHABLE_IF_CANT_HIT_FROM_MY_POS = 1 << 3;
        /// Skip burning targets.
        const NEED_NON_BURNING                     = 1 << 4;
        /// Skip targets whose threat is disabled.
        const NEED_THREAT                          = 1 << 5;
        /// Only awake, active threats.
        const NEED_ACTIVE_THREAT                   = 1 << 6;
        /// Smoke blocks sight.
        const LOS_BLOCKABLE_BY_GAS                 = 1 << 7;
        /// Only targets open to automatic targeting.
        const NEED_AUTO_TARGETABLE                 = 1 << 8;
        /// Skip targets under a thick roof.
        const NEED_NOT_UNDER_THICK_ROOF            = 1 << 9;
        /// Ignore every non-combatant.
        const IGNORE_NON_COMBATANTS                = 1 << 10;
    }
}

/// Travel radius meaning "unbounded".
pub const UNBOUNDED_TRAVEL_RADIUS: Fixed = Fixed::const_from_int(9999);

/// Knobs for one target search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSearchParams {
    /// Candidate requirements.
    pub flags: TargetScanFlags,
    /// Skip targets closer than this.
    #[serde(with = "fixed_serde")]
    pub min_dist: Fixed,
    /// Skip targets farther than this.
    #[serde(with = "fixed_serde")]
    pub max_dist: Fixed,
    /// Point the searcher must stay near; defaults to its position.
    pub locus: Option<Vec3Fixed>,
    /// How far from `locus` the searcher may travel.
    #[serde(with = "fixed_serde")]
    pub max_travel_radius: Fixed,
    /// Path through closed doors.
    pub can_bash_doors: bool,
    /// Accept targets inside the weapon's minimum range.
    pub can_take_targets_closer_than_min_range: bool,
    /// Path through fences.
    pub can_bash_fences: bool,
    /// Always use the ranged branch.
    pub only_ranged: bool,
}

impl Default for TargetSearchParams {
    fn default() -> Self {
        Self {
            flags: TargetScanFlags::empty(),
            min_dist: Fixed::ZERO,
            max_dist: UNBOUNDED_TRAVEL_RADIUS,
            locus: None,
            max_travel_radius: UNBOUNDED_TRAVEL_RADIUS,
            can_bash_doors: false,
            can_take_targets_closer_than_min_range: false,
            can_bash_fences: false,
            only_ranged: false,
        }
    }
}

impl TargetSearchParams {
    /// Builder method to set scan flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: TargetScanFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Builder method to set the maximum distance.
    #[must_use]
    pub const fn with_max_dist(mut self, max_dist: Fixed) -> Self {
        self.max_dist = max_dist;
        self
    }

    /// Movement allowances implied by the bash flags.
    #[must_use]
    pub const fn traverse(&self) -> TraverseParams {
        TraverseParams {
            can_bash_doors: self.can_bash_doors,
            can_bash_fences: self.can_bash_fences,
        }
    }
}

/// Caller-supplied extra check on candidates. An `Err` aborts the search.
pub type Validator<'v> = &'v dyn Fn(&Combatant) -> Result<bool>;

/// Host-side queries the target selector needs.
pub trait TargetingWorld {
    /// Current simulation tick.
    fn tick(&self) -> u64;

    /// Snapshot of an entity.
    fn combatant(&self, id: EntityId) -> Option<&Combatant>;

    /// Attackable entities occupying `cell`.
    fn attack_targets_at(&self, cell: Cell) -> Vec<&Combatant>;

    /// Whether `cell` is on the map.
    fn in_bounds(&self, cell: Cell) -> bool;

    /// Whether `a` is hostile to `b`.
    fn is_hostile(&self, a: EntityId, b: EntityId) -> bool;

    /// Whether `entity` is hostile to `faction`.
    fn is_hostile_to_faction(&self, entity: EntityId, faction: FactionId) -> bool;

    /// Sight line between two cells.
    fn line_of_sight(&self, from: Cell, to: Cell, skip_first_cell: bool, blockable_by_gas: bool) -> bool;

    /// Whether sight passes over `cell`.
    fn can_be_seen_over(&self, cell: Cell) -> bool;

    /// Whether `cell` is hidden by fog of war.
    fn is_fogged(&self, cell: Cell) -> bool;

    /// Whether `cell` is under a thick roof.
    fn has_thick_roof(&self, cell: Cell) -> bool;

    /// Whether a traverser may stand in `cell`.
    fn is_passable(&self, cell: Cell, traverse: TraverseParams) -> bool;

    /// Whether a traverser can get next to `to`, searching at most
    /// `max_regions` regions.
    fn can_reach(&self, from: Cell, to: Cell, traverse: TraverseParams, max_regions: Option<u32>) -> bool;

    /// Chance (0..1) that cover near the target blocks a shot from `shooter_cell`.
    fn cover_block_chance(&self, target_cell: Cell, shooter_cell: Cell) -> Fixed;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_los_to_all_covers_both() {
        assert!(TargetScanFlags::NEED_LOS_TO_ALL.contains(TargetScanFlags::NEED_LOS_TO_PAWNS));
        assert!(TargetScanFlags::NEED_LOS_TO_ALL.contains(TargetScanFlags::NEED_LOS_TO_NON_PAWNS));
    }

    #[test]
    fn test_default_params_unbounded() {
        let params = TargetSearchParams::default();
        assert_eq!(params.max_travel_radius, UNBOUNDED_TRAVEL_RADIUS);
        assert_eq!(params.traverse(), TraverseParams::NORMAL);
    }

    #[test]
    fn test_params_from_ron() {
        let params: TargetSearchParams = ron::from_str("(only_ranged: true)").unwrap();
        assert!(params.only_ranged);
        assert_eq!(params.max_dist, UNBOUNDED_TRAVEL_RADIUS);
    }
}
