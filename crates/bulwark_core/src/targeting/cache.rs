//! Per-region index of attackable entities by hostility.

use std::collections::{BTreeMap, BTreeSet};

use crate::components::{Combatant, EntityId};
use crate::factions::FactionId;
use crate::targeting::TargetingWorld;

/// Attack targets of one region, grouped by the factions they are hostile to.
///
/// Entities in an aggressive mental state are hostile to everyone and are
/// listed in every searcher's candidates. Iteration order is by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetCache {
    all_targets: BTreeSet<EntityId>,
    hostile_to_faction: BTreeMap<FactionId, BTreeSet<EntityId>>,
    aggro: BTreeSet<EntityId>,
}

impl TargetCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache for `factions` and register every entity in `targets`.
    pub fn build(
        world: &dyn TargetingWorld,
        factions: impl IntoIterator<Item = FactionId>,
        targets: impl IntoIterator<Item = EntityId>,
    ) -> Self {
        let mut cache = Self::new();
        for faction in factions {
            cache.hostile_to_faction.entry(faction).or_default();
        }
        for target in targets {
            cache.notify_spawned(world, target);
        }
        cache
    }

    /// Every registered target.
    #[must_use]
    pub fn all_targets(&self) -> &BTreeSet<EntityId> {
        &self.all_targets
    }

    /// Targets hostile to `faction`. Empty for unknown factions.
    pub fn targets_hostile_to(&self, faction: FactionId) -> impl Iterator<Item = EntityId> + '_ {
        self.hostile_to_faction
            .get(&faction)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Targets in an aggressive mental state.
    #[must_use]
    pub fn aggro_targets(&self) -> &BTreeSet<EntityId> {
        &self.aggro
    }

    /// Factions the cache tracks.
    pub fn factions(&self) -> impl Iterator<Item = FactionId> + '_ {
        self.hostile_to_faction.keys().copied()
    }

    /// Whether `target` is registered.
    #[must_use]
    pub fn contains(&self, target: EntityId) -> bool {
        self.all_targets.contains(&target)
    }

    /// Register a target that appeared in the region.
    pub fn notify_spawned(&mut self, world: &dyn TargetingWorld, target: EntityId) {
        if !self.all_targets.insert(target) {
            tracing::warn!(target, "Tried to register the same attack target twice");
            return;
        }
        self.index(world, target);
    }

    /// Deregister a target that left the region.
    ///
    /// The region's [`AttackMemory`](crate::targeting::AttackMemory) must
    /// forget the entity too; [`Arena::despawn_tracked`](crate::arena::Arena::despawn_tracked)
    /// does both.
    pub fn notify_despawned(&mut self, target: EntityId) {
        if !self.all_targets.remove(&target) {
            tracing::warn!(target, "Tried to deregister an attack target that was not registered");
            return;
        }
        self.unindex(target);
    }

    /// Re-evaluate every target belonging to either faction.
    pub fn notify_faction_hostility_changed(
        &mut self,
        world: &dyn TargetingWorld,
        f1: FactionId,
        f2: FactionId,
    ) {
        let affected: Vec<EntityId> = self
            .all_targets
            .iter()
            .copied()
            .filter(|&id| {
                world
                    .combatant(id)
                    .and_then(|c| c.faction)
                    .is_some_and(|f| f == f1 || f == f2)
            })
            .collect();
        tracing::debug!(?f1, ?f2, count = affected.len(), "Re-indexing targets after hostility change");
        for target in affected {
            self.update_target(world, target);
        }
    }

    /// Start tracking a faction.
    pub fn notify_faction_added(&mut self, world: &dyn TargetingWorld, faction: FactionId) {
        let hostile: BTreeSet<EntityId> = self
            .all_targets
            .iter()
            .copied()
            .filter(|&id| world.is_hostile_to_faction(id, faction))
            .collect();
        self.hostile_to_faction.insert(faction, hostile);
    }

    /// Stop tracking a faction.
    pub fn notify_faction_removed(&mut self, faction: FactionId) {
        self.hostile_to_faction.remove(&faction);
    }

    /// Refresh the hostility entries of one target.
    pub fn update_target(&mut self, world: &dyn TargetingWorld, target: EntityId) {
        if !self.all_targets.contains(&target) {
            return;
        }
        self.unindex(target);
        self.index(world, target);
    }

    /// Candidates for `searcher`: targets hostile to its faction plus the
    /// aggressive ones, or every hostile target for factionless and
    /// aggressive searchers.
    ///
    /// Debug builds (and the `debug-validation` feature) re-check each
    /// faction entry and repair stale ones.
    pub fn potential_targets_for(
        &mut self,
        world: &dyn TargetingWorld,
        searcher: &Combatant,
    ) -> Vec<EntityId> {
        let faction = match searcher.faction {
            Some(faction) if !searcher.in_aggro_mental_state() => faction,
            _ => {
                return self
                    .all_targets
                    .iter()
                    .copied()
                    .filter(|&id| id != searcher.id && world.is_hostile(searcher.id, id))
                    .collect();
            }
        };

        if cfg!(any(debug_assertions, feature = "debug-validation")) {
            self.repair_stale(world, faction);
        }

        let mut targets: BTreeSet<EntityId> = self.targets_hostile_to(faction).collect();
        targets.extend(self.aggro.iter().copied());
        targets.remove(&searcher.id);
        targets.into_iter().collect()
    }

    fn repair_stale(&mut self, world: &dyn TargetingWorld, faction: FactionId) {
        let stale: Vec<EntityId> = self
            .targets_hostile_to(faction)
            .filter(|&id| !world.is_hostile_to_faction(id, faction))
            .collect();
        for target in stale {
            tracing::error!(
                target,
                ?faction,
                "Target listed as hostile to faction is no longer hostile; refreshing"
            );
            self.update_target(world, target);
        }
    }

    fn index(&mut self, world: &dyn TargetingWorld, target: EntityId) {
        for (&faction, set) in &mut self.hostile_to_faction {
            if world.is_hostile_to_faction(target, faction) {
                set.insert(target);
            }
        }
        if world
            .combatant(target)
            .is_some_and(Combatant::in_aggro_mental_state)
        {
            self.aggro.insert(target);
        }
    }

    fn unindex(&mut self, target: EntityId) {
        for set in self.hostile_to_faction.values_mut() {
            set.remove(&target);
        }
        self.aggro.remove(&target);
    }

    /// Check the cache against the world. Returns a list of problems.
    #[must_use]
    pub fn validate(&self, world: &dyn TargetingWorld) -> Vec<String> {
        let mut errors = Vec::new();
        for (&faction, set) in &self.hostile_to_faction {
            for &target in set {
                if !self.all_targets.contains(&target) {
                    errors.push(format!("{target} listed for {faction:?} but not registered"));
                }
                if !world.is_hostile_to_faction(target, faction) {
                    errors.push(format!("{target} listed for {faction:?} but not hostile"));
                }
            }
        }
        for &target in &self.aggro {
            if !self.all_targets.contains(&target) {
                errors.push(format!("{target} listed as aggressive but not registered"));
            }
        }
        errors
    }
}
