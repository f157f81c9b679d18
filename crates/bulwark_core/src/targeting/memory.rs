//! Who each searcher attacked last, and when.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;

/// Last attacked target per searcher, for the sticky-target bonus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackMemory {
    last: BTreeMap<EntityId, (EntityId, u64)>,
}

impl AttackMemory {
    /// Create an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `searcher` attacked `target` at `tick`.
    pub fn record(&mut self, searcher: EntityId, target: EntityId, tick: u64) {
        self.last.insert(searcher, (target, tick));
    }

    /// Last target and tick for `searcher`.
    #[must_use]
    pub fn last_attack(&self, searcher: EntityId) -> Option<(EntityId, u64)> {
        self.last.get(&searcher).copied()
    }

    /// Whether `target` is the searcher's target from at most `window` ticks ago.
    #[must_use]
    pub fn is_sticky(&self, searcher: EntityId, target: EntityId, now: u64, window: u64) -> bool {
        self.last_attack(searcher)
            .is_some_and(|(last, tick)| last == target && now.saturating_sub(tick) <= window)
    }

    /// Drop everything about an entity that left the region.
    pub fn forget(&mut self, entity: EntityId) {
        self.last.remove(&entity);
        self.last.retain(|_, (target, _)| *target != entity);
    }
}
