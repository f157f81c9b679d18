//! Faction identifiers and the hostility table between them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Unique identifier for factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(pub u32);

/// Symmetric hostility relation between factions.
///
/// Pairs are stored with the lower id first so lookups are order-independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRelations {
    #[serde(default)]
    factions: BTreeSet<FactionId>,
    #[serde(default)]
    hostile: BTreeSet<(FactionId, FactionId)>,
}

impl FactionRelations {
    /// Create an empty relation table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a faction. Returns `false` if it was already known.
    pub fn add_faction(&mut self, faction: FactionId) -> bool {
        self.factions.insert(faction)
    }

    /// Remove a faction and every hostility involving it.
    pub fn remove_faction(&mut self, faction: FactionId) -> bool {
        self.hostile.retain(|&(a, b)| a != faction && b != faction);
        self.factions.remove(&faction)
    }

    /// All known factions in id order.
    pub fn factions(&self) -> impl Iterator<Item = FactionId> + '_ {
        self.factions.iter().copied()
    }

    /// Set or clear hostility between two factions.
    pub fn set_hostile(&mut self, a: FactionId, b: FactionId, hostile: bool) {
        if a == b {
            return;
        }
        self.factions.insert(a);
        self.factions.insert(b);
        let key = ordered(a, b);
        if hostile {
            self.hostile.insert(key);
        } else {
            self.hostile.remove(&key);
        }
    }

    /// Whether two factions are hostile. A faction is never hostile to itself.
    #[must_use]
    pub fn are_hostile(&self, a: FactionId, b: FactionId) -> bool {
        a != b && self.hostile.contains(&ordered(a, b))
    }
}

fn ordered(a: FactionId, b: FactionId) -> (FactionId, FactionId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
