//! Built-in shield providers.
//!
//! Each provider models one shield integration and registers only on the
//! channels it implements. Hosts describe their shields through
//! [`ShieldWorld`]; providers never hold references into the host.

mod bombardment;
mod dome;
mod personal;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, MapId, PersonalShield};
use crate::config::ShieldConfig;
use crate::factions::FactionId;
use crate::intercept::{BlockFlags, BlockZone, Registry};
use crate::math::{fixed_serde, Fixed, Vec3Fixed};

pub use bombardment::BombardmentShieldProvider;
pub use dome::DomeShieldProvider;
pub use personal::PersonalShieldProvider;

/// Host-side queries the shield providers need.
pub trait ShieldWorld {
    /// Region being simulated.
    fn map_id(&self) -> MapId;

    /// Every shield emitter in the region, powered or not.
    fn shield_emitters(&self) -> Vec<ShieldEmitter>;

    /// Position of an entity, if it exists.
    fn position_of(&self, entity: EntityId) -> Option<Vec3Fixed>;

    /// Faction of an entity, if it has one.
    fn faction_of(&self, entity: EntityId) -> Option<FactionId>;

    /// Whether two (possibly absent) factions are hostile.
    fn factions_hostile(&self, a: Option<FactionId>, b: Option<FactionId>) -> bool;

    /// Personal shield worn by an entity.
    fn personal_shield(&self, entity: EntityId) -> Option<PersonalShield>;
}

/// A shield generator as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldEmitter {
    /// Emitter entity.
    pub id: EntityId,
    /// Owning faction.
    #[serde(default)]
    pub faction: Option<FactionId>,
    /// Center of the shield.
    pub center: Vec3Fixed,
    /// Shield radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Remaining energy.
    #[serde(with = "fixed_serde")]
    pub energy: Fixed,
    /// Generator has power.
    #[serde(default = "default_powered")]
    pub powered: bool,
    /// What the shield stops.
    pub flags: BlockFlags,
}

const fn default_powered() -> bool {
    true
}

impl ShieldEmitter {
    /// Create a powered emitter with no faction.
    #[must_use]
    pub fn new(id: EntityId, center: Vec3Fixed, radius: Fixed, energy: Fixed, flags: BlockFlags) -> Self {
        Self {
            id,
            faction: None,
            center,
            radius,
            energy,
            powered: true,
            flags,
        }
    }

    /// Builder method to set the owning faction.
    #[must_use]
    pub const fn with_faction(mut self, faction: FactionId) -> Self {
        self.faction = Some(faction);
        self
    }

    /// Powered with energy left.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.powered && self.energy > Fixed::ZERO
    }

    /// Whether a point lies inside the shield (height ignored).
    #[must_use]
    pub fn contains(&self, point: Vec3Fixed) -> bool {
        self.center.horizontal_distance_squared(point) <= self.radius * self.radius
    }

    /// The block zone this emitter projects.
    #[must_use]
    pub const fn zone(&self) -> BlockZone {
        BlockZone {
            center: self.center.horizontal_2d(),
            radius: self.radius,
            owner: self.id,
            flags: self.flags,
        }
    }

    /// Drain energy. Returns `true` when the shield is now empty.
    pub fn absorb(&mut self, damage: Fixed) -> bool {
        self.energy = (self.energy - damage).max(Fixed::ZERO);
        self.energy == Fixed::ZERO
    }
}

/// Zones of up emitters whose faction is not hostile to `entity`.
pub(crate) fn friendly_zones(
    world: &dyn ShieldWorld,
    shields: &[ShieldEmitter],
    entity: EntityId,
) -> Vec<BlockZone> {
    let faction = world.faction_of(entity);
    shields
        .iter()
        .filter(|s| s.is_up() && !world.factions_hostile(s.faction, faction))
        .map(ShieldEmitter::zone)
        .collect()
}

/// Register every built-in provider, in a fixed order.
pub fn register_builtin(registry: &mut Registry, config: &ShieldConfig) {
    registry.register(Arc::new(DomeShieldProvider::new(config.clone())));
    registry.register(Arc::new(BombardmentShieldProvider::new(config.clone())));
    registry.register(Arc::new(PersonalShieldProvider::new(config.clone())));
}
