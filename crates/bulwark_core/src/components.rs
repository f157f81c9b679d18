//! Entity snapshot definitions.
//!
//! Components are pure data with no behavior beyond small derived queries.
//! The host simulation owns the real entities; the core only ever sees these
//! snapshots through [`TargetingWorld`](crate::targeting::TargetingWorld) and
//! [`ShieldWorld`](crate::intercept::providers::ShieldWorld).

use serde::{Deserialize, Serialize};

use crate::factions::FactionId;
use crate::math::{fixed_serde, Cell, Fixed, Vec3Fixed};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Identifier of a simulated region (map).
pub type MapId = u32;

// ============================================================================
// Combatants
// ============================================================================

/// Body plan of a pawn, used for friendly-fire weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Race {
    /// People.
    #[default]
    Humanlike,
    /// Animals.
    Animal,
    /// Mechanical units.
    Mechanoid,
}

/// Intelligence tiers, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Intelligence {
    /// Instinct only.
    Animal,
    /// Can use tools and weapons.
    ToolUser,
    /// Full reasoning.
    #[default]
    Humanlike,
}

/// Pawn-specific traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PawnTraits {
    /// Body plan.
    #[serde(default)]
    pub race: Race,
    /// Intelligence tier.
    #[serde(default)]
    pub intelligence: Intelligence,
    /// Child or otherwise juvenile.
    #[serde(default)]
    pub juvenile: bool,
    /// Never fights (civilians, pack animals).
    #[serde(default)]
    pub non_combatant: bool,
    /// Incapacitated.
    #[serde(default)]
    pub downed: bool,
    /// Uncontrolled aggression: hostile to everyone regardless of faction.
    #[serde(default)]
    pub aggro_mental_state: bool,
}

impl Default for PawnTraits {
    fn default() -> Self {
        Self {
            race: Race::Humanlike,
            intelligence: Intelligence::Humanlike,
            juvenile: false,
            non_combatant: false,
            downed: false,
            aggro_mental_state: false,
        }
    }
}

impl PawnTraits {
    /// Whether this pawn takes part in fights.
    #[must_use]
    pub const fn is_combatant(&self) -> bool {
        !self.non_combatant
    }

    /// Whether this pawn is made of flesh.
    #[must_use]
    pub fn is_flesh(&self) -> bool {
        self.race != Race::Mechanoid
    }
}

/// Turret families whose reload state the core knows how to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurretKind {
    /// Direct-fire gun turret.
    Gun {
        /// Out of ammunition.
        needs_reload: bool,
    },
    /// Indirect-fire mortar.
    Mortar {
        /// Out of shells.
        needs_reload: bool,
    },
    /// A turret type registered by some other integration.
    Unknown(String),
}

impl TurretKind {
    /// Whether the turret must reload before it can fire again.
    ///
    /// Unknown turret types are logged and treated as loaded.
    #[must_use]
    pub fn needs_reload(&self) -> bool {
        match self {
            Self::Gun { needs_reload } | Self::Mortar { needs_reload } => *needs_reload,
            Self::Unknown(name) => {
                tracing::warn!(turret = %name, "Asked about reload state on unknown turret type");
                false
            }
        }
    }
}

/// What kind of thing a combatant is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatantKind {
    /// A living or mechanical pawn.
    Pawn(PawnTraits),
    /// A static structure.
    Building,
    /// A turret structure.
    Turret(TurretKind),
    /// Anything else that can be attacked.
    Other,
}

/// Personal shield variants carried by pawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShieldVariant {
    /// Standard shield belt.
    #[default]
    Belt,
    /// The base overshield.
    Overshield,
    /// A derived overshield variant.
    ExtendedOvershield,
}

impl ShieldVariant {
    /// Whether this is a variant derived from the base overshield.
    ///
    /// The base [`ShieldVariant::Overshield`] itself does not count.
    #[must_use]
    pub const fn is_derived_overshield(self) -> bool {
        matches!(self, Self::ExtendedOvershield)
    }
}

/// A personal shield worn by a pawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalShield {
    /// Shield family.
    #[serde(default)]
    pub variant: ShieldVariant,
    /// Remaining energy.
    #[serde(with = "fixed_serde")]
    pub energy: Fixed,
}

impl PersonalShield {
    /// Whether the shield can still absorb hits.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.energy > Fixed::ZERO
    }
}

/// The projectile a shooting verb fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProjectileSpec {
    /// Flies over obstacles and only interacts at launch and impact.
    #[serde(default)]
    pub flies_overhead: bool,
}

/// A combatant's currently usable attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verb {
    /// Ranged attack (as opposed to melee).
    pub ranged: bool,
    /// Maximum range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Minimum range.
    #[serde(with = "fixed_serde", default)]
    pub min_range: Fixed,
    /// Radius around the target the shooter avoids hitting friends in.
    #[serde(with = "fixed_serde", default)]
    pub avoid_friendly_fire_radius: Fixed,
    /// Forced miss radius at long range.
    #[serde(with = "fixed_serde", default)]
    pub forced_miss_radius: Fixed,
    /// Projectile fired, for shooting verbs.
    #[serde(default)]
    pub projectile: Option<ProjectileSpec>,
    /// Score offset applied to targets that can shoot back.
    #[serde(with = "fixed_serde", default)]
    pub target_has_ranged_attack_offset: Fixed,
}

impl Verb {
    /// A melee attack.
    #[must_use]
    pub fn melee() -> Self {
        Self {
            ranged: false,
            range: Fixed::from_num(1.42),
            min_range: Fixed::ZERO,
            avoid_friendly_fire_radius: Fixed::ZERO,
            forced_miss_radius: Fixed::ZERO,
            projectile: None,
            target_has_ranged_attack_offset: Fixed::ZERO,
        }
    }

    /// A direct-fire gun with the given range.
    #[must_use]
    pub fn gun(range: Fixed) -> Self {
        Self {
            ranged: true,
            range,
            projectile: Some(ProjectileSpec::default()),
            ..Self::melee()
        }
    }
}

/// Duty-imposed area a pawn must stay near.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyFocus {
    /// Focus point.
    pub point: Vec3Fixed,
    /// Allowed radius around the focus point.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

fn default_priority() -> Fixed {
    Fixed::ONE
}

fn default_size() -> (u32, u32) {
    (1, 1)
}

const fn default_true() -> bool {
    true
}

/// Snapshot of an attackable (and possibly attacking) entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Entity identifier.
    pub id: EntityId,
    /// Kind of entity.
    pub kind: CombatantKind,
    /// World position.
    pub position: Vec3Fixed,
    /// Footprint in cells (x, z), anchored at the position's cell.
    #[serde(default = "default_size")]
    pub size: (u32, u32),
    /// Owning faction.
    #[serde(default)]
    pub faction: Option<FactionId>,
    /// Effective attack.
    #[serde(default)]
    pub verb: Option<Verb>,
    /// Who this entity is currently aiming at.
    #[serde(default)]
    pub aiming_at: Option<EntityId>,
    /// On fire.
    #[serde(default)]
    pub burning: bool,
    /// Threat explicitly disabled (e.g. surrendering, switched off).
    #[serde(default)]
    pub threat_disabled: bool,
    /// Dormant until triggered.
    #[serde(default)]
    pub dormant: bool,
    /// May be picked by automatic targeting.
    #[serde(default = "default_true")]
    pub auto_targetable: bool,
    /// An explosive on it is about to go off.
    #[serde(default)]
    pub wick_started: bool,
    /// Avoids walking through other pawns.
    #[serde(default)]
    pub collides_with_pawns: bool,
    /// Duty focus limiting where melee targets may be picked.
    #[serde(default)]
    pub duty_focus: Option<DutyFocus>,
    /// Worn personal shield.
    #[serde(default)]
    pub personal_shield: Option<PersonalShield>,
    /// Multiplier applied to this entity's final target score.
    #[serde(with = "fixed_serde", default = "default_priority")]
    pub priority_factor: Fixed,
}

impl Combatant {
    /// Create a combatant with default flags.
    #[must_use]
    pub fn new(id: EntityId, kind: CombatantKind, position: Vec3Fixed) -> Self {
        Self {
            id,
            kind,
            position,
            size: (1, 1),
            faction: None,
            verb: None,
            aiming_at: None,
            burning: false,
            threat_disabled: false,
            dormant: false,
            auto_targetable: true,
            wick_started: false,
            collides_with_pawns: false,
            duty_focus: None,
            personal_shield: None,
            priority_factor: Fixed::ONE,
        }
    }

    /// Pawn traits, if this is a pawn.
    #[must_use]
    pub fn pawn(&self) -> Option<&PawnTraits> {
        match &self.kind {
            CombatantKind::Pawn(traits) => Some(traits),
            _ => None,
        }
    }

    /// Whether this is a pawn.
    #[must_use]
    pub const fn is_pawn(&self) -> bool {
        matches!(self.kind, CombatantKind::Pawn(_))
    }

    /// Cell the entity is anchored at.
    #[must_use]
    pub fn cell(&self) -> Cell {
        Cell::containing(self.position)
    }

    /// All cells the entity occupies.
    pub fn occupied_cells(&self) -> impl Iterator<Item = Cell> {
        let anchor = self.cell();
        let (sx, sz) = self.size;
        (0..sz.max(1) as i32)
            .flat_map(move |dz| (0..sx.max(1) as i32).map(move |dx| anchor.offset(dx, dz)))
    }

    /// Whether the entity occupies more than one cell.
    #[must_use]
    pub const fn is_multi_cell(&self) -> bool {
        self.size.0 > 1 || self.size.1 > 1
    }

    /// Whether the entity has a usable ranged attack.
    #[must_use]
    pub fn has_ranged_attack(&self) -> bool {
        self.verb.is_some_and(|v| v.ranged)
    }

    /// Whether the entity is in an uncontrolled-aggression state.
    #[must_use]
    pub fn in_aggro_mental_state(&self) -> bool {
        self.pawn().is_some_and(|p| p.aggro_mental_state)
    }

    /// Whether this entity cannot currently act as a threat.
    ///
    /// Covers explicitly disabled threats and turrets that must reload.
    #[must_use]
    pub fn threat_is_disabled(&self) -> bool {
        if self.threat_disabled {
            return true;
        }
        match &self.kind {
            CombatantKind::Turret(turret) => turret.needs_reload(),
            _ => false,
        }
    }

    /// Whether this entity is an awake, active threat.
    #[must_use]
    pub fn is_active_threat(&self) -> bool {
        if self.dormant || self.threat_is_disabled() {
            return false;
        }
        match &self.kind {
            CombatantKind::Pawn(traits) => !traits.downed,
            CombatantKind::Turret(_) => true,
            CombatantKind::Building | CombatantKind::Other => false,
        }
    }
}

// ============================================================================
// Projectiles
// ============================================================================

/// A projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Entity identifier.
    pub id: EntityId,
    /// Who fired it.
    #[serde(default)]
    pub launcher: Option<EntityId>,
    /// Launch point.
    pub origin: Vec3Fixed,
    /// Current position.
    pub position: Vec3Fixed,
    /// Aim point.
    pub destination: Vec3Fixed,
    /// Flies overhead (mortar shells, bombs).
    #[serde(default)]
    pub flies_overhead: bool,
    /// Damage dealt on impact.
    pub damage: u32,
}

impl Projectile {
    /// A freshly launched projectile.
    #[must_use]
    pub fn launch(
        id: EntityId,
        launcher: Option<EntityId>,
        origin: Vec3Fixed,
        destination: Vec3Fixed,
        damage: u32,
    ) -> Self {
        Self {
            id,
            launcher,
            origin,
            position: origin,
            destination,
            flies_overhead: false,
            damage,
        }
    }

    /// Builder method to mark the projectile as flying overhead.
    #[must_use]
    pub const fn overhead(mut self) -> Self {
        self.flies_overhead = true;
        self
    }

    /// Damage as a fixed-point amount.
    #[must_use]
    pub fn damage_fixed(&self) -> Fixed {
        Fixed::from_num(self.damage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pawn_at(id: EntityId, x: i32, z: i32) -> Combatant {
        Combatant::new(id, CombatantKind::Pawn(PawnTraits::default()), Vec3Fixed::ground(x, z))
    }

    #[test]
    fn test_occupied_cells_multi_cell() {
        let mut building = Combatant::new(7, CombatantKind::Building, Vec3Fixed::ground(4, 4));
        building.size = (2, 3);

        let cells: Vec<Cell> = building.occupied_cells().collect();
        assert_eq!(cells.len(), 6);
        assert!(cells.contains(&Cell::new(5, 6)));
        assert!(building.is_multi_cell());
    }

    #[test]
    fn test_unknown_turret_is_loaded() {
        let turret = TurretKind::Unknown("railgun".to_string());
        assert!(!turret.needs_reload());
    }

    #[test]
    fn test_turret_needing_reload_is_not_a_threat() {
        let mut turret = Combatant::new(
            3,
            CombatantKind::Turret(TurretKind::Gun { needs_reload: true }),
            Vec3Fixed::ZERO,
        );
        assert!(turret.threat_is_disabled());
        assert!(!turret.is_active_threat());

        turret.kind = CombatantKind::Turret(TurretKind::Gun {
            needs_reload: false,
        });
        assert!(turret.is_active_threat());
    }

    #[test]
    fn test_downed_pawn_not_active_threat() {
        let mut pawn = pawn_at(1, 0, 0);
        assert!(pawn.is_active_threat());

        pawn.kind = CombatantKind::Pawn(PawnTraits {
            downed: true,
            ..PawnTraits::default()
        });
        assert!(!pawn.is_active_threat());
    }

    #[test]
    fn test_derived_overshield_filter() {
        assert!(!ShieldVariant::Belt.is_derived_overshield());
        assert!(!ShieldVariant::Overshield.is_derived_overshield());
        assert!(ShieldVariant::ExtendedOvershield.is_derived_overshield());
    }
}
