//! Grid arena: a small reference host for target selection and shields.
//!
//! An [`Arena`] owns a [`NavGrid`], a few per-cell layers (fog, thick roof,
//! gas, cover), the combatants and shield emitters of one region, and the
//! faction hostility table. It implements both [`TargetingWorld`] and
//! [`ShieldWorld`], so tests, benches and the CLI can drive the core without
//! a full simulation.
//!
//! Scenarios are written in RON. The `layout` rows use `.` for open ground,
//! `#` for walls, `+` for doors and `=` for fences; row 0 is `z = 0`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::{Combatant, EntityId, MapId, PersonalShield};
use crate::error::{CoreError, Result};
use crate::factions::{FactionId, FactionRelations};
use crate::geometry::ShotLineCells;
use crate::intercept::providers::{ShieldEmitter, ShieldWorld};
use crate::math::{fixed_serde, Cell, Fixed, Vec3Fixed};
use crate::pathfinding::{self, CellType, NavGrid, TraverseParams};
use crate::targeting::{AttackMemory, TargetCache, TargetingWorld};

/// Cover at one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverDef {
    /// Cell holding the cover.
    pub cell: Cell,
    /// Chance (0..1) that it blocks a shot.
    #[serde(with = "fixed_serde")]
    pub block_chance: Fixed,
}

/// Scenario file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaDef {
    /// Region id.
    pub map_id: MapId,
    /// Starting tick.
    pub tick: u64,
    /// Grid rows, one string per row.
    pub layout: Vec<String>,
    /// Fogged cells.
    pub fog: Vec<Cell>,
    /// Cells under a thick roof.
    pub thick_roof: Vec<Cell>,
    /// Cells filled with gas.
    pub gas: Vec<Cell>,
    /// Cover pieces.
    pub cover: Vec<CoverDef>,
    /// Known factions.
    pub factions: Vec<FactionId>,
    /// Hostile faction pairs.
    pub hostilities: Vec<(FactionId, FactionId)>,
    /// Combatants in the region.
    pub combatants: Vec<Combatant>,
    /// Shield emitters in the region.
    pub shields: Vec<ShieldEmitter>,
}

/// A region with everything the targeting and shield code asks about.
#[derive(Debug, Clone)]
pub struct Arena {
    map_id: MapId,
    tick: u64,
    grid: NavGrid,
    fog: BTreeSet<Cell>,
    thick_roof: BTreeSet<Cell>,
    gas: BTreeSet<Cell>,
    cover: BTreeMap<Cell, Fixed>,
    relations: FactionRelations,
    combatants: BTreeMap<EntityId, Combatant>,
    shields: Vec<ShieldEmitter>,
}

fn parse_layout(rows: &[String]) -> Result<NavGrid> {
    let height = u32::try_from(rows.len())
        .map_err(|_| CoreError::InvalidState("Arena layout has too many rows".into()))?;
    let width = rows.first().map_or(0, |row| row.chars().count());
    let width = u32::try_from(width)
        .map_err(|_| CoreError::InvalidState("Arena layout rows are too long".into()))?;
    let mut grid = NavGrid::new(width, height)?;

    for (z, row) in rows.iter().enumerate() {
        if row.chars().count() != width as usize {
            return Err(CoreError::InvalidState(format!(
                "Arena layout row {z} has {} cells, expected {width}",
                row.chars().count()
            )));
        }
        for (x, symbol) in row.chars().enumerate() {
            let cell_type = match symbol {
                '.' => CellType::Walkable,
                '#' => CellType::Wall,
                '+' => CellType::Door,
                '=' => CellType::Fence,
                other => {
                    return Err(CoreError::InvalidState(format!(
                        "Unknown layout symbol '{other}' at ({x}, {z})"
                    )))
                }
            };
            grid.set_cell(Cell::new(x as i32, z as i32), cell_type);
        }
    }
    Ok(grid)
}

impl Arena {
    /// Create an empty arena on `grid`.
    #[must_use]
    pub fn new(grid: NavGrid) -> Self {
        Self {
            map_id: 0,
            tick: 0,
            grid,
            fog: BTreeSet::new(),
            thick_roof: BTreeSet::new(),
            gas: BTreeSet::new(),
            cover: BTreeMap::new(),
            relations: FactionRelations::new(),
            combatants: BTreeMap::new(),
            shields: Vec::new(),
        }
    }

    /// Build an arena from a parsed scenario.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidState` for a malformed layout or duplicate
    /// entity ids, and `CoreError::InvalidConfig` when validation fails.
    pub fn from_def(def: ArenaDef) -> Result<Self> {
        let mut arena = Self::new(parse_layout(&def.layout)?);
        arena.map_id = def.map_id;
        arena.tick = def.tick;
        arena.fog = def.fog.into_iter().collect();
        arena.thick_roof = def.thick_roof.into_iter().collect();
        arena.gas = def.gas.into_iter().collect();
        arena.cover = def.cover.into_iter().map(|c| (c.cell, c.block_chance)).collect();
        for faction in def.factions {
            arena.relations.add_faction(faction);
        }
        for (a, b) in def.hostilities {
            arena.relations.set_hostile(a, b, true);
        }
        for combatant in def.combatants {
            arena.spawn(combatant)?;
        }
        arena.shields = def.shields;

        let errors = arena.validate();
        if !errors.is_empty() {
            return Err(CoreError::InvalidConfig(errors.join("; ")));
        }
        tracing::info!(
            map = arena.map_id,
            width = arena.grid.width(),
            height = arena.grid.height(),
            combatants = arena.combatants.len(),
            shields = arena.shields.len(),
            "Loaded arena"
        );
        Ok(arena)
    }

    /// Parse a RON scenario.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ParseError` for malformed RON and any error of
    /// [`Arena::from_def`].
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let def: ArenaDef = ron::from_str(text).map_err(|e| CoreError::parse("arena", &e))?;
        Self::from_def(def)
    }

    /// Check the arena contents. Returns a list of problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for combatant in self.combatants.values() {
            if !self.grid.in_bounds(combatant.cell()) {
                errors.push(format!("combatant {} is outside the grid", combatant.id));
            }
            if combatant.priority_factor < Fixed::ZERO {
                errors.push(format!("combatant {} has a negative priority factor", combatant.id));
            }
        }
        let mut shield_ids = BTreeSet::new();
        for shield in &self.shields {
            if !shield_ids.insert(shield.id) {
                errors.push(format!("shield {} is listed twice", shield.id));
            }
            if shield.radius <= Fixed::ZERO {
                errors.push(format!("shield {} has a non-positive radius", shield.id));
            }
        }
        for (cell, chance) in &self.cover {
            if *chance < Fixed::ZERO || *chance > Fixed::ONE {
                errors.push(format!("cover at ({}, {}) is outside 0..=1", cell.x, cell.z));
            }
        }
        errors
    }

    /// Navigation grid.
    #[must_use]
    pub const fn grid(&self) -> &NavGrid {
        &self.grid
    }

    /// Mutable navigation grid.
    pub fn grid_mut(&mut self) -> &mut NavGrid {
        &mut self.grid
    }

    /// Faction hostility table.
    #[must_use]
    pub const fn relations(&self) -> &FactionRelations {
        &self.relations
    }

    /// Mutable faction hostility table.
    ///
    /// Tell every [`TargetCache`] built on this arena about changes.
    pub fn relations_mut(&mut self) -> &mut FactionRelations {
        &mut self.relations
    }

    /// Set the current tick.
    pub fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Advance the clock.
    pub fn advance(&mut self, ticks: u64) {
        self.tick += ticks;
    }

    /// Add a combatant.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidState` if the id is taken.
    pub fn spawn(&mut self, combatant: Combatant) -> Result<()> {
        if self.combatants.contains_key(&combatant.id) {
            return Err(CoreError::InvalidState(format!(
                "Entity {} already exists",
                combatant.id
            )));
        }
        self.combatants.insert(combatant.id, combatant);
        Ok(())
    }

    /// Remove a combatant.
    pub fn despawn(&mut self, id: EntityId) -> Option<Combatant> {
        self.combatants.remove(&id)
    }

    /// Remove a combatant and drop it from this region's selector state.
    pub fn despawn_tracked(
        &mut self,
        id: EntityId,
        cache: &mut TargetCache,
        memory: &mut AttackMemory,
    ) -> Option<Combatant> {
        let removed = self.despawn(id)?;
        cache.notify_despawned(id);
        memory.forget(id);
        Some(removed)
    }

    /// Mutable access to a combatant.
    pub fn combatant_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// All combatants in id order.
    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    /// Add a shield emitter.
    pub fn add_shield(&mut self, shield: ShieldEmitter) {
        self.shields.push(shield);
    }

    /// Shield emitters.
    #[must_use]
    pub fn shields(&self) -> &[ShieldEmitter] {
        &self.shields
    }

    /// Mutable shield emitters.
    pub fn shields_mut(&mut self) -> &mut Vec<ShieldEmitter> {
        &mut self.shields
    }

    /// Mark a cell fogged or clear.
    pub fn set_fogged(&mut self, cell: Cell, fogged: bool) {
        toggle(&mut self.fog, cell, fogged);
    }

    /// Put a thick roof over a cell or remove it.
    pub fn set_thick_roof(&mut self, cell: Cell, roofed: bool) {
        toggle(&mut self.thick_roof, cell, roofed);
    }

    /// Fill a cell with gas or clear it.
    pub fn set_gas(&mut self, cell: Cell, gas: bool) {
        toggle(&mut self.gas, cell, gas);
    }

    /// Set the cover block chance of a cell. Zero removes the cover.
    pub fn set_cover(&mut self, cell: Cell, block_chance: Fixed) {
        if block_chance <= Fixed::ZERO {
            self.cover.remove(&cell);
        } else {
            self.cover.insert(cell, block_chance);
        }
    }

    /// A target cache listing every combatant, for every known faction.
    #[must_use]
    pub fn target_cache(&self) -> TargetCache {
        TargetCache::build(self, self.relations.factions(), self.combatants.keys().copied())
    }

    fn gas_between(&self, from: Cell, to: Cell, skip_first: bool) -> bool {
        ShotLineCells::new(from, to)
            .filter(|&cell| cell != to && !(skip_first && cell == from))
            .any(|cell| self.gas.contains(&cell))
    }
}

fn toggle(set: &mut BTreeSet<Cell>, cell: Cell, on: bool) {
    if on {
        set.insert(cell);
    } else {
        set.remove(&cell);
    }
}

impl TargetingWorld for Arena {
    fn tick(&self) -> u64 {
        self.tick
    }

    fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    fn attack_targets_at(&self, cell: Cell) -> Vec<&Combatant> {
        self.combatants
            .values()
            .filter(|c| c.occupied_cells().any(|occupied| occupied == cell))
            .collect()
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        self.grid.in_bounds(cell)
    }

    fn is_hostile(&self, a: EntityId, b: EntityId) -> bool {
        if a == b {
            return false;
        }
        let (Some(a), Some(b)) = (self.combatants.get(&a), self.combatants.get(&b)) else {
            return false;
        };
        if a.in_aggro_mental_state() || b.in_aggro_mental_state() {
            return true;
        }
        match (a.faction, b.faction) {
            (Some(fa), Some(fb)) => self.relations.are_hostile(fa, fb),
            _ => false,
        }
    }

    fn is_hostile_to_faction(&self, entity: EntityId, faction: FactionId) -> bool {
        self.combatants.get(&entity).is_some_and(|c| {
            c.in_aggro_mental_state()
                || c.faction.is_some_and(|own| self.relations.are_hostile(own, faction))
        })
    }

    fn line_of_sight(&self, from: Cell, to: Cell, skip_first_cell: bool, blockable_by_gas: bool) -> bool {
        pathfinding::has_line_of_sight(&self.grid, from, to, skip_first_cell)
            && !(blockable_by_gas && self.gas_between(from, to, skip_first_cell))
    }

    fn can_be_seen_over(&self, cell: Cell) -> bool {
        self.grid.can_be_seen_over(cell)
    }

    fn is_fogged(&self, cell: Cell) -> bool {
        self.fog.contains(&cell)
    }

    fn has_thick_roof(&self, cell: Cell) -> bool {
        self.thick_roof.contains(&cell)
    }

    fn is_passable(&self, cell: Cell, traverse: TraverseParams) -> bool {
        self.grid.is_passable(cell, traverse)
    }

    fn can_reach(&self, from: Cell, to: Cell, traverse: TraverseParams, max_regions: Option<u32>) -> bool {
        pathfinding::can_reach(&self.grid, from, to, traverse, max_regions)
    }

    /// Best cover among the target's neighbours that face the shooter.
    /// Adjacent shooters ignore cover.
    fn cover_block_chance(&self, target_cell: Cell, shooter_cell: Cell) -> Fixed {
        if target_cell.chebyshev(shooter_cell) <= 1 {
            return Fixed::ZERO;
        }
        let (sx, sz) = (shooter_cell.x - target_cell.x, shooter_cell.z - target_cell.z);
        pathfinding::DIRECTIONS
            .iter()
            .filter(|&&(dx, dz)| dx * sx + dz * sz > 0)
            .filter_map(|&(dx, dz)| self.cover.get(&target_cell.offset(dx, dz)).copied())
            .max()
            .unwrap_or(Fixed::ZERO)
    }
}

impl ShieldWorld for Arena {
    fn map_id(&self) -> MapId {
        self.map_id
    }

    fn shield_emitters(&self) -> Vec<ShieldEmitter> {
        self.shields.clone()
    }

    fn position_of(&self, entity: EntityId) -> Option<Vec3Fixed> {
        self.combatants.get(&entity).map(|c| c.position)
    }

    fn faction_of(&self, entity: EntityId) -> Option<FactionId> {
        self.combatants.get(&entity).and_then(|c| c.faction)
    }

    fn factions_hostile(&self, a: Option<FactionId>, b: Option<FactionId>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => self.relations.are_hostile(a, b),
            _ => false,
        }
    }

    fn personal_shield(&self, entity: EntityId) -> Option<PersonalShield> {
        self.combatants.get(&entity).and_then(|c| c.personal_shield)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CombatantKind, PawnTraits};

    const SCENARIO: &str = r#"(
        map_id: 3,
        layout: [
            ".....",
            "..#..",
            ".....",
        ],
        hostilities: [(1, 2)],
        combatants: [
            (id: 1, kind: Pawn((downed: false)), position: (x: 4294967296, z: 4294967296), faction: Some(1)),
            (id: 2, kind: Building, position: (x: 17179869184, z: 4294967296), faction: Some(2)),
        ],
    )"#;

    fn pawn(id: EntityId, x: i32, z: i32, faction: u32) -> Combatant {
        let mut c = Combatant::new(id, CombatantKind::Pawn(PawnTraits::default()), Vec3Fixed::ground(x, z));
        c.faction = Some(FactionId(faction));
        c
    }

    #[test]
    fn test_load_scenario() {
        let arena = Arena::from_ron_str(SCENARIO).unwrap();

        assert_eq!(ShieldWorld::map_id(&arena), 3);
        assert_eq!(arena.grid().get_cell(Cell::new(2, 1)), Some(CellType::Wall));
        assert!(arena.is_hostile(1, 2));
        assert!(!arena.line_of_sight(Cell::new(1, 1), Cell::new(4, 1), true, false));
    }

    #[test]
    fn test_bad_layout_symbol() {
        let def = ArenaDef {
            layout: vec!["..x".to_string()],
            ..ArenaDef::default()
        };
        assert!(matches!(Arena::from_def(def), Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn test_duplicate_spawn_rejected() {
        let mut arena = Arena::new(NavGrid::new(4, 4).unwrap());
        arena.spawn(pawn(1, 0, 0, 1)).unwrap();
        assert!(arena.spawn(pawn(1, 1, 1, 1)).is_err());
    }

    #[test]
    fn test_aggro_hostile_to_everyone() {
        let mut arena = Arena::new(NavGrid::new(4, 4).unwrap());
        arena.spawn(pawn(1, 0, 0, 1)).unwrap();
        let mut berserk = pawn(2, 1, 1, 1);
        berserk.kind = CombatantKind::Pawn(PawnTraits {
            aggro_mental_state: true,
            ..PawnTraits::default()
        });
        arena.spawn(berserk).unwrap();

        assert!(arena.is_hostile(1, 2));
        assert!(arena.is_hostile_to_faction(2, FactionId(1)));
        assert!(!arena.is_hostile_to_faction(1, FactionId(1)));
        assert!(!arena.is_hostile(2, 2));
    }

    #[test]
    fn test_gas_blocks_only_when_asked() {
        let mut arena = Arena::new(NavGrid::new(6, 1).unwrap());
        arena.set_gas(Cell::new(2, 0), true);

        assert!(arena.line_of_sight(Cell::new(0, 0), Cell::new(5, 0), true, false));
        assert!(!arena.line_of_sight(Cell::new(0, 0), Cell::new(5, 0), true, true));
    }

    #[test]
    fn test_cover_faces_shooter() {
        let mut arena = Arena::new(NavGrid::new(10, 10).unwrap());
        arena.set_cover(Cell::new(5, 4), Fixed::from_num(0.75));

        let target = Cell::new(5, 5);
        assert_eq!(arena.cover_block_chance(target, Cell::new(5, 0)), Fixed::from_num(0.75));
        assert_eq!(arena.cover_block_chance(target, Cell::new(5, 9)), Fixed::ZERO);
        assert_eq!(arena.cover_block_chance(target, Cell::new(5, 4)), Fixed::ZERO);
    }

    #[test]
    fn test_multi_cell_targets_found_on_every_cell() {
        let mut arena = Arena::new(NavGrid::new(6, 6).unwrap());
        let mut wall = Combatant::new(9, CombatantKind::Building, Vec3Fixed::ground(2, 2));
        wall.size = (2, 2);
        arena.spawn(wall).unwrap();

        assert_eq!(arena.attack_targets_at(Cell::new(3, 3)).len(), 1);
        assert!(arena.attack_targets_at(Cell::new(4, 4)).is_empty());
    }
}
