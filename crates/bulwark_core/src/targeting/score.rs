//! Heuristic score of a shooting target.
//!
//! Higher is better. Besides distance and stickiness the score accounts for
//! bystanders: friendly entities near the target or along the likely miss
//! cone lower it, hostile ones raise it a little.

use std::collections::BTreeSet;

use crate::components::{Combatant, Intelligence, Race, Verb};
use crate::config::ScoringConfig;
use crate::geometry::{adjusted_forced_miss, intercept_chance_factor, RadialCells, ShotLine};
use crate::math::{Cell, Fixed};
use crate::targeting::{AttackMemory, TargetingWorld};

/// Score `target` as a shooting target for `searcher` firing `verb`.
pub fn score_target(
    world: &dyn TargetingWorld,
    config: &ScoringConfig,
    memory: &AttackMemory,
    searcher: &Combatant,
    verb: &Verb,
    target: &Combatant,
) -> Fixed {
    let distance = searcher.position.horizontal_distance(target.position);
    let mut score = config.base_score - distance.min(config.max_distance_penalty);

    if target.aiming_at == Some(searcher.id) {
        score += config.aiming_at_searcher_bonus;
    }
    if memory.is_sticky(searcher.id, target.id, world.tick(), config.sticky_ticks) {
        score += config.sticky_bonus;
    }
    score -= world.cover_block_chance(target.cell(), searcher.cell()) * config.cover_penalty_scale;

    if let Some(traits) = target.pawn() {
        if traits.non_combatant {
            score -= config.non_combatant_penalty;
        } else if traits.juvenile {
            score -= config.juvenile_penalty;
        }
        if target.has_ranged_attack() {
            score += verb.target_has_ranged_attack_offset;
        }
        if traits.downed {
            score -= config.downed_penalty;
        }
    }

    score += friendly_fire_blast_offset(world, config, searcher, verb, target);
    score += friendly_fire_cone_offset(world, config, searcher, verb, target);

    score * target.priority_factor
}

/// Weight of a bystander by what it is.
fn bystander_weight(config: &ScoringConfig, searcher: &Combatant, thing: &Combatant) -> Fixed {
    if thing.id == searcher.id {
        return config.weight_searcher;
    }
    match thing.pawn() {
        Some(traits) if traits.race == Race::Animal => config.weight_animal,
        Some(_) => config.weight_pawn,
        None => config.weight_non_pawn,
    }
}

/// Hostile bystanders add part of their weight, everyone else subtracts it.
fn bystander_offset(
    world: &dyn TargetingWorld,
    config: &ScoringConfig,
    searcher: &Combatant,
    thing: &Combatant,
    weight: Fixed,
) -> Fixed {
    if world.is_hostile(searcher.id, thing.id) {
        weight * config.hostile_bystander_factor
    } else {
        -weight
    }
}

/// Offset for entities inside the weapon's friendly-fire radius around the target.
///
/// Only cells the target can see contribute.
pub fn friendly_fire_blast_offset(
    world: &dyn TargetingWorld,
    config: &ScoringConfig,
    searcher: &Combatant,
    verb: &Verb,
    target: &Combatant,
) -> Fixed {
    if verb.avoid_friendly_fire_radius <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    let center = target.cell();
    let mut offset = Fixed::ZERO;

    for cell in RadialCells::new(center, verb.avoid_friendly_fire_radius) {
        if !world.in_bounds(cell) {
            continue;
        }
        let mut checked_sight = false;
        for thing in world.attack_targets_at(cell) {
            if thing.id == target.id {
                continue;
            }
            if !checked_sight {
                if !world.line_of_sight(center, cell, true, false) {
                    break;
                }
                checked_sight = true;
            }
            let weight = bystander_weight(config, searcher, thing);
            offset += bystander_offset(world, config, searcher, thing, weight);
        }
    }
    offset
}

/// Offset for entities in the cells a miss could hit.
///
/// Applies to tool-using, non-mechanoid pawns firing direct projectiles.
/// Entities wearing a derived overshield variant are left out.
pub fn friendly_fire_cone_offset(
    world: &dyn TargetingWorld,
    config: &ScoringConfig,
    searcher: &Combatant,
    verb: &Verb,
    target: &Combatant,
) -> Fixed {
    let Some(traits) = searcher.pawn() else {
        return Fixed::ZERO;
    };
    if traits.intelligence < Intelligence::ToolUser || !traits.is_flesh() {
        return Fixed::ZERO;
    }
    match verb.projectile {
        Some(projectile) if !projectile.flies_overhead => {}
        _ => return Fixed::ZERO,
    }

    let source = searcher.cell();
    let dest = target.cell();
    let shot = ShotLine::between_cells(source, dest);
    let radius = adjusted_forced_miss(verb.forced_miss_radius, shot.destination - shot.origin)
        .max(config.min_cone_radius);

    let mut cells: BTreeSet<Cell> = BTreeSet::new();
    for end in RadialCells::new(dest, radius).filter(|&c| world.in_bounds(c)) {
        cells.extend(
            ShotLine::between_cells(source, end)
                .cells()
                .take_while(|&c| world.can_be_seen_over(c)),
        );
    }

    let mut offset = Fixed::ZERO;
    for cell in cells {
        let chance = intercept_chance_factor(shot.origin, cell);
        if chance <= Fixed::ZERO {
            continue;
        }
        for thing in world.attack_targets_at(cell) {
            if thing.id == target.id {
                continue;
            }
            if thing
                .personal_shield
                .is_some_and(|s| s.variant.is_derived_overshield())
            {
                continue;
            }
            let weight = bystander_weight(config, searcher, thing) * chance;
            offset += bystander_offset(world, config, searcher, thing, weight);
        }
    }
    offset
}
