//! Tunable constants for target scoring and shield effects.
//!
//! Both structs deserialize from RON. Every field has a default, so a
//! config file only lists what it overrides. Fixed-point values are written
//! as raw bits like everywhere else in the crate.
//!
//! This module contains no IO; callers read the file and hand the text over.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::math::{fixed_serde, Fixed};

/// Constants used by ranged target scoring and the melee search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Starting score of every candidate.
    #[serde(with = "fixed_serde")]
    pub base_score: Fixed,
    /// Distance beyond which the distance penalty stops growing.
    #[serde(with = "fixed_serde")]
    pub max_distance_penalty: Fixed,
    /// Bonus when the candidate is aiming at the searcher.
    #[serde(with = "fixed_serde")]
    pub aiming_at_searcher_bonus: Fixed,
    /// Bonus for the searcher's recent target.
    #[serde(with = "fixed_serde")]
    pub sticky_bonus: Fixed,
    /// How long a previous attack keeps its target sticky.
    pub sticky_ticks: u64,
    /// Scale turning cover block chance (0..1) into a penalty.
    #[serde(with = "fixed_serde")]
    pub cover_penalty_scale: Fixed,
    /// Penalty for non-combatant pawns.
    #[serde(with = "fixed_serde")]
    pub non_combatant_penalty: Fixed,
    /// Penalty for juvenile pawns.
    #[serde(with = "fixed_serde")]
    pub juvenile_penalty: Fixed,
    /// Penalty for downed targets.
    #[serde(with = "fixed_serde")]
    pub downed_penalty: Fixed,
    /// Fraction of the class weight added for hostile bystanders.
    #[serde(with = "fixed_serde")]
    pub hostile_bystander_factor: Fixed,
    /// Bystander weight of the searcher itself.
    #[serde(with = "fixed_serde")]
    pub weight_searcher: Fixed,
    /// Bystander weight of non-pawns.
    #[serde(with = "fixed_serde")]
    pub weight_non_pawn: Fixed,
    /// Bystander weight of animals.
    #[serde(with = "fixed_serde")]
    pub weight_animal: Fixed,
    /// Bystander weight of other pawns.
    #[serde(with = "fixed_serde")]
    pub weight_pawn: Fixed,
    /// Candidates scoring within this much of the best enter the random pick.
    #[serde(with = "fixed_serde")]
    pub pick_window: Fixed,
    /// Smallest miss radius used for the shot cone.
    #[serde(with = "fixed_serde")]
    pub min_cone_radius: Fixed,
    /// Melee searches farther than this are not region-capped.
    #[serde(with = "fixed_serde")]
    pub unbounded_search_distance: Fixed,
    /// Region cap for bounded melee searches.
    pub melee_region_cap: u32,
    /// Step limit of the melee-adjacent flood fill.
    pub melee_flood_steps: u32,
    /// A melee-adjacent target replaces the pathfound one within this distance.
    #[serde(with = "fixed_serde")]
    pub melee_prefer_margin: Fixed,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: Fixed::const_from_int(60),
            max_distance_penalty: Fixed::const_from_int(40),
            aiming_at_searcher_bonus: Fixed::const_from_int(10),
            sticky_bonus: Fixed::const_from_int(40),
            sticky_ticks: 300,
            cover_penalty_scale: Fixed::const_from_int(10),
            non_combatant_penalty: Fixed::const_from_int(50),
            juvenile_penalty: Fixed::const_from_int(25),
            downed_penalty: Fixed::const_from_int(50),
            hostile_bystander_factor: Fixed::from_num(0.6),
            weight_searcher: Fixed::const_from_int(40),
            weight_non_pawn: Fixed::const_from_int(10),
            weight_animal: Fixed::const_from_int(7),
            weight_pawn: Fixed::const_from_int(18),
            pick_window: Fixed::const_from_int(30),
            min_cone_radius: Fixed::from_num(1.5),
            unbounded_search_distance: Fixed::const_from_int(800),
            melee_region_cap: 40,
            melee_flood_steps: 30,
            melee_prefer_margin: Fixed::const_from_int(50),
        }
    }
}

impl ScoringConfig {
    /// Parse from RON text and validate.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| CoreError::parse("scoring config", &e))?;
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(CoreError::InvalidConfig(errors.join("; ")));
        }
        Ok(config)
    }

    /// Check value ranges. Returns a list of problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.pick_window <= Fixed::ZERO {
            errors.push("pick_window must be positive".to_string());
        }
        if self.max_distance_penalty < Fixed::ZERO {
            errors.push("max_distance_penalty must not be negative".to_string());
        }
        if self.hostile_bystander_factor < Fixed::ZERO || self.hostile_bystander_factor > Fixed::ONE {
            errors.push("hostile_bystander_factor must be within 0..=1".to_string());
        }
        if self.min_cone_radius < Fixed::ZERO {
            errors.push("min_cone_radius must not be negative".to_string());
        }
        if self.melee_region_cap == 0 {
            errors.push("melee_region_cap must be at least 1".to_string());
        }
        errors
    }
}

/// Constants used by the built-in shield providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    /// Effect size per point of absorbed damage.
    #[serde(with = "fixed_serde")]
    pub effect_scale_per_damage: Fixed,
    /// Smallest effect size.
    #[serde(with = "fixed_serde")]
    pub min_effect_scale: Fixed,
    /// Shots fired from within this distance pass personal shields.
    #[serde(with = "fixed_serde")]
    pub point_blank_range: Fixed,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            effect_scale_per_damage: Fixed::from_num(0.1),
            min_effect_scale: Fixed::from_num(0.5),
            point_blank_range: Fixed::ONE,
        }
    }
}

impl ShieldConfig {
    /// Parse from RON text and validate.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| CoreError::parse("shield config", &e))?;
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(CoreError::InvalidConfig(errors.join("; ")));
        }
        Ok(config)
    }

    /// Check value ranges. Returns a list of problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.effect_scale_per_damage < Fixed::ZERO || self.min_effect_scale < Fixed::ZERO {
            errors.push("effect scales must not be negative".to_string());
        }
        if self.point_blank_range < Fixed::ZERO {
            errors.push("point_blank_range must not be negative".to_string());
        }
        errors
    }

    /// Visual effect size for an absorbed hit.
    #[must_use]
    pub fn effect_scale(&self, damage: Fixed) -> Fixed {
        (damage * self.effect_scale_per_damage).max(self.min_effect_scale)
    }
}
