//! # Bulwark Core
//!
//! Deterministic projectile interception and attack-target selection.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (callers pass a seeded `Rng`)
//! - No floating-point math (uses fixed-point)
//!
//! Two engines share the geometry and entity snapshot types:
//!
//! - [`intercept`] asks a [`Registry`](intercept::Registry) of shield
//!   providers whether a projectile is stopped on its way to the target.
//! - [`targeting`] picks the best attack target for a searcher, scoring
//!   candidates and accounting for friendly fire.
//!
//! ## Crate Structure
//!
//! - [`math`] - Fixed-point math utilities
//! - [`geometry`] - Shot lines, circle intersections, radial cell scans
//! - [`components`] - Entity snapshot definitions
//! - [`factions`] - Faction ids and hostility
//! - [`config`] - Tunable scoring and shield constants
//! - [`pathfinding`] - Grid reachability and sight lines
//! - [`arena`] - Reference host implementing both world traits

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod arena;
pub mod components;
pub mod config;
pub mod error;
pub mod factions;
pub mod geometry;
pub mod intercept;
pub mod math;
pub mod pathfinding;
pub mod targeting;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::arena::{Arena, ArenaDef};
    pub use crate::components::*;
    pub use crate::config::{ScoringConfig, ShieldConfig};
    pub use crate::error::{CoreError, Result};
    pub use crate::factions::{FactionId, FactionRelations};
    pub use crate::geometry::ShotLine;
    pub use crate::intercept::providers::register_builtin;
    pub use crate::intercept::{
        BlockFlags, BlockZone, Channels, FireMode, InterceptContext, InterceptEvent,
        InterceptProvider, InterceptionEngine, InterceptionResult, Registry, ShieldEmitter,
        ShieldScanCache, ShieldWorld,
    };
    pub use crate::math::{Cell, Fixed, Vec2Fixed, Vec3Fixed};
    pub use crate::targeting::{
        AttackMemory, TargetCache, TargetScanFlags, TargetSearchParams, TargetSelector,
        TargetingWorld,
    };
}
