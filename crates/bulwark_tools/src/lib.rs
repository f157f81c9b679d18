//! # Bulwark Development Tools
//!
//! Command-line tools for development:
//! - Config and scenario validators
//! - Geometry probes
//! - Scenario runners for target selection and projectile interception

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod probe;
pub mod scenario;
pub mod validate;

use std::path::Path;

use bulwark_core::error::CoreError;
use bulwark_core::math::{Fixed, Vec3Fixed};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while running a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Core rejected the input.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Unknown scan flag name on the command line.
    #[error("Unknown scan flag: {0}")]
    UnknownFlag(String),

    /// Malformed point on the command line.
    #[error("Invalid point '{0}', expected x,z or x,y,z")]
    InvalidPoint(String),

    /// Failed to encode a report.
    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Read a whole text file.
pub fn read_text(path: &Path) -> ToolResult<String> {
    std::fs::read_to_string(path).map_err(|source| ToolError::IoError {
        path: path.display().to_string(),
        source,
    })
}

/// Parse `x,z` or `x,y,z` into a point.
pub fn parse_point(text: &str) -> ToolResult<Vec3Fixed> {
    let parts: Vec<f64> = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ToolError::InvalidPoint(text.to_string()))?;
    match parts.as_slice() {
        &[x, z] => Ok(Vec3Fixed::new(Fixed::from_num(x), Fixed::ZERO, Fixed::from_num(z))),
        &[x, y, z] => Ok(Vec3Fixed::new(
            Fixed::from_num(x),
            Fixed::from_num(y),
            Fixed::from_num(z),
        )),
        _ => Err(ToolError::InvalidPoint(text.to_string())),
    }
}

/// A point in report-friendly decimal form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Height.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl From<Vec3Fixed> for Point {
    fn from(v: Vec3Fixed) -> Self {
        Self {
            x: v.x.to_num(),
            y: v.y.to_num(),
            z: v.z.to_num(),
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}
