//! Error types for the interception and targeting core.
//!
//! Geometry and registry queries never fail; errors only come from loading
//! configuration or scenarios, from host lookups that the caller required,
//! and from caller-supplied validators.

use thiserror::Error;

use crate::components::EntityId;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for the core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Failed to parse a RON configuration or scenario.
    #[error("Failed to parse {what}: {message}")]
    ParseError {
        /// What was being parsed.
        what: String,
        /// Error message.
        message: String,
    },

    /// Configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The searcher of a target query does not exist.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A caller-supplied validator rejected the query.
    #[error("Target validator failed: {0}")]
    Validator(String),

    /// Invalid state (pathfinding, scenario layout).
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl CoreError {
    /// Wrap a RON deserialization error.
    pub fn parse(what: impl Into<String>, err: &ron::error::SpannedError) -> Self {
        Self::ParseError {
            what: what.into(),
            message: err.to_string(),
        }
    }
}
