//! Data validation utilities.

use std::path::Path;

use bulwark_core::arena::Arena;
use bulwark_core::config::{ScoringConfig, ShieldConfig};
use bulwark_core::error::CoreError;
use serde::Serialize;

use crate::{read_text, ToolResult};

/// What a RON file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Arena scenario.
    Arena,
    /// Target scoring constants.
    Scoring,
    /// Shield constants.
    Shields,
}

impl DataKind {
    /// Guess from a file name: `scoring*.ron`, `shield*.ron`, anything else
    /// is a scenario.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if stem.starts_with("scoring") {
            Self::Scoring
        } else if stem.starts_with("shield") {
            Self::Shields
        } else {
            Self::Arena
        }
    }
}

/// Outcome of validating one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// File checked.
    pub path: String,
    /// How it was read.
    pub kind: DataKind,
    /// Problems found; empty when valid.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Whether the file passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate RON text of the given kind. Returns the problems found.
///
/// # Errors
///
/// Returns an error if the text is not valid RON for that kind.
pub fn validate_text(text: &str, kind: DataKind) -> ToolResult<Vec<String>> {
    let errors = match kind {
        DataKind::Scoring => ron::from_str::<ScoringConfig>(text)
            .map_err(|e| CoreError::parse("scoring config", &e))?
            .validate(),
        DataKind::Shields => ron::from_str::<ShieldConfig>(text)
            .map_err(|e| CoreError::parse("shield config", &e))?
            .validate(),
        DataKind::Arena => match Arena::from_ron_str(text) {
            Ok(_) => Vec::new(),
            Err(e @ (CoreError::InvalidConfig(_) | CoreError::InvalidState(_))) => {
                vec![e.to_string()]
            }
            Err(e) => return Err(e.into()),
        },
    };
    Ok(errors)
}

/// Validate one file, guessing its kind from the name unless given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn validate_file(path: &Path, kind: Option<DataKind>) -> ToolResult<ValidationReport> {
    let kind = kind.unwrap_or_else(|| DataKind::from_path(path));
    let text = read_text(path)?;
    let errors = validate_text(&text, kind)?;
    if errors.is_empty() {
        tracing::debug!(path = %path.display(), ?kind, "Validated");
    } else {
        tracing::warn!(path = %path.display(), ?kind, count = errors.len(), "Validation problems");
    }
    Ok(ValidationReport {
        path: path.display().to_string(),
        kind,
        errors,
    })
}

/// Validate every `.ron` file in a directory, in name order.
///
/// # Errors
///
/// Returns an error if the directory or any file cannot be read or parsed.
pub fn validate_data_directory(path: &Path) -> ToolResult<Vec<ValidationReport>> {
    let entries = std::fs::read_dir(path).map_err(|source| crate::ToolError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();

    files.iter().map(|file| validate_file(file, None)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_test_utils::fixtures::SKIRMISH_RON;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(DataKind::from_path(Path::new("data/scoring.ron")), DataKind::Scoring);
        assert_eq!(DataKind::from_path(Path::new("shields_hard.ron")), DataKind::Shields);
        assert_eq!(DataKind::from_path(Path::new("yard.ron")), DataKind::Arena);
    }

    #[test]
    fn test_validate_scoring_ranges() {
        let errors = validate_text("(pick_window: 0)", DataKind::Scoring).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(validate_text("()", DataKind::Scoring).unwrap().is_empty());
    }

    #[test]
    fn test_validate_arena() {
        assert!(validate_text(SKIRMISH_RON, DataKind::Arena).unwrap().is_empty());
        let errors = validate_text(r#"(layout: ["..", "."])"#, DataKind::Arena).unwrap();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_parse_error_propagates() {
        assert!(validate_text("(pick_window: ", DataKind::Scoring).is_err());
    }
}
