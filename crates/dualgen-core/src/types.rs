//! Common types shared between the error, output and rewrite layers.
//!
//! Kept separate from `error` and `output` to avoid circular dependencies.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Location Type
// ============================================================================

/// Location in a source file.
///
/// - `file`: path relative to the root being processed (forward slashes)
/// - `line`: 1-indexed line number
/// - `col`: 1-indexed column, counted in chars
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Location {
    /// File path.
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
}

impl Location {
    /// Create a new location.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
        }
    }

    /// Create a location from a byte offset into `content`.
    pub fn from_offset(file: impl Into<String>, content: &str, offset: usize) -> Self {
        let (line, col) = crate::text::byte_offset_to_position_str(content, offset);
        Location::new(file, line, col)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

// ============================================================================
// Warnings
// ============================================================================

/// Stable warning codes emitted by rule sets and the barrel generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningCode {
    /// A combinator call (`Promise.all`) with an arity the unwrap rule does not handle.
    UnmatchedCombinator,
    /// A deferred-result type with more than one type argument.
    MultipleTypeArguments,
    /// A barrel target without the generated-code marker.
    MissingMarker,
}

impl WarningCode {
    /// The kebab-case code used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::UnmatchedCombinator => "unmatched-combinator",
            WarningCode::MultipleTypeArguments => "multiple-type-arguments",
            WarningCode::MissingMarker => "missing-marker",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal diagnostic.
///
/// Warnings never change generated output; they flag constructs the rule
/// sets deliberately leave alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    /// Stable warning code.
    pub code: WarningCode,
    /// Human-readable message.
    pub message: String,
    /// Where the warning applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Warning {
    /// Create a warning attached to a location.
    pub fn at(code: WarningCode, message: impl Into<String>, location: Location) -> Self {
        Warning {
            code,
            message: message.into(),
            location: Some(location),
        }
    }

    /// Create a warning without a location.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Warning {
            code,
            message: message.into(),
            location: None,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "warning[{}] {}: {}", self.code, location, self.message),
            None => write!(f, "warning[{}]: {}", self.code, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_is_path_line_col() {
        let loc = Location::new("src/connection.ts", 12, 5);
        assert_eq!(loc.to_string(), "src/connection.ts:12:5");
    }

    #[test]
    fn location_from_offset_counts_lines() {
        let loc = Location::from_offset("a.ts", "const a = 1;\nconst b = 2;\n", 19);
        assert_eq!((loc.line, loc.col), (2, 7));
    }

    #[test]
    fn warning_code_serializes_kebab_case() {
        let json = serde_json::to_string(&WarningCode::UnmatchedCombinator).unwrap();
        assert_eq!(json, "\"unmatched-combinator\"");
    }

    #[test]
    fn warning_display_includes_location() {
        let warning = Warning::at(
            WarningCode::MultipleTypeArguments,
            "Promise has 2 type arguments",
            Location::new("a.ts", 1, 9),
        );
        assert_eq!(
            warning.to_string(),
            "warning[multiple-type-arguments] a.ts:1:9: Promise has 2 type arguments"
        );
    }
}
