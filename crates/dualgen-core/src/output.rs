//! JSON output types for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** every response has `status` as its first field
//! 2. **Deterministic:** same input, same output (file records in traversal order)
//! 3. **Versioned:** `schema_version` enables forward compatibility

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DualgenError, OutputErrorCode};
use crate::types::{Location, Warning};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// Generated content was written.
    Written,
    /// The destination already held identical content.
    Unchanged,
    /// A non-source file was copied byte-for-byte.
    Copied,
}

/// Per-file entry in a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the source root (or the barrel target path).
    pub path: String,
    /// What happened to the file.
    pub action: FileAction,
    /// SHA-256 of the destination content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Result of one pipeline flavor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Always "ok".
    pub status: String,
    /// Schema version.
    pub schema_version: String,
    /// Pipeline flavor (`sync`, `annotate`, `enums`, `barrel`).
    pub flavor: String,
    /// Processed files in traversal order.
    pub files: Vec<FileRecord>,
    /// Non-fatal diagnostics.
    pub warnings: Vec<Warning>,
}

impl RunReport {
    /// Create a successful report.
    pub fn new(flavor: impl Into<String>, files: Vec<FileRecord>, warnings: Vec<Warning>) -> Self {
        RunReport {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            flavor: flavor.into(),
            files,
            warnings,
        }
    }

    /// Number of files with the given action.
    pub fn count(&self, action: FileAction) -> usize {
        self.files.iter().filter(|f| f.action == action).count()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} written, {} unchanged, {} copied, {} warning(s)",
            self.flavor,
            self.count(FileAction::Written),
            self.count(FileAction::Unchanged),
            self.count(FileAction::Copied),
            self.warnings.len()
        )
    }
}

/// Error details for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error kind (e.g. `ShapeError`).
    pub kind: String,
    /// Numeric error code (matches the exit code).
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Source location, when the error points into a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ErrorInfo {
    /// Build error info from a [`DualgenError`].
    pub fn from_error(err: &DualgenError) -> Self {
        ErrorInfo {
            kind: err.kind().to_string(),
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            location: err.location().cloned(),
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always "error".
    pub status: String,
    /// Schema version.
    pub schema_version: String,
    /// Error details.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Wrap an error.
    pub fn new(err: &DualgenError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Serialize `response` as pretty JSON followed by a newline.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, response).map_err(io::Error::other)?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WarningCode;

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn status_is_first_field() {
        let report = RunReport::new("sync", vec![], vec![]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.starts_with("{\"status\":\"ok\""));
    }

    #[test]
    fn summary_counts_actions() {
        let report = RunReport::new(
            "annotate",
            vec![
                FileRecord {
                    path: "a.ts".to_string(),
                    action: FileAction::Written,
                    sha256: None,
                },
                FileRecord {
                    path: ".flowconfig".to_string(),
                    action: FileAction::Copied,
                    sha256: None,
                },
            ],
            vec![Warning::new(WarningCode::MissingMarker, "no marker")],
        );
        assert_eq!(
            report.summary(),
            "annotate: 1 written, 0 unchanged, 1 copied, 1 warning(s)"
        );
    }

    #[test]
    fn error_response_carries_code_and_location() {
        let err = DualgenError::MissingTypeArgument {
            type_name: "Promise".to_string(),
            location: Location::new("a.ts", 2, 4),
        };
        let response = ErrorResponse::new(&err);
        assert_eq!(response.error.code, 3);
        assert_eq!(response.error.kind, "MissingTypeArgument");
        assert_eq!(response.error.location, Some(Location::new("a.ts", 2, 4)));

        let mut out = Vec::new();
        emit_response(&response, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"status\": \"error\""));
        assert!(text.ends_with("}\n"));
    }
}
