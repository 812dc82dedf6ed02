//! Error types and exit codes for dualgen.
//!
//! Every failure in the pipeline is fatal to the invocation: generated output
//! that silently omits a broken file is worse than failing the build. The
//! unified [`DualgenError`] carries enough context (file, declaration, rule)
//! for the CLI to name the offending input.
//!
//! ## Exit Codes
//!
//! - `2`: Invalid arguments or configuration
//! - `3`: Source errors (parse, enum shape, missing type argument, barrel collision)
//! - `4`: Filesystem errors
//! - `10`: Internal errors

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::types::Location;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments or configuration.
    InvalidArguments = 2,
    /// The input sources violate a rule set's expectations.
    SourceError = 3,
    /// Reading, writing or creating a path failed.
    IoError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Shape Errors
// ============================================================================

/// Ways an `...Enum` declaration can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeErrorKind {
    /// The initializer is not an object literal.
    NotAnObjectLiteral,
    /// The object literal has no members.
    EmptyEnum,
    /// A member is a computed key, method, spread, accessor or shorthand.
    NonPlainProperty,
    /// A member's value is not a string or numeric literal.
    NonLiteralValue,
}

impl ShapeErrorKind {
    /// Short description of the violated rule.
    pub fn describe(&self) -> &'static str {
        match self {
            ShapeErrorKind::NotAnObjectLiteral => "initializer must be an object literal",
            ShapeErrorKind::EmptyEnum => "enum must have at least one value",
            ShapeErrorKind::NonPlainProperty => {
                "members must be plain `key: value` properties (no computed keys, methods or spreads)"
            }
            ShapeErrorKind::NonLiteralValue => "values must be string or numeric literals",
        }
    }
}

impl fmt::Display for ShapeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeErrorKind::NotAnObjectLiteral => "NotAnObjectLiteral",
            ShapeErrorKind::EmptyEnum => "EmptyEnum",
            ShapeErrorKind::NonPlainProperty => "NonPlainProperty",
            ShapeErrorKind::NonLiteralValue => "NonLiteralValue",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the pipeline.
#[derive(Debug, Error)]
pub enum DualgenError {
    /// Invalid arguments from the caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Unreadable or invalid configuration file.
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Malformed input text.
    #[error("parse error at {location}: {message}")]
    Parse { location: Location, message: String },

    /// An enum declaration candidate failed validation.
    #[error("{kind} in `{declaration}` at {location}: {}", kind.describe())]
    Shape {
        kind: ShapeErrorKind,
        declaration: String,
        location: Location,
    },

    /// A deferred-result type reference without a type argument.
    #[error("missing type argument for `{type_name}` at {location}")]
    MissingTypeArgument { type_name: String, location: Location },

    /// Two barrel manifest entries export the same symbol.
    #[error("barrel name collision: `{name}` is exported by both {first} and {second}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    /// Filesystem failure on a specific path.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&DualgenError> for OutputErrorCode {
    fn from(err: &DualgenError) -> Self {
        match err {
            DualgenError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DualgenError::Config { .. } => OutputErrorCode::InvalidArguments,
            DualgenError::Parse { .. } => OutputErrorCode::SourceError,
            DualgenError::Shape { .. } => OutputErrorCode::SourceError,
            DualgenError::MissingTypeArgument { .. } => OutputErrorCode::SourceError,
            DualgenError::NameCollision { .. } => OutputErrorCode::SourceError,
            DualgenError::Io { .. } => OutputErrorCode::IoError,
            DualgenError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<DualgenError> for OutputErrorCode {
    fn from(err: DualgenError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl DualgenError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DualgenError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Attach a path to an IO error.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        DualgenError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DualgenError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }

    /// Stable kind string used in JSON error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            DualgenError::InvalidArguments { .. } => "InvalidArguments",
            DualgenError::Config { .. } => "ConfigError",
            DualgenError::Parse { .. } => "ParseError",
            DualgenError::Shape { .. } => "ShapeError",
            DualgenError::MissingTypeArgument { .. } => "MissingTypeArgument",
            DualgenError::NameCollision { .. } => "NameCollisionError",
            DualgenError::Io { .. } => "IOError",
            DualgenError::Internal { .. } => "InternalError",
        }
    }

    /// The source location the error points at, if any.
    pub fn location(&self) -> Option<&Location> {
        match self {
            DualgenError::Parse { location, .. }
            | DualgenError::Shape { location, .. }
            | DualgenError::MissingTypeArgument { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// Result alias used across the pipeline.
pub type DualgenResult<T> = Result<T, DualgenError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn parse_maps_to_source_error() {
            let err = DualgenError::Parse {
                location: Location::new("a.ts", 1, 1),
                message: "unterminated string literal".to_string(),
            };
            assert_eq!(err.error_code(), OutputErrorCode::SourceError);
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn shape_maps_to_source_error() {
            let err = DualgenError::Shape {
                kind: ShapeErrorKind::EmptyEnum,
                declaration: "FooEnum".to_string(),
                location: Location::new("a.ts", 1, 7),
            };
            assert_eq!(err.error_code(), OutputErrorCode::SourceError);
        }

        #[test]
        fn collision_maps_to_source_error() {
            let err = DualgenError::NameCollision {
                name: "Connection".to_string(),
                first: "./connection".to_string(),
                second: "./legacy/connection".to_string(),
            };
            assert_eq!(err.error_code(), OutputErrorCode::SourceError);
        }

        #[test]
        fn io_maps_to_io_error() {
            let err = DualgenError::io("out/a.ts", io::Error::other("disk full"));
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn config_maps_to_invalid_arguments() {
            let err = DualgenError::Config {
                path: PathBuf::from("dualgen.toml"),
                message: "expected a table".to_string(),
            };
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
        }

        #[test]
        fn internal_maps_to_internal_error() {
            assert_eq!(DualgenError::internal("oops").error_code().code(), 10);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn shape_display_names_declaration_and_rule() {
            let err = DualgenError::Shape {
                kind: ShapeErrorKind::NonLiteralValue,
                declaration: "FooEnum".to_string(),
                location: Location::new("enums/foo.ts", 1, 18),
            };
            assert_eq!(
                err.to_string(),
                "NonLiteralValue in `FooEnum` at enums/foo.ts:1:18: values must be string or numeric literals"
            );
        }

        #[test]
        fn missing_type_argument_display() {
            let err = DualgenError::MissingTypeArgument {
                type_name: "Promise".to_string(),
                location: Location::new("a.ts", 3, 20),
            };
            assert_eq!(
                err.to_string(),
                "missing type argument for `Promise` at a.ts:3:20"
            );
        }

        #[test]
        fn io_display_includes_path() {
            let err = DualgenError::io("out/a.ts", io::Error::other("denied"));
            assert_eq!(err.to_string(), "IO error on out/a.ts: denied");
        }

        #[test]
        fn kind_strings_are_stable() {
            assert_eq!(DualgenError::invalid_args("x").kind(), "InvalidArguments");
            assert_eq!(DualgenError::internal("x").kind(), "InternalError");
        }
    }
}
