//! Core infrastructure for dualgen.
//!
//! This crate provides the language-agnostic half of the pipeline:
//! - Error taxonomy and exit codes
//! - Source locations and offset conversions
//! - Tree walking (source root to mirrored destination root)
//! - `dualgen.toml` configuration
//! - Run reports for CLI output

pub mod config;
pub mod error;
pub mod output;
pub mod text;
pub mod types;
pub mod walk;
