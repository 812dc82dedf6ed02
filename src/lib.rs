//! dualgen: one asynchronous source tree, several derived artifacts.
//!
//! The asynchronous implementation is the only hand-maintained copy. From it
//! dualgen derives:
//!
//! - a blocking sibling tree (async removal),
//! - a Flow-annotated projection,
//! - literal-union aliases for `...Enum` object literals,
//! - the generated half of export barrels.
//!
//! Every derivation is a rule set run by the lossless rewrite engine in
//! `dualgen-cst`, except the barrel, which is rebuilt from a directory scan.

// Core infrastructure - re-exported from dualgen-core
pub use dualgen_core::config;
pub use dualgen_core::error;
pub use dualgen_core::output;
pub use dualgen_core::text;
pub use dualgen_core::types;
pub use dualgen_core::walk;

pub mod barrel;
pub mod pipeline;
pub mod rules;
