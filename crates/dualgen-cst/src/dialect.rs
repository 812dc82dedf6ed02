// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Source dialect detection.
//!
//! The pipeline treats its inputs generically as "typed" (TypeScript) or
//! "loosely-typed" (JavaScript, optionally Flow-annotated) source. Both share
//! one tokenizer and tree; the dialect only changes how rule sets spell the
//! constructs they synthesize (for example literal type tags).

use std::fmt;
use std::path::Path;

/// Target dialect of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// TypeScript (`.ts`, `.mts`, `.cts`).
    Typed,
    /// JavaScript / Flow (`.js`, `.mjs`, `.cjs`).
    Loose,
}

impl Dialect {
    /// Extensions of typed-dialect implementation files. JSX hosts are not
    /// tokenized and fall under the unmatched-file policy.
    pub const TYPED_EXTENSIONS: &'static [&'static str] = &["ts", "mts", "cts"];

    /// Extensions of loosely-typed implementation files.
    pub const LOOSE_EXTENSIONS: &'static [&'static str] = &["js", "mjs", "cjs"];

    /// Every extension the rule sets accept.
    pub fn all_extensions() -> Vec<&'static str> {
        Self::TYPED_EXTENSIONS
            .iter()
            .chain(Self::LOOSE_EXTENSIONS)
            .copied()
            .collect()
    }

    /// Detect the dialect from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if Self::TYPED_EXTENSIONS.contains(&ext) {
            Some(Dialect::Typed)
        } else if Self::LOOSE_EXTENSIONS.contains(&ext) {
            Some(Dialect::Loose)
        } else {
            None
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Typed => write!(f, "typed"),
            Dialect::Loose => write!(f, "loose"),
        }
    }
}
