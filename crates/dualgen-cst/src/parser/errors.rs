// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use dualgen_core::error::DualgenError;
use dualgen_core::types::Location;
use thiserror::Error;

use crate::tokenizer::TokError;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("tokenizer error: {0}")]
    TokenizerError(#[from] TokError),
    #[error("syntax error: {message}")]
    SyntaxError { message: String, offset: usize },
}

impl ParserError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        ParserError::SyntaxError {
            message: message.into(),
            offset,
        }
    }

    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            ParserError::TokenizerError(e) => e.offset(),
            ParserError::SyntaxError { offset, .. } => *offset,
        }
    }

    /// Convert into a pipeline error located in `file`.
    pub fn into_parse_error(self, file: &str, source: &str) -> DualgenError {
        DualgenError::Parse {
            location: Location::from_offset(file, source, self.offset()),
            message: self.to_string(),
        }
    }
}
