// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Code generation: turn a tree back into source text.

use std::fmt;

use super::{Element, Node};
use crate::tokenizer::Token;

/// Accumulates generated source text.
#[derive(Debug, Default)]
pub struct CodegenState {
    tokens: String,
}

impl CodegenState {
    /// Append raw text.
    pub fn add_token(&mut self, text: &str) {
        self.tokens.push_str(text);
    }

    /// Bytes generated so far.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for CodegenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens)
    }
}

/// Types that can be written back out as source text.
pub trait Codegen {
    fn codegen(&self, state: &mut CodegenState);
}

impl Codegen for Token {
    fn codegen(&self, state: &mut CodegenState) {
        state.add_token(&self.leading);
        state.add_token(&self.text);
    }
}

impl Codegen for Element {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            Element::Token(t) => t.codegen(state),
            Element::Node(n) => n.codegen(state),
        }
    }
}

impl Codegen for Node {
    fn codegen(&self, state: &mut CodegenState) {
        for child in &self.children {
            child.codegen(state);
        }
    }
}

impl<T: Codegen> Codegen for [T] {
    fn codegen(&self, state: &mut CodegenState) {
        for item in self {
            item.codegen(state);
        }
    }
}
