// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A lossless TypeScript / JavaScript token tree and rewrite engine.
//!
//! # Overview
//!
//! - **Parsing**: [`parse_module`] turns source text into a [`Node`] tree whose
//!   tokens carry their leading trivia.
//! - **Code Generation**: the [`Codegen`] trait writes a tree back out. An
//!   untouched tree reproduces its input byte-for-byte.
//! - **Rewriting**: [`visitor::rewrite_source`] applies a [`visitor::RuleSet`]
//!   in a single post-order pass.
//!
//! # Quick Start
//!
//! ```
//! use dualgen_cst::{parse_module, Codegen, CodegenState, Dialect};
//!
//! let source = "export async function f(): Promise<void> { await g(); }\n";
//! let module = parse_module(source, Dialect::Typed).expect("parse error");
//!
//! let mut state = CodegenState::default();
//! module.codegen(&mut state);
//! assert_eq!(state.to_string(), source);
//! ```

use std::cmp::{max, min};

pub mod dialect;
pub use dialect::Dialect;

pub mod nodes;
pub use nodes::{
    imported_bindings, split_commas, Codegen, CodegenState, DeclarationKeyword, Delimiter,
    Element, Node, NodeKind, Span,
};

mod parser;
pub use parser::{parse_module, ParserError};

pub mod tokenizer;
pub use tokenizer::{tokenize, TemplatePart, TokError, Token, TokenKind};

pub mod visitor;

use dualgen_core::text::line_start_offset;

// ============================================================================
// Error formatting
// ============================================================================

fn bol_offset(source: &str, n: i32) -> usize {
    line_start_offset(source, n.max(1) as u32).unwrap_or(source.len())
}

/// Render a parser error as an annotated source snippet.
///
/// # Example
///
/// ```
/// use dualgen_cst::{parse_module, prettify_error, Dialect};
///
/// let source = "f(a, b;";
/// if let Err(e) = parse_module(source, Dialect::Typed) {
///     let formatted = prettify_error(&e, source, "example.ts");
///     assert!(formatted.contains("example.ts"));
/// }
/// ```
pub fn prettify_error(err: &ParserError, source: &str, label: &str) -> String {
    use annotate_snippets::{Level, Renderer, Snippet};
    use dualgen_core::text::byte_offset_to_position_str;

    let offset = min(err.offset(), source.len());
    let (line, _) = byte_offset_to_position_str(source, offset);
    let context = 1;
    let line_start = max(1, line as i32 - context);
    let start_offset = bol_offset(source, line_start);
    let end_offset = bol_offset(source, line as i32 + context + 1);
    let snippet = &source[start_offset..end_offset];
    let start = offset - start_offset;
    let end = min(start + 1, snippet.len()).max(start);
    let message = err.to_string();

    let report = Level::Error.title(label).snippet(
        Snippet::source(snippet)
            .line_start(line_start as usize)
            .fold(false)
            .annotation(Level::Error.span(start..end).label(&message)),
    );
    let rendered = Renderer::plain().render(report).to_string();
    rendered
}

// ============================================================================
// Tests
// ============================================================================
