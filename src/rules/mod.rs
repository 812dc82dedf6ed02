//! Rule sets for the three rewriting pipeline flavors.
//!
//! Each submodule exposes a constructor returning a `RuleSet` whose rules
//! are tried in priority order by the rewrite engine:
//!
//! - [`async_removal`]: asynchronous source to a blocking sibling
//! - [`annotations`]: typed source to a Flow-annotated projection
//! - [`enums`]: `...Enum` object literals to literal-tagged values plus a union alias
//!
//! The helpers below build synthesized tokens. Synthesized tokens carry the
//! span of the construct they replace, so diagnostics raised later still
//! point into the original file.

pub mod annotations;
pub mod async_removal;
pub mod enums;

pub use annotations::{annotation_rules, AnnotationOptions};
pub use async_removal::{async_removal_rules, remap_dependency};
pub use enums::{enum_rules, union_name};

use dualgen_cst::{Delimiter, Element, Node, NodeKind, Span, Token, TokenKind};

/// A synthesized token positioned at `at`.
pub(crate) fn token(kind: TokenKind, text: &str, leading: &str, at: Span) -> Element {
    Token::synthetic(kind, text, leading, Span::new(at.start, at.start)).into()
}

/// Wrap `elements` in a paren group that takes over their leading trivia.
pub(crate) fn parenthesize(mut elements: Vec<Element>) -> Node {
    let at = elements.first().map(Element::span).unwrap_or_default();
    let leading = elements
        .first()
        .map(|e| e.leading_trivia().to_string())
        .unwrap_or_default();
    if let Some(first) = elements.first_mut() {
        first.set_leading_trivia("");
    }
    let mut children = vec![token(TokenKind::Punct, "(", &leading, at)];
    children.extend(elements);
    children.push(token(TokenKind::Punct, ")", "", at));
    Node::new(NodeKind::Group(Delimiter::Paren), children)
}

/// Source text of a run of elements, without the leading trivia of the first.
pub(crate) fn elements_code(elements: &[Element]) -> String {
    let mut text: String = elements.iter().map(element_source).collect();
    if let Some(first) = elements.first() {
        text.drain(..first.leading_trivia().len());
    }
    text
}

fn element_source(element: &Element) -> String {
    match element {
        Element::Token(t) => format!("{}{}", t.leading, t.text),
        Element::Node(n) => n.to_source(),
    }
}
