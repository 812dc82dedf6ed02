// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The rewrite engine: one post-order pass, immutable rebuild.
//!
//! Children are rewritten before their parent, then the parent (rebuilt from
//! the rewritten children) is offered to the rule set. When a node disappears
//! its leading trivia is handed to the next element so line breaks and
//! comments survive:
//!
//! - whitespace-only trivia on the receiving element is replaced;
//! - otherwise the removed trivia is prepended and the receiver's indentation
//!   (spaces and tabs) is trimmed.

use dualgen_core::error::DualgenResult;
use dualgen_core::types::Warning;

use super::{RewriteContext, RuleOutcome, RuleSet};
use crate::dialect::Dialect;
use crate::nodes::{Codegen, CodegenState, Element, Node, NodeKind, Span};
use crate::parser::parse_module;
use crate::tokenizer::{Token, TokenKind};

/// Output of [`rewrite_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub warnings: Vec<Warning>,
}

/// Parse `source`, apply `rules`, and serialize the result.
///
/// `file` is only used for error and warning locations.
pub fn rewrite_source(
    source: &str,
    file: &str,
    dialect: Dialect,
    rules: &RuleSet,
) -> DualgenResult<Rewritten> {
    let module = parse_module(source, dialect).map_err(|e| e.into_parse_error(file, source))?;
    let mut ctx = RewriteContext::new(file, source, dialect);
    let module = rewrite_module(module, rules, &mut ctx)?;

    let mut state = CodegenState::default();
    module.codegen(&mut state);
    Ok(Rewritten {
        text: state.to_string(),
        warnings: ctx.into_warnings(),
    })
}

/// Apply `rules` to a parsed module.
pub fn rewrite_module(
    module: Node,
    rules: &RuleSet,
    ctx: &mut RewriteContext<'_>,
) -> DualgenResult<Node> {
    let node = match rewrite_node(module, rules, ctx)? {
        RuleOutcome::Keep(node) | RuleOutcome::Replace(node) if node.kind == NodeKind::Module => {
            node
        }
        RuleOutcome::Keep(node) | RuleOutcome::Replace(node) => {
            Node::new(NodeKind::Module, vec![node.into()])
        }
        RuleOutcome::Flatten(elements) => Node::new(NodeKind::Module, elements),
        RuleOutcome::InsertBefore { mut siblings, node } => {
            siblings.push(node.into());
            Node::new(NodeKind::Module, siblings)
        }
        RuleOutcome::Remove => Node::new(NodeKind::Module, Vec::new()),
    };
    Ok(node)
}

fn rewrite_node(
    node: Node,
    rules: &RuleSet,
    ctx: &mut RewriteContext<'_>,
) -> DualgenResult<RuleOutcome> {
    let Node { kind, children } = node;
    let node = Node::new(kind, rewrite_children(children, rules, ctx)?);
    match rules.first_match(&node) {
        Some(rule) => rule.apply(node, ctx),
        None => Ok(RuleOutcome::Keep(node)),
    }
}

fn rewrite_children(
    children: Vec<Element>,
    rules: &RuleSet,
    ctx: &mut RewriteContext<'_>,
) -> DualgenResult<Vec<Element>> {
    let mut out = Vec::with_capacity(children.len());
    let mut carried: Option<String> = None;

    for child in children {
        let produced = match child {
            Element::Token(token) => vec![Element::Token(token)],
            Element::Node(node) => {
                let leading = node.leading_trivia().to_string();
                let produced = match rewrite_node(node, rules, ctx)? {
                    RuleOutcome::Keep(node) | RuleOutcome::Replace(node) => vec![node.into()],
                    RuleOutcome::Flatten(elements) => elements,
                    RuleOutcome::InsertBefore { mut siblings, node } => {
                        siblings.push(node.into());
                        siblings
                    }
                    RuleOutcome::Remove => Vec::new(),
                };
                if produced.is_empty() {
                    carried = Some(match carried.take() {
                        Some(previous) => merge_trivia(previous, &leading),
                        None => leading,
                    });
                    continue;
                }
                produced
            }
        };

        for mut element in produced {
            if let Some(trivia) = carried.take() {
                let merged = merge_trivia(trivia, element.leading_trivia());
                element.set_leading_trivia(merged);
            }
            out.push(element);
        }
    }

    if let Some(trivia) = carried {
        if !is_blank(&trivia) {
            let end = out.last().map(|e| e.span().end).unwrap_or_default();
            out.push(
                Token::synthetic(TokenKind::Comment, "", trivia, Span::new(end, end)).into(),
            );
        }
    }
    Ok(out)
}

fn is_blank(trivia: &str) -> bool {
    trivia.chars().all(char::is_whitespace)
}

/// Combine trivia of a removed node with the trivia of the element that follows it.
fn merge_trivia(removed: String, receiver: &str) -> String {
    if is_blank(receiver) {
        removed
    } else {
        removed + receiver.trim_start_matches([' ', '\t'])
    }
}
