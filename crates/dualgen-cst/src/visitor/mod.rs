// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Visitor and rewrite infrastructure.
//!
//! # Read-only traversal
//!
//! The [`Visitor`] trait walks a tree depth-first: `visit_node` in pre-order,
//! `leave_node` in post-order, tokens in source order.
//!
//! ```
//! use dualgen_cst::visitor::{walk_node, VisitResult, Visitor};
//! use dualgen_cst::{parse_module, Dialect, Node, NodeKind};
//!
//! struct AwaitCounter(usize);
//!
//! impl Visitor for AwaitCounter {
//!     fn visit_node(&mut self, node: &Node) -> VisitResult {
//!         if node.kind == NodeKind::AwaitExpression {
//!             self.0 += 1;
//!         }
//!         VisitResult::Continue
//!     }
//! }
//!
//! let module = parse_module("await a; await b;", Dialect::Typed).unwrap();
//! let mut counter = AwaitCounter(0);
//! walk_node(&mut counter, &module);
//! assert_eq!(counter.0, 2);
//! ```
//!
//! # Rewriting
//!
//! A [`RuleSet`] is an ordered list of [`RewriteRule`]s. The engine visits
//! nodes post-order; at each node the first rule whose `matches` returns true
//! fires, and its [`RuleOutcome`] replaces the node in a freshly built parent.
//! The result is not re-tested against the rule set.

mod engine;

pub use engine::{rewrite_module, rewrite_source, Rewritten};

use std::fmt;

use dualgen_core::error::DualgenResult;
use dualgen_core::types::{Location, Warning, WarningCode};

use crate::dialect::Dialect;
use crate::nodes::{Element, Node, Span};
use crate::tokenizer::Token;

// ============================================================================
// Read-only visitor
// ============================================================================

/// Result of visiting a node - controls traversal behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitResult {
    /// Continue traversal into children.
    #[default]
    Continue,
    /// Skip children, continue with siblings.
    SkipChildren,
    /// Stop traversal entirely.
    Stop,
}

/// Read-only tree visitor.
pub trait Visitor {
    fn visit_node(&mut self, _node: &Node) -> VisitResult {
        VisitResult::Continue
    }

    fn leave_node(&mut self, _node: &Node) {}

    fn visit_token(&mut self, _token: &Token) {}
}

/// Walk `node` with `visitor`. Returns [`VisitResult::Stop`] if the visitor stopped early.
pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> VisitResult {
    match visitor.visit_node(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            for child in &node.children {
                match child {
                    Element::Token(token) => visitor.visit_token(token),
                    Element::Node(inner) => {
                        if walk_node(visitor, inner) == VisitResult::Stop {
                            return VisitResult::Stop;
                        }
                    }
                }
            }
        }
    }
    visitor.leave_node(node);
    VisitResult::Continue
}

// ============================================================================
// Rewrite rules
// ============================================================================

/// What a rule does with the node it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Leave the node as it is.
    Keep(Node),
    /// Replace the node with another node.
    Replace(Node),
    /// Replace the node with zero or more sibling elements.
    Flatten(Vec<Element>),
    /// Keep `node` (possibly rebuilt) and insert `siblings` before it.
    InsertBefore { siblings: Vec<Element>, node: Node },
    /// Drop the node. Its leading trivia moves to the next sibling.
    Remove,
}

/// One match-and-transform rule.
///
/// Rules must be pure functions of the node and the static context: the same
/// node always produces the same outcome.
pub trait RewriteRule: Send + Sync {
    /// Stable rule name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this rule applies to `node`.
    fn matches(&self, node: &Node) -> bool;

    /// Transform a matched node.
    fn apply(&self, node: Node, ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome>;
}

/// An ordered collection of rules applied in one pass.
pub struct RuleSet {
    name: &'static str,
    rules: Vec<Box<dyn RewriteRule>>,
}

impl RuleSet {
    pub fn new(name: &'static str) -> Self {
        RuleSet {
            name,
            rules: Vec::new(),
        }
    }

    /// Append a rule with the lowest priority so far.
    pub fn with_rule(mut self, rule: impl RewriteRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rule names in priority order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub(crate) fn first_match(&self, node: &Node) -> Option<&dyn RewriteRule> {
        self.rules
            .iter()
            .find(|rule| rule.matches(node))
            .map(|rule| rule.as_ref())
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("name", &self.name)
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// Per-file context handed to rules.
#[derive(Debug)]
pub struct RewriteContext<'a> {
    /// File path used in locations (relative to the source root).
    pub file: &'a str,
    /// Original source text.
    pub source: &'a str,
    pub dialect: Dialect,
    warnings: Vec<Warning>,
}

impl<'a> RewriteContext<'a> {
    pub fn new(file: &'a str, source: &'a str, dialect: Dialect) -> Self {
        RewriteContext {
            file,
            source,
            dialect,
            warnings: Vec::new(),
        }
    }

    /// Location of the start of `span` in the original source.
    pub fn location(&self, span: Span) -> Location {
        Location::from_offset(self.file, self.source, span.start)
    }

    /// Record a non-fatal diagnostic at `span`.
    pub fn warn(&mut self, code: WarningCode, message: impl Into<String>, span: Span) {
        let location = self.location(span);
        self.warnings.push(Warning::at(code, message, location));
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
