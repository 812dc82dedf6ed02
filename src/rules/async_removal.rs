//! Async-removal rule set.
//!
//! Rewrites an asynchronous implementation into its blocking sibling. The
//! substituted dependencies already block, so every suspension point can be
//! collapsed into the expression it waits on:
//!
//! 1. `dependency-remap`: module specifiers are swapped for their synchronous counterparts
//! 2. `strip-async`: `async` qualifiers are removed
//! 3. `unwrap-await`: `await x` becomes `x`
//! 4. `unwrap-promise-type`: `Promise<T>` becomes `T`
//! 5. `unwrap-promise-all`: `Promise.all(x)` becomes `x`
//!
//! None of the rules match synchronous constructs, so running the set over
//! its own output changes nothing.

use dualgen_core::error::{DualgenError, DualgenResult};
use dualgen_core::types::WarningCode;
use dualgen_cst::visitor::{RewriteContext, RewriteRule, RuleOutcome, RuleSet};
use dualgen_cst::{split_commas, Element, Node, NodeKind, TokenKind};

use super::parenthesize;

/// The deferred-result type unwrapped by `unwrap-promise-type`.
const PROMISE: &str = "Promise";

/// The combinator unwrapped by `unwrap-promise-all`.
const PROMISE_ALL: &str = "Promise.all";

/// Synchronous counterpart of an asynchronous dependency, if there is one.
pub fn remap_dependency(specifier: &str) -> Option<&'static str> {
    match specifier {
        "then-request" => Some("sync-request"),
        "./utils/sleep" => Some("./utils/sleep-sync"),
        "webdriver-async" => Some("webdriver-sync"),
        _ => None,
    }
}

/// Build the async-removal rule set.
pub fn async_removal_rules() -> RuleSet {
    RuleSet::new("async-removal")
        .with_rule(DependencyRemap)
        .with_rule(StripAsync)
        .with_rule(UnwrapAwait)
        .with_rule(UnwrapPromiseType)
        .with_rule(UnwrapPromiseAll)
}

// ============================================================================
// Rules
// ============================================================================

struct DependencyRemap;

impl RewriteRule for DependencyRemap {
    fn name(&self) -> &'static str {
        "dependency-remap"
    }

    fn matches(&self, node: &Node) -> bool {
        matches!(&node.kind, NodeKind::StringLiteral { value } if remap_dependency(value).is_some())
    }

    fn apply(&self, mut node: Node, _ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        let mapped = match &node.kind {
            NodeKind::StringLiteral { value } => remap_dependency(value),
            _ => None,
        };
        let Some(mapped) = mapped else {
            return Ok(RuleOutcome::Keep(node));
        };
        if let Some(Element::Token(literal)) = node.children.first_mut() {
            let quote = literal.text.chars().next().unwrap_or('\'');
            literal.text = format!("{quote}{mapped}{quote}");
        }
        node.kind = NodeKind::StringLiteral {
            value: mapped.to_string(),
        };
        Ok(RuleOutcome::Replace(node))
    }
}

struct StripAsync;

impl RewriteRule for StripAsync {
    fn name(&self) -> &'static str {
        "strip-async"
    }

    fn matches(&self, node: &Node) -> bool {
        node.kind == NodeKind::AsyncModifier
    }

    fn apply(&self, _node: Node, _ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        Ok(RuleOutcome::Remove)
    }
}

struct UnwrapAwait;

impl RewriteRule for UnwrapAwait {
    fn name(&self) -> &'static str {
        "unwrap-await"
    }

    fn matches(&self, node: &Node) -> bool {
        node.kind == NodeKind::AwaitExpression
    }

    fn apply(&self, node: Node, _ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        let leading = node.leading_trivia().to_string();
        let mut operand: Vec<Element> = node.children.into_iter().skip(1).collect();
        if let Some(first) = operand.first_mut() {
            first.set_leading_trivia(leading);
        }
        Ok(RuleOutcome::Flatten(operand))
    }
}

struct UnwrapPromiseType;

impl RewriteRule for UnwrapPromiseType {
    fn name(&self) -> &'static str {
        "unwrap-promise-type"
    }

    fn matches(&self, node: &Node) -> bool {
        matches!(&node.kind, NodeKind::TypeReference { name } if name == PROMISE)
    }

    fn apply(&self, node: Node, ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        let span = node.span();
        let leading = node.leading_trivia().to_string();
        let arguments = node.children.iter().find_map(|child| match child {
            Element::Node(n) if n.kind == NodeKind::TypeArguments => Some(n),
            _ => None,
        });
        let inner = match arguments {
            // `<` ... `>`
            Some(args) if args.children.len() >= 2 => {
                &args.children[1..args.children.len() - 1]
            }
            _ => &[][..],
        };

        let items = split_commas(inner);
        let Some(first) = items.first() else {
            return Err(DualgenError::MissingTypeArgument {
                type_name: PROMISE.to_string(),
                location: ctx.location(span),
            });
        };
        if items.len() > 1 {
            ctx.warn(
                WarningCode::MultipleTypeArguments,
                format!(
                    "`{}` has {} type arguments; only the first is kept",
                    PROMISE,
                    items.len()
                ),
                span,
            );
        }

        let mut elements = first.to_vec();
        if let Some(head) = elements.first_mut() {
            head.set_leading_trivia(leading);
        }
        if is_compound_type(&elements) {
            Ok(RuleOutcome::Replace(parenthesize(elements)))
        } else {
            Ok(RuleOutcome::Flatten(elements))
        }
    }
}

struct UnwrapPromiseAll;

impl RewriteRule for UnwrapPromiseAll {
    fn name(&self) -> &'static str {
        "unwrap-promise-all"
    }

    fn matches(&self, node: &Node) -> bool {
        matches!(&node.kind, NodeKind::CallExpression { callee } if callee == PROMISE_ALL)
    }

    fn apply(&self, node: Node, ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        let span = node.span();
        let leading = node.leading_trivia().to_string();
        let argument = match node.children.last() {
            Some(Element::Node(group)) => {
                let items = split_commas(group.inner());
                match items.as_slice() {
                    [only] if !only.first().is_some_and(|e| e.is_token("...")) => {
                        Some(only.to_vec())
                    }
                    _ => None,
                }
            }
            _ => None,
        };

        let Some(mut elements) = argument else {
            ctx.warn(
                WarningCode::UnmatchedCombinator,
                format!(
                    "`{}` is only unwrapped with exactly one non-spread argument; left unchanged",
                    PROMISE_ALL
                ),
                span,
            );
            return Ok(RuleOutcome::Keep(node));
        };

        if let Some(head) = elements.first_mut() {
            head.set_leading_trivia(leading);
        }
        if is_single_operand(&elements) {
            Ok(RuleOutcome::Flatten(elements))
        } else {
            Ok(RuleOutcome::Replace(parenthesize(elements)))
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Union, intersection, function or conditional type at the top level.
fn is_compound_type(elements: &[Element]) -> bool {
    elements.iter().any(|e| {
        e.as_token().is_some_and(|t| {
            matches!(t.text.as_str(), "|" | "&" | "=>" | "?" | "extends")
                && matches!(t.kind, TokenKind::Punct | TokenKind::Ident)
        })
    })
}

/// Whether `elements` bind at least as tightly as the call they replace.
///
/// A primary followed by member accesses, calls and non-null assertions
/// qualifies; anything with an operator does not.
fn is_single_operand(elements: &[Element]) -> bool {
    let Some((head, rest)) = elements.split_first() else {
        return false;
    };
    if head
        .as_token()
        .is_some_and(|t| t.kind == TokenKind::Punct || is_operator_word(&t.text))
    {
        return false;
    }
    rest.iter().all(|e| match e.as_token() {
        None => true,
        Some(t) if t.kind == TokenKind::Punct => matches!(t.text.as_str(), "." | "?." | "!"),
        Some(t) => !is_operator_word(&t.text),
    })
}

fn is_operator_word(word: &str) -> bool {
    matches!(
        word,
        "as" | "satisfies" | "in" | "instanceof" | "new" | "typeof" | "void" | "delete"
    )
}
