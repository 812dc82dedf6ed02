//! Enumeration-to-union rule set.
//!
//! A top-level `const` whose name ends in `Enum` and whose initializer is an
//! object literal of plain `key: literal` properties is treated as an
//! enumeration. Each value is tagged with its own literal type and a union
//! alias is inserted above the statement:
//!
//! ```text
//! export const LogSourceEnum = {CLIENT: 'client', SERVER: 'server'};
//! ```
//!
//! becomes (typed dialect)
//!
//! ```text
//! export type LogSource = 'client' | 'server';
//! export const LogSourceEnum = {CLIENT: 'client' as 'client', SERVER: 'server' as 'server'};
//! ```
//!
//! The loose dialect tags values with a Flow cast instead: `('client': 'client')`.
//! Candidates that are not plain literal objects are rejected with a
//! [`ShapeErrorKind`].

use std::ops::Range;

use dualgen_core::error::{DualgenError, DualgenResult, ShapeErrorKind};
use dualgen_cst::visitor::{RewriteContext, RewriteRule, RuleOutcome, RuleSet};
use dualgen_cst::{
    DeclarationKeyword, Delimiter, Dialect, Element, Node, NodeKind, Span, TokenKind,
};

use super::{elements_code, parenthesize, token};

/// Identifier suffix that marks an enumeration.
pub const ENUM_SUFFIX: &str = "Enum";

/// Name of the union alias for an enumeration called `name`.
///
/// Drops the `Enum` suffix and then one trailing `s`. Returns `None` when
/// `name` is not an enumeration name.
pub fn union_name(name: &str) -> Option<String> {
    let base = name.strip_suffix(ENUM_SUFFIX).filter(|b| !b.is_empty())?;
    let singular = base.strip_suffix('s').filter(|b| !b.is_empty()).unwrap_or(base);
    Some(singular.to_string())
}

/// Build the enumeration-to-union rule set.
pub fn enum_rules() -> RuleSet {
    RuleSet::new("enums").with_rule(EnumUnion)
}

struct EnumUnion;

impl RewriteRule for EnumUnion {
    fn name(&self) -> &'static str {
        "enum-union"
    }

    fn matches(&self, node: &Node) -> bool {
        matches!(
            node.kind,
            NodeKind::VariableStatement {
                keyword: DeclarationKeyword::Const,
                top_level: true,
                ..
            }
        ) && node.children.iter().any(|c| enum_declarator(c).is_some())
    }

    fn apply(&self, node: Node, ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        let at = node.span();
        let leading = node.leading_trivia().to_string();
        let Node { kind, children } = node;

        let mut aliases: Vec<Element> = Vec::new();
        let mut rebuilt = Vec::with_capacity(children.len());
        for child in children {
            let Some((name, alias)) =
                enum_declarator(&child).map(|(name, alias)| (name.to_string(), alias))
            else {
                rebuilt.push(child);
                continue;
            };
            let Element::Node(declarator) = child else {
                rebuilt.push(child);
                continue;
            };
            let enumeration = EnumDeclaration::extract(&name, &declarator, ctx)?;
            tracing::debug!(
                declaration = %name,
                members = enumeration.members.len(),
                "synthesizing union"
            );

            let alias_leading = if aliases.is_empty() { leading.as_str() } else { "\n" };
            aliases.extend(enumeration.alias_tokens(&alias, alias_leading, at));
            rebuilt.push(enumeration.tag_values(declarator, ctx.dialect).into());
        }

        let mut statement = Node::new(kind, rebuilt);
        statement.set_leading_trivia("\n");
        Ok(RuleOutcome::InsertBefore {
            siblings: aliases,
            node: statement,
        })
    }
}

/// The declarator's name and union alias, if it declares an enumeration.
fn enum_declarator(element: &Element) -> Option<(&str, String)> {
    match element {
        Element::Node(Node {
            kind: NodeKind::VariableDeclarator { name: Some(name) },
            ..
        }) => union_name(name).map(|alias| (name.as_str(), alias)),
        _ => None,
    }
}

// ============================================================================
// Enumeration model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralKind {
    Numeric,
    String,
}

#[derive(Debug)]
struct EnumMember {
    /// Range of the value elements inside the object literal.
    value: Range<usize>,
    literal: String,
    kind: LiteralKind,
}

/// A validated `...Enum` declaration.
#[derive(Debug)]
struct EnumDeclaration {
    /// Index of the object literal among the declarator's children.
    object: usize,
    members: Vec<EnumMember>,
}

impl EnumDeclaration {
    fn extract(
        name: &str,
        declarator: &Node,
        ctx: &RewriteContext<'_>,
    ) -> DualgenResult<EnumDeclaration> {
        let shape_error = |kind: ShapeErrorKind, span: Span| DualgenError::Shape {
            kind,
            declaration: name.to_string(),
            location: ctx.location(span),
        };

        let equals = declarator.children.iter().position(|c| c.is_token("="));
        let initializer = equals.map_or(&[][..], |i| &declarator.children[i + 1..]);
        let object = match (equals, initializer) {
            (Some(i), [Element::Node(group)]) if group.is_group(Delimiter::Brace) => i + 1,
            (_, [first, ..]) => {
                return Err(shape_error(ShapeErrorKind::NotAnObjectLiteral, first.span()))
            }
            _ => {
                return Err(shape_error(
                    ShapeErrorKind::NotAnObjectLiteral,
                    declarator.span(),
                ))
            }
        };
        let Element::Node(group) = &declarator.children[object] else {
            return Err(DualgenError::internal("object literal is not a node"));
        };

        let inner = group.inner();
        let ranges = member_ranges(inner);
        if ranges.is_empty() {
            return Err(shape_error(ShapeErrorKind::EmptyEnum, group.span()));
        }

        let mut members = Vec::with_capacity(ranges.len());
        for range in ranges {
            let item = &inner[range.clone()];
            let item_span = item.first().map(Element::span).unwrap_or_else(|| group.span());
            if item.len() < 3 || !is_plain_key(&item[0]) || !item[1].is_token(":") {
                return Err(shape_error(ShapeErrorKind::NonPlainProperty, item_span));
            }
            let value = &item[2..];
            let Some(kind) = literal_kind(value) else {
                return Err(shape_error(ShapeErrorKind::NonLiteralValue, value[0].span()));
            };
            members.push(EnumMember {
                // +1 for the opening brace in the group's children
                value: range.start + 3..range.end + 1,
                literal: elements_code(value),
                kind,
            });
        }
        Ok(EnumDeclaration { object, members })
    }

    /// `export type <alias> = <lit> | <lit>;` as synthesized tokens.
    fn alias_tokens(&self, alias: &str, leading: &str, at: Span) -> Vec<Element> {
        let mut tokens = vec![
            token(TokenKind::Ident, "export", leading, at),
            token(TokenKind::Ident, "type", " ", at),
            token(TokenKind::Ident, alias, " ", at),
            token(TokenKind::Punct, "=", " ", at),
        ];
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                tokens.push(token(TokenKind::Punct, "|", " ", at));
            }
            tokens.push(member.literal_token(" ", at));
        }
        tokens.push(token(TokenKind::Punct, ";", "", at));
        tokens
    }

    /// Rebuild `declarator` with every member value tagged with its literal type.
    fn tag_values(&self, mut declarator: Node, dialect: Dialect) -> Node {
        let Some(Element::Node(group)) = declarator.children.get_mut(self.object) else {
            return declarator;
        };
        let old = std::mem::take(&mut group.children);
        let mut children = Vec::with_capacity(old.len() + self.members.len() * 2);
        let mut members = self.members.iter().peekable();
        let mut value: Vec<Element> = Vec::new();

        for (index, element) in old.into_iter().enumerate() {
            let Some(member) = members.peek() else {
                children.push(element);
                continue;
            };
            if !member.value.contains(&index) {
                children.push(element);
                continue;
            }
            value.push(element);
            if index + 1 == member.value.end {
                children.extend(member.tag(std::mem::take(&mut value), dialect));
                members.next();
            }
        }
        group.children = children;
        declarator
    }
}

impl EnumMember {
    fn literal_token(&self, leading: &str, at: Span) -> Element {
        let kind = match self.kind {
            LiteralKind::Numeric => TokenKind::Number,
            LiteralKind::String => TokenKind::String,
        };
        token(kind, &self.literal, leading, at)
    }

    fn tag(&self, value: Vec<Element>, dialect: Dialect) -> Vec<Element> {
        let at = value.first().map(Element::span).unwrap_or_default();
        match dialect {
            Dialect::Typed => {
                let mut tagged = value;
                tagged.push(token(TokenKind::Ident, "as", " ", at));
                tagged.push(self.literal_token(" ", at));
                tagged
            }
            Dialect::Loose => {
                let mut cast = value;
                cast.push(token(TokenKind::Punct, ":", "", at));
                cast.push(self.literal_token(" ", at));
                vec![parenthesize(cast).into()]
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Index ranges of the comma-separated items in `elements`.
///
/// Mirrors `split_commas`: a trailing comma does not produce an empty item.
fn member_ranges(elements: &[Element]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, element) in elements.iter().enumerate() {
        if element.is_token(",") {
            ranges.push(start..i);
            start = i + 1;
        }
    }
    if start < elements.len() {
        ranges.push(start..elements.len());
    }
    ranges
}

fn is_plain_key(element: &Element) -> bool {
    match element {
        Element::Token(t) => t.kind == TokenKind::Ident,
        Element::Node(n) => matches!(
            n.kind,
            NodeKind::StringLiteral { .. } | NodeKind::NumericLiteral
        ),
    }
}

fn literal_kind(value: &[Element]) -> Option<LiteralKind> {
    let is_numeric = |e: &Element| matches!(e, Element::Node(n) if n.kind == NodeKind::NumericLiteral);
    match value {
        [Element::Node(n)] if matches!(n.kind, NodeKind::StringLiteral { .. }) => {
            Some(LiteralKind::String)
        }
        [number] if is_numeric(number) => Some(LiteralKind::Numeric),
        [minus, number] if minus.is_token("-") && is_numeric(number) => Some(LiteralKind::Numeric),
        _ => None,
    }
}
