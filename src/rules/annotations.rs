//! Annotation-projection rule set.
//!
//! Projects a typed implementation file into a Flow-annotated variant. It
//! never touches control flow or values; only import syntax and one known-bad
//! cross-package reference are adjusted:
//!
//! 1. `directive`: the file is prefixed with the directive line
//! 2. `import-equals`: `import X = require('m')` becomes `import X from 'm'`
//! 3. `suppress-import`: imports of suppressed specifiers get a suppression
//!    comment on the line above
//!
//! `import-equals` applies the suppression itself when the converted import
//! names a suppressed specifier.

use std::sync::Arc;

use dualgen_core::config::{
    default_directive, default_suppressed_imports, default_suppression_comment,
    AnnotationJobConfig,
};
use dualgen_core::error::DualgenResult;
use dualgen_cst::visitor::{RewriteContext, RewriteRule, RuleOutcome, RuleSet};
use dualgen_cst::{Element, Node, NodeKind, TokenKind};

use super::token;

/// Settings for the annotation projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationOptions {
    /// Directive line prefixed to every projected file.
    pub directive: String,
    /// Comment line inserted before suppressed imports.
    pub suppression_comment: String,
    /// Import specifiers whose declarations the target checker rejects.
    pub suppressed_imports: Vec<String>,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        AnnotationOptions {
            directive: default_directive(),
            suppression_comment: default_suppression_comment(),
            suppressed_imports: default_suppressed_imports(),
        }
    }
}

impl From<&AnnotationJobConfig> for AnnotationOptions {
    fn from(job: &AnnotationJobConfig) -> Self {
        AnnotationOptions {
            directive: job.directive.clone(),
            suppression_comment: job.suppression_comment.clone(),
            suppressed_imports: job.suppressed_imports.clone(),
        }
    }
}

impl AnnotationOptions {
    fn is_suppressed(&self, specifier: &str) -> bool {
        self.suppressed_imports.iter().any(|s| s == specifier)
    }
}

/// Build the annotation-projection rule set.
pub fn annotation_rules(options: AnnotationOptions) -> RuleSet {
    let options = Arc::new(options);
    RuleSet::new("annotations")
        .with_rule(Directive(options.clone()))
        .with_rule(ImportEquals(options.clone()))
        .with_rule(SuppressImport(options))
}

// ============================================================================
// Rules
// ============================================================================

struct Directive(Arc<AnnotationOptions>);

impl RewriteRule for Directive {
    fn name(&self) -> &'static str {
        "directive"
    }

    fn matches(&self, node: &Node) -> bool {
        node.kind == NodeKind::Module
    }

    fn apply(&self, mut node: Node, _ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        let directive = self.0.directive.as_str();
        let leading = node.leading_trivia();

        // A shebang must stay on the first line; the directive goes below it.
        let split = if leading.starts_with("#!") {
            leading.find('\n').map_or(leading.len(), |i| i + 1)
        } else {
            0
        };
        let (shebang, rest) = leading.split_at(split);
        if rest.trim_start().starts_with(directive) {
            return Ok(RuleOutcome::Keep(node));
        }

        let separator = if shebang.is_empty() || shebang.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        let leading = format!("{}{}{}\n{}", shebang, separator, directive, rest);
        node.set_leading_trivia(leading);
        Ok(RuleOutcome::Replace(node))
    }
}

struct ImportEquals(Arc<AnnotationOptions>);

impl RewriteRule for ImportEquals {
    fn name(&self) -> &'static str {
        "import-equals"
    }

    fn matches(&self, node: &Node) -> bool {
        matches!(
            &node.kind,
            NodeKind::ImportEquals {
                specifier: Some(_),
                ..
            }
        )
    }

    fn apply(&self, node: Node, _ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        let NodeKind::ImportEquals {
            binding,
            specifier: Some(specifier),
            type_only,
        } = node.kind.clone()
        else {
            return Ok(RuleOutcome::Keep(node));
        };
        let at = node.span();

        // `import [type] X = require ( 'm' )`
        let mut literal = node
            .children
            .last()
            .and_then(Element::as_node)
            .and_then(|group| {
                group.inner().iter().find_map(|e| match e {
                    Element::Node(n) if matches!(n.kind, NodeKind::StringLiteral { .. }) => {
                        Some(n.clone())
                    }
                    _ => None,
                })
            })
            .map(Element::Node)
            .unwrap_or_else(|| token(TokenKind::String, &format!("'{}'", specifier), "", at));
        literal.set_leading_trivia(" ");

        let prefix_len = if type_only { 3 } else { 2 };
        let mut children: Vec<Element> = node.children.into_iter().take(prefix_len).collect();
        children.push(token(TokenKind::Ident, "from", " ", at));
        children.push(literal);
        let import = Node::new(
            NodeKind::ImportDeclaration {
                specifier: Some(specifier.clone()),
                reexport: false,
            },
            children,
        );
        tracing::trace!(binding = %binding, specifier = %specifier, "converted import-equals");

        if self.0.is_suppressed(&specifier) {
            Ok(suppress(import, &self.0.suppression_comment))
        } else {
            Ok(RuleOutcome::Replace(import))
        }
    }
}

struct SuppressImport(Arc<AnnotationOptions>);

impl RewriteRule for SuppressImport {
    fn name(&self) -> &'static str {
        "suppress-import"
    }

    fn matches(&self, node: &Node) -> bool {
        matches!(
            &node.kind,
            NodeKind::ImportDeclaration { specifier: Some(s), .. } if self.0.is_suppressed(s)
        )
    }

    fn apply(&self, node: Node, _ctx: &mut RewriteContext<'_>) -> DualgenResult<RuleOutcome> {
        Ok(suppress(node, &self.0.suppression_comment))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Put `comment` on its own line above `node`, at the same indentation.
fn suppress(mut node: Node, comment: &str) -> RuleOutcome {
    let leading = node.leading_trivia().to_string();
    if already_suppressed(&leading, comment) {
        return RuleOutcome::Keep(node);
    }

    let indent_start = leading.rfind('\n').map_or(0, |i| i + 1);
    let indent = &leading[indent_start..];
    let indent = if indent.chars().all(|c| c == ' ' || c == '\t') {
        indent
    } else {
        ""
    };

    let line = Node::new(
        NodeKind::CommentLine,
        vec![token(TokenKind::Comment, comment, &leading, node.span())],
    );
    node.set_leading_trivia(format!("\n{}", indent));
    RuleOutcome::InsertBefore {
        siblings: vec![line.into()],
        node,
    }
}

/// Whether the last line of `leading` before the node is `comment`.
fn already_suppressed(leading: &str, comment: &str) -> bool {
    let before = leading.trim_end_matches([' ', '\t']);
    let Some(before) = before.strip_suffix('\n') else {
        return false;
    };
    let before = before.strip_suffix('\r').unwrap_or(before);
    let last_line = before.rsplit('\n').next().unwrap_or(before);
    last_line.trim() == comment
}
