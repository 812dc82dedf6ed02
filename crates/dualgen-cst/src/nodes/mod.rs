// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tree node types.
//!
//! The tree is deliberately generic: a [`Node`] is a kind tag plus an ordered
//! list of children, each either another node or a [`Token`]. Only the
//! constructs the rule sets care about get their own [`NodeKind`]; everything
//! else stays a flat run of tokens inside the nearest bracket group.
//!
//! Trees are never mutated in place by the rewrite engine. Rules consume a
//! node and return new subtrees; the engine builds new parents around them.

mod codegen;

pub use codegen::{Codegen, CodegenState};

use crate::tokenizer::{Token, TokenKind};

/// A byte range in the original source (start inclusive, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} > end {}", start, end);
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Bracket pair of a [`NodeKind::Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// `( ... )`
    Paren,
    /// `[ ... ]`
    Bracket,
    /// `{ ... }`
    Brace,
}

impl Delimiter {
    /// Delimiter opened by `text`, if any.
    pub fn from_open(text: &str) -> Option<Self> {
        match text {
            "(" => Some(Delimiter::Paren),
            "[" => Some(Delimiter::Bracket),
            "{" => Some(Delimiter::Brace),
            _ => None,
        }
    }

    /// Closing punctuator.
    pub fn close(&self) -> &'static str {
        match self {
            Delimiter::Paren => ")",
            Delimiter::Bracket => "]",
            Delimiter::Brace => "}",
        }
    }
}

/// `const`, `let` or `var`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKeyword {
    Const,
    Let,
    Var,
}

impl DeclarationKeyword {
    /// Keyword for `text`, if it is one.
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "const" => Some(DeclarationKeyword::Const),
            "let" => Some(DeclarationKeyword::Let),
            "var" => Some(DeclarationKeyword::Var),
            _ => None,
        }
    }
}

/// Kind tag and payload of a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of a file. The last child is always the end-of-file token.
    Module,
    /// A bracket pair with its contents: `[open, ...inner, close]`.
    Group(Delimiter),
    /// A template literal: head, substitutions, middles, tail.
    Template,
    /// A string literal; `value` is the raw text between the quotes.
    StringLiteral { value: String },
    /// A numeric literal.
    NumericLiteral,
    /// The `async` qualifier of a function, arrow function or method.
    AsyncModifier,
    /// `await <operand>`: the keyword followed by the operand's elements.
    AwaitExpression,
    /// A named type, optionally followed by a [`NodeKind::TypeArguments`] child.
    TypeReference { name: String },
    /// `< ...args >` of a type reference or generic call.
    TypeArguments,
    /// A dotted identifier path followed by an argument group.
    CallExpression { callee: String },
    /// `import ... from 'm'`, `import 'm'`, or `export ... from 'm'`.
    ImportDeclaration {
        specifier: Option<String>,
        reexport: bool,
    },
    /// `import X = require('m')` or `import X = A.B`.
    ImportEquals {
        binding: String,
        specifier: Option<String>,
        type_only: bool,
    },
    /// `const|let|var` declarations, optionally exported.
    VariableStatement {
        keyword: DeclarationKeyword,
        exported: bool,
        top_level: bool,
    },
    /// One `name [: type] [= initializer]` of a variable statement.
    VariableDeclarator { name: Option<String> },
    /// A synthesized comment line (the comment token; its trivia holds the indentation).
    CommentLine,
}

/// A child of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Node(Node),
    Token(Token),
}

impl Element {
    /// First token of this element in source order.
    pub fn first_token(&self) -> Option<&Token> {
        match self {
            Element::Token(t) => Some(t),
            Element::Node(n) => n.first_token(),
        }
    }

    /// Mutable first token of this element in source order.
    pub fn first_token_mut(&mut self) -> Option<&mut Token> {
        match self {
            Element::Token(t) => Some(t),
            Element::Node(n) => n.first_token_mut(),
        }
    }

    /// Leading trivia of the first token (empty if there is none).
    pub fn leading_trivia(&self) -> &str {
        self.first_token().map(|t| t.leading.as_str()).unwrap_or("")
    }

    /// Replace the leading trivia of the first token.
    pub fn set_leading_trivia(&mut self, leading: impl Into<String>) {
        if let Some(token) = self.first_token_mut() {
            token.leading = leading.into();
        }
    }

    /// The token, if this element is one.
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Element::Token(t) => Some(t),
            Element::Node(_) => None,
        }
    }

    /// The node, if this element is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(n) => Some(n),
            Element::Token(_) => None,
        }
    }

    /// Whether this element is the punctuator or word `text`.
    pub fn is_token(&self, text: &str) -> bool {
        self.as_token().is_some_and(|t| t.is(text))
    }

    /// Span of the element in the original source.
    pub fn span(&self) -> Span {
        match self {
            Element::Token(t) => t.span,
            Element::Node(n) => n.span(),
        }
    }

    /// Source text of this element without its leading trivia.
    pub fn code(&self) -> String {
        let mut state = CodegenState::default();
        self.codegen(&mut state);
        let text = state.to_string();
        text[self.leading_trivia().len()..].to_string()
    }
}

impl From<Token> for Element {
    fn from(token: Token) -> Self {
        Element::Token(token)
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}

/// A tree node: kind tag plus ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Element>,
}

impl Node {
    /// Create a node.
    pub fn new(kind: NodeKind, children: Vec<Element>) -> Self {
        Node { kind, children }
    }

    /// First token in source order.
    pub fn first_token(&self) -> Option<&Token> {
        self.children.iter().find_map(Element::first_token)
    }

    /// Mutable first token in source order.
    pub fn first_token_mut(&mut self) -> Option<&mut Token> {
        self.children.iter_mut().find_map(Element::first_token_mut)
    }

    /// Leading trivia of the first token.
    pub fn leading_trivia(&self) -> &str {
        self.first_token().map(|t| t.leading.as_str()).unwrap_or("")
    }

    /// Replace the leading trivia of the first token.
    pub fn set_leading_trivia(&mut self, leading: impl Into<String>) {
        if let Some(token) = self.first_token_mut() {
            token.leading = leading.into();
        }
    }

    /// Span from the first to the last token with a real position.
    pub fn span(&self) -> Span {
        let mut tokens = self.tokens().filter(|t| t.kind != TokenKind::Comment);
        let Some(first) = tokens.next() else {
            return Span::default();
        };
        let last = tokens.last().unwrap_or(first);
        Span::new(first.span.start, last.span.end.max(first.span.start))
    }

    /// All tokens of the subtree in source order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        let mut stack: Vec<&Element> = self.children.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(element) = stack.pop() {
                match element {
                    Element::Token(t) => return Some(t),
                    Element::Node(n) => stack.extend(n.children.iter().rev()),
                }
            }
            None
        })
    }

    /// All descendant nodes (excluding `self`) in pre-order.
    pub fn descendants(&self) -> impl Iterator<Item = &Node> {
        let mut stack: Vec<&Node> = self
            .children
            .iter()
            .rev()
            .filter_map(Element::as_node)
            .collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev().filter_map(Element::as_node));
            Some(node)
        })
    }

    /// Contents of a group without its brackets; the whole child list otherwise.
    pub fn inner(&self) -> &[Element] {
        match self.kind {
            NodeKind::Group(_) if self.children.len() >= 2 => {
                &self.children[1..self.children.len() - 1]
            }
            _ => &self.children,
        }
    }

    /// Whether this node is a group with the given delimiter.
    pub fn is_group(&self, delimiter: Delimiter) -> bool {
        self.kind == NodeKind::Group(delimiter)
    }

    /// Source text including leading trivia.
    pub fn to_source(&self) -> String {
        let mut state = CodegenState::default();
        self.codegen(&mut state);
        state.to_string()
    }

    /// Source text without the leading trivia of the first token.
    pub fn code(&self) -> String {
        let text = self.to_source();
        text[self.leading_trivia().len()..].to_string()
    }
}

/// Split a run of elements on top-level `,` tokens.
///
/// A trailing comma does not produce an empty final item; an empty input
/// yields no items.
pub fn split_commas(elements: &[Element]) -> Vec<&[Element]> {
    let mut items = Vec::new();
    let mut start = 0;
    for (i, element) in elements.iter().enumerate() {
        if element.is_token(",") {
            items.push(&elements[start..i]);
            start = i + 1;
        }
    }
    if start < elements.len() {
        items.push(&elements[start..]);
    }
    items
}

/// Names bound by an import declaration (`X`, `* as X`, `{A, B as C}`).
///
/// Returns an empty list for side-effect imports and re-exports.
pub fn imported_bindings(node: &Node) -> Vec<String> {
    match &node.kind {
        NodeKind::ImportEquals { binding, .. } => vec![binding.clone()],
        NodeKind::ImportDeclaration {
            reexport: false, ..
        } => {
            let mut names = Vec::new();
            let mut children = node.children.iter().peekable();
            while let Some(child) = children.next() {
                match child {
                    Element::Token(t) if t.is("from") => break,
                    Element::Token(t) if t.is("*") => {
                        if children.next().is_some_and(|e| e.is_token("as")) {
                            if let Some(Element::Token(name)) = children.next() {
                                names.push(name.text.clone());
                            }
                        }
                    }
                    Element::Token(t)
                        if t.kind == TokenKind::Ident && !matches!(t.text.as_str(), "import" | "type") =>
                    {
                        names.push(t.text.clone());
                    }
                    Element::Node(n) if n.is_group(Delimiter::Brace) => {
                        for item in split_commas(n.inner()) {
                            let words: Vec<&Token> = item
                                .iter()
                                .filter_map(Element::as_token)
                                .filter(|t| t.kind == TokenKind::Ident)
                                .collect();
                            if let Some(local) = words.last() {
                                names.push(local.text.clone());
                            }
                        }
                    }
                    _ => {}
                }
            }
            names
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_module, Dialect};

    fn first_of_kind<'a>(module: &'a Node, pred: impl Fn(&NodeKind) -> bool) -> &'a Node {
        module.descendants().find(|n| pred(&n.kind)).unwrap()
    }

    #[test]
    fn span_helpers() {
        let span = Span::new(3, 8);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::new(4, 4).is_empty());
    }

    #[test]
    fn delimiters_close_what_they_open() {
        for (open, close) in [("(", ")"), ("[", "]"), ("{", "}")] {
            assert_eq!(Delimiter::from_open(open).unwrap().close(), close);
        }
        assert_eq!(Delimiter::from_open(")"), None);
    }

    #[test]
    fn tokens_iterate_in_source_order() {
        let module = parse_module("f(a, [b]);", Dialect::Typed).unwrap();
        let texts: Vec<&str> = module.tokens().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["f", "(", "a", ",", "[", "b", "]", ")", ";", ""]);
    }

    #[test]
    fn group_inner_strips_brackets() {
        let module = parse_module("x = {a: 1, b: 2,};", Dialect::Typed).unwrap();
        let group = first_of_kind(&module, |k| *k == NodeKind::Group(Delimiter::Brace));
        let items = split_commas(group.inner());
        assert_eq!(items.len(), 2);
        assert_eq!(items[1][0].code(), "b");
    }

    #[test]
    fn code_drops_leading_trivia() {
        let module = parse_module("  // hi\n  foo(1)", Dialect::Typed).unwrap();
        let call = first_of_kind(&module, |k| matches!(k, NodeKind::CallExpression { .. }));
        assert_eq!(call.leading_trivia(), "  // hi\n  ");
        assert_eq!(call.code(), "foo(1)");
    }

    #[test]
    fn bindings_of_import_forms() {
        let source = "import A, {B, C as D, type E} from './a';\nimport * as NS from 'ns';\nimport './side';\nimport F = require('f');\n";
        let module = parse_module(source, Dialect::Typed).unwrap();
        let names: Vec<String> = module
            .descendants()
            .filter(|n| {
                matches!(
                    n.kind,
                    NodeKind::ImportDeclaration { .. } | NodeKind::ImportEquals { .. }
                )
            })
            .flat_map(imported_bindings)
            .collect();
        assert_eq!(names, vec!["A", "B", "D", "E", "NS", "F"]);
    }
}
