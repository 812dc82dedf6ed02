// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Recursive-descent recognizer producing the lossless tree.
//!
//! This is not a full grammar. The parser balances brackets and template
//! substitutions, and recognizes only the constructs that rewrite rules
//! target (async modifiers, await expressions, type references, calls,
//! imports, variable statements). Everything else is kept as a flat run of
//! tokens inside the innermost group.

mod errors;

pub use errors::ParserError;

use crate::dialect::Dialect;
use crate::nodes::{DeclarationKeyword, Delimiter, Element, Node, NodeKind};
use crate::tokenizer::{tokenize, TemplatePart, Token, TokenKind};

pub type Result<T> = std::result::Result<T, ParserError>;

/// Words that never start an identifier-based construct.
const RESERVED: &[&str] = &[
    "abstract", "as", "async", "await", "break", "case", "catch", "class", "const", "continue",
    "debugger", "declare", "default", "delete", "do", "else", "enum", "export", "extends",
    "false", "finally", "for", "from", "function", "if", "implements", "import", "in", "infer",
    "instanceof", "interface", "is", "keyof", "let", "new", "null", "of", "private", "protected",
    "public", "readonly", "return", "satisfies", "static", "super", "switch", "this", "throw",
    "true", "try", "type", "typeof", "var", "void", "while", "with", "yield",
];

/// Operators that may precede an await operand.
const PREFIX_OPERATORS: &[&str] = &["!", "~", "+", "-", "typeof", "void", "delete", "new"];

/// Tokens that continue an expression onto a new line.
const CONTINUATION_TOKENS: &[&str] = &[
    ".", "?.", "?", ":", "=>", "(", "[", "=", "+", "-", "*", "/", "%", "**", "==", "!=", "===",
    "!==", "<", ">", "<=", ">=", "&&", "||", "??", "&", "|", "^", "<<", ">>", ">>>", ",", "as",
    "satisfies", "in", "instanceof",
];

/// Words after which a new line does not end the expression.
const CONTINUING_WORDS: &[&str] = &[
    "new", "typeof", "void", "delete", "await", "in", "instanceof", "as", "satisfies", "keyof",
];

/// Puncts allowed at bracket depth zero inside type arguments.
const TYPE_ARGUMENT_PUNCTS: &[&str] = &[",", ".", "|", "&", "?", ":", "=>", "...", "-", "="];

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Parse a source file into a [`NodeKind::Module`] tree.
///
/// The module's children are the top-level elements followed by the
/// end-of-file token, which carries the file's trailing trivia.
pub fn parse_module(text: &str, dialect: Dialect) -> Result<Node> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        dialect,
    };
    let scope = Scope {
        kind: ScopeKind::Module,
        in_type: false,
    };
    let mut children = parser.parse_sequence(scope, Stop::Eof)?;
    children.push(parser.take().into());
    Ok(Node::new(NodeKind::Module, children))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Group(Delimiter),
    /// An annotation, initializer, type argument list or substitution.
    Clause,
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    kind: ScopeKind,
    in_type: bool,
}

impl Scope {
    fn clause(in_type: bool) -> Self {
        Scope {
            kind: ScopeKind::Clause,
            in_type,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stop {
    Eof,
    Close { text: &'static str, opener: usize },
    Substitution { opener: usize },
    Index(usize),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    dialect: Dialect,
}

impl Parser {
    fn token_at(&self, index: usize) -> &Token {
        // The vector always ends with the Eof token.
        &self.tokens[index.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        self.token_at(self.pos)
    }

    fn peek_at(&self, n: usize) -> &Token {
        self.token_at(self.pos + n)
    }

    fn take(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn take_n(&mut self, n: usize) -> Vec<Element> {
        (0..n).map(|_| self.take().into()).collect()
    }

    fn parse_sequence(&mut self, scope: Scope, stop: Stop) -> Result<Vec<Element>> {
        let mut out = Vec::new();
        while !self.at_stop(stop)? {
            let element = self.parse_element(scope, &out)?;
            out.push(element);
        }
        Ok(out)
    }

    fn at_stop(&self, stop: Stop) -> Result<bool> {
        let token = self.peek();
        match stop {
            Stop::Index(index) if self.pos >= index => return Ok(true),
            Stop::Close { text, .. } if token.is(text) => return Ok(true),
            Stop::Substitution { .. }
                if matches!(
                    token.kind,
                    TokenKind::Template(TemplatePart::Middle | TemplatePart::Tail)
                ) =>
            {
                return Ok(true)
            }
            _ => {}
        }
        match token.kind {
            TokenKind::Eof => match stop {
                Stop::Eof => Ok(true),
                Stop::Close { text, opener } => Err(ParserError::syntax(
                    format!("unclosed delimiter, expected `{}`", text),
                    opener,
                )),
                Stop::Substitution { opener } => Err(ParserError::syntax(
                    "unterminated template substitution",
                    opener,
                )),
                Stop::Index(_) => Err(ParserError::syntax(
                    "unexpected end of input",
                    token.span.start,
                )),
            },
            TokenKind::Punct if matches!(token.text.as_str(), ")" | "]" | "}") => Err(
                ParserError::syntax(format!("unexpected `{}`", token.text), token.span.start),
            ),
            TokenKind::Template(TemplatePart::Middle | TemplatePart::Tail) => Err(
                ParserError::syntax("unexpected template continuation", token.span.start),
            ),
            _ => Ok(false),
        }
    }

    fn parse_element(&mut self, scope: Scope, prev: &[Element]) -> Result<Element> {
        let token = self.peek();
        match token.kind {
            TokenKind::Punct if Delimiter::from_open(&token.text).is_some() => {
                Ok(self.parse_group(scope.in_type)?.into())
            }
            TokenKind::Template(_) => Ok(self.parse_template(scope.in_type)?.into()),
            TokenKind::String => Ok(self.parse_string_literal().into()),
            TokenKind::Number => {
                Ok(Node::new(NodeKind::NumericLiteral, vec![self.take().into()]).into())
            }
            TokenKind::Ident => self.parse_word(scope, prev),
            _ => Ok(self.take().into()),
        }
    }

    fn parse_group(&mut self, in_type: bool) -> Result<Node> {
        let open = self.take();
        let Some(delimiter) = Delimiter::from_open(&open.text) else {
            return Err(ParserError::syntax(
                format!("expected an opening bracket, found `{}`", open.text),
                open.span.start,
            ));
        };
        let scope = Scope {
            kind: ScopeKind::Group(delimiter),
            in_type,
        };
        let stop = Stop::Close {
            text: delimiter.close(),
            opener: open.span.start,
        };
        let mut children = vec![open.into()];
        children.extend(self.parse_sequence(scope, stop)?);
        children.push(self.take().into());
        Ok(Node::new(NodeKind::Group(delimiter), children))
    }

    fn parse_template(&mut self, in_type: bool) -> Result<Node> {
        let head = self.take();
        let opener = head.span.start;
        let substitutions = head.opens_substitution();
        let mut children: Vec<Element> = vec![head.into()];
        if substitutions {
            loop {
                children.extend(
                    self.parse_sequence(Scope::clause(in_type), Stop::Substitution { opener })?,
                );
                let part = self.take();
                let done = part.kind == TokenKind::Template(TemplatePart::Tail);
                children.push(part.into());
                if done {
                    break;
                }
            }
        }
        Ok(Node::new(NodeKind::Template, children))
    }

    fn parse_string_literal(&mut self) -> Node {
        let token = self.take();
        let value = string_value(&token.text).to_string();
        Node::new(NodeKind::StringLiteral { value }, vec![token.into()])
    }

    fn parse_word(&mut self, scope: Scope, prev: &[Element]) -> Result<Element> {
        let last = last_token(prev);
        if last.is_some_and(|t| t.is(".") || t.is("?.")) {
            return Ok(self.take().into());
        }

        let word = self.peek().text.clone();
        match word.as_str() {
            "async" if self.is_async_modifier() => {
                return Ok(Node::new(NodeKind::AsyncModifier, vec![self.take().into()]).into());
            }
            "await" if !last.is_some_and(|t| t.is("for")) && self.starts_expression(1) => {
                return Ok(self.parse_await(scope)?.into());
            }
            "import"
                if !last.is_some_and(|t| t.is("export"))
                    && !self.peek_at(1).is("(")
                    && !self.peek_at(1).is(".") =>
            {
                return Ok(self.parse_import()?.into());
            }
            "export" => {
                if let Some(node) = self.try_parse_export(scope)? {
                    return Ok(node.into());
                }
            }
            "const" | "let" | "var" if self.starts_declaration(0) => {
                return Ok(self.parse_variable_statement(scope, None)?.into());
            }
            _ => {}
        }

        if is_reserved(&word) {
            return Ok(self.take().into());
        }
        self.parse_identifier(scope, prev)
    }

    fn parse_identifier(&mut self, scope: Scope, prev: &[Element]) -> Result<Element> {
        let path_len = self.dotted_path_len();
        let name: String = (0..path_len)
            .map(|i| self.peek_at(i).text.as_str())
            .collect();
        let last = last_token(prev);
        let after_new = last.is_some_and(|t| t.is("new"));
        let value_query = last.is_some_and(|t| t.is("typeof") || t.is("keyof"));
        let type_context = scope.in_type || annotation_position(prev, scope);

        let after = self.peek_at(path_len);
        let angle = after.is("<") && (type_context || after.leading.is_empty());
        let call = after.is("(") && !last.is_some_and(|t| t.is("function"));

        if angle && !after_new {
            if let Some(close) = self.scan_type_arguments(self.pos + path_len, !type_context) {
                let mut children = self.take_n(path_len);
                children.push(self.parse_type_arguments(close)?.into());
                return Ok(Node::new(NodeKind::TypeReference { name }, children).into());
            }
        }
        if call && !type_context {
            let mut children = self.take_n(path_len);
            children.push(self.parse_group(false)?.into());
            return Ok(Node::new(NodeKind::CallExpression { callee: name }, children).into());
        }
        if type_context && !value_query {
            let children = self.take_n(path_len);
            return Ok(Node::new(NodeKind::TypeReference { name }, children).into());
        }
        Ok(self.take().into())
    }

    /// Number of tokens in the `a.b.c` path starting at the cursor.
    fn dotted_path_len(&self) -> usize {
        let mut len = 1;
        while self.peek_at(len).is(".") && self.peek_at(len + 1).kind == TokenKind::Ident {
            len += 2;
        }
        len
    }

    /// Scan a `<...>` type argument list starting at token `open`.
    ///
    /// On success `>>` and `>>>` tokens inside the list are split into single
    /// `>` tokens and the index of the closing `>` is returned.
    fn scan_type_arguments(&mut self, open: usize, value_context: bool) -> Option<usize> {
        let mut angle = 0i32;
        let mut bracket = 0usize;
        let mut close = None;
        for index in open..self.tokens.len() {
            let token = &self.tokens[index];
            match token.kind {
                TokenKind::Eof => return None,
                TokenKind::Template(TemplatePart::Full) => continue,
                TokenKind::Template(_) => return None,
                TokenKind::Punct => {}
                _ => continue,
            }
            match token.text.as_str() {
                "(" | "[" | "{" => bracket += 1,
                ")" | "]" | "}" => bracket = bracket.checked_sub(1)?,
                "<" => angle += 1,
                ">" | ">>" | ">>>" => {
                    angle -= token.text.len() as i32;
                    if angle < 0 {
                        return None;
                    }
                    if angle == 0 {
                        close = Some(index);
                        break;
                    }
                }
                text if bracket > 0 || TYPE_ARGUMENT_PUNCTS.contains(&text) => {}
                _ => return None,
            }
            if bracket == 0 && angle == 0 {
                return None;
            }
        }
        let close = close?;

        if value_context && !self.follows_type_arguments(self.token_at(close + 1)) {
            return None;
        }

        let mut extra = 0;
        let mut index = open;
        while index <= close + extra {
            let token = &self.tokens[index];
            if token.kind == TokenKind::Punct && matches!(token.text.as_str(), ">>" | ">>>") {
                let token = self.tokens.remove(index);
                let count = token.text.len();
                for k in 0..count {
                    let leading = if k == 0 { token.leading.clone() } else { String::new() };
                    let start = token.span.start + k;
                    self.tokens.insert(
                        index + k,
                        Token::synthetic(
                            TokenKind::Punct,
                            ">",
                            leading,
                            crate::nodes::Span::new(start, start + 1),
                        ),
                    );
                }
                extra += count - 1;
                index += count;
            } else {
                index += 1;
            }
        }
        Some(close + extra)
    }

    /// Whether `next` may follow type arguments in a value position.
    fn follows_type_arguments(&self, next: &Token) -> bool {
        if next.is("(")
            || matches!(
                next.kind,
                TokenKind::Template(TemplatePart::Full | TemplatePart::Head)
            )
        {
            return true;
        }
        if self.dialect == Dialect::Loose {
            return false;
        }
        next.kind == TokenKind::Eof
            || next.newline_before()
            || (next.kind == TokenKind::Punct
                && matches!(
                    next.text.as_str(),
                    ")" | "[" | "]" | "}" | ";" | "," | "=" | "." | "?." | "|" | "&"
                ))
    }

    fn parse_type_arguments(&mut self, close: usize) -> Result<Node> {
        let mut children: Vec<Element> = vec![self.take().into()];
        children.extend(self.parse_sequence(Scope::clause(true), Stop::Index(close))?);
        children.push(self.take().into());
        Ok(Node::new(NodeKind::TypeArguments, children))
    }

    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::Eof => return None,
                TokenKind::Punct => match token.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => {
                        depth = depth.checked_sub(1)?;
                        if depth == 0 {
                            return Some(index);
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        None
    }

    fn is_async_modifier(&self) -> bool {
        let next = self.peek_at(1);
        if next.newline_before() {
            return false;
        }
        match next.kind {
            TokenKind::Ident if next.is("function") => true,
            TokenKind::Ident => {
                let after = self.peek_at(2);
                after.is("=>") || after.is("(") || after.is("<")
            }
            TokenKind::String | TokenKind::Number => self.peek_at(2).is("("),
            TokenKind::Punct if next.is("*") || next.is("<") => true,
            TokenKind::Punct if next.is("(") => {
                self.matching_close(self.pos + 1).is_some_and(|close| {
                    let after = self.token_at(close + 1);
                    after.is("=>") || after.is(":")
                })
            }
            _ => false,
        }
    }

    fn starts_expression(&self, offset: usize) -> bool {
        let token = self.peek_at(offset);
        match token.kind {
            TokenKind::Ident => !matches!(
                token.text.as_str(),
                "in" | "of" | "instanceof" | "as" | "satisfies"
            ),
            TokenKind::Number | TokenKind::String | TokenKind::Regex => true,
            TokenKind::Template(part) => matches!(part, TemplatePart::Full | TemplatePart::Head),
            TokenKind::Punct => matches!(
                token.text.as_str(),
                "(" | "[" | "{" | "!" | "~" | "+" | "-" | "++" | "--"
            ),
            TokenKind::Comment | TokenKind::Eof => false,
        }
    }

    fn parse_await(&mut self, scope: Scope) -> Result<Node> {
        let mut children: Vec<Element> = vec![self.take().into()];
        let operand_scope = Scope {
            kind: scope.kind,
            in_type: false,
        };

        loop {
            let token = self.peek();
            if token.is("await") && self.starts_expression(1) {
                children.push(self.parse_await(operand_scope)?.into());
                return Ok(Node::new(NodeKind::AwaitExpression, children));
            }
            if matches!(token.kind, TokenKind::Punct | TokenKind::Ident)
                && PREFIX_OPERATORS.contains(&token.text.as_str())
            {
                children.push(self.take().into());
                continue;
            }
            break;
        }

        if self.at_operand_end() {
            return Err(ParserError::syntax(
                "expected an operand after `await`",
                self.peek().span.start,
            ));
        }
        let primary = self.parse_element(operand_scope, &children)?;
        children.push(primary);

        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Punct if token.is(".") || token.is("?.") => {
                    children.push(self.take().into());
                    if self.peek().kind == TokenKind::Ident {
                        children.push(self.take().into());
                    }
                }
                TokenKind::Punct if token.is("(") || token.is("[") => {
                    children.push(self.parse_group(false)?.into());
                }
                TokenKind::Template(TemplatePart::Full | TemplatePart::Head) => {
                    children.push(self.parse_template(false)?.into());
                }
                TokenKind::Punct if token.is("!") && token.leading.is_empty() => {
                    children.push(self.take().into());
                }
                TokenKind::Punct if token.is("<") && token.leading.is_empty() => {
                    match self.scan_type_arguments(self.pos, true) {
                        Some(close) => children.push(self.parse_type_arguments(close)?.into()),
                        None => break,
                    }
                }
                _ => break,
            }
        }
        Ok(Node::new(NodeKind::AwaitExpression, children))
    }

    fn at_operand_end(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Eof
            || (token.kind == TokenKind::Punct
                && matches!(token.text.as_str(), ")" | "]" | "}" | ";" | ","))
            || matches!(
                token.kind,
                TokenKind::Template(TemplatePart::Middle | TemplatePart::Tail)
            )
    }

    fn parse_import(&mut self) -> Result<Node> {
        let type_only = self.peek_at(1).is("type")
            && self.peek_at(2).kind == TokenKind::Ident
            && self.peek_at(3).is("=");
        let plain = self.peek_at(1).kind == TokenKind::Ident
            && !self.peek_at(1).is("type")
            && self.peek_at(2).is("=");
        if type_only || plain {
            return self.parse_import_equals(type_only);
        }

        let mut children: Vec<Element> = vec![self.take().into()];
        let specifier = self.parse_module_clause(&mut children)?;
        Ok(Node::new(
            NodeKind::ImportDeclaration {
                specifier,
                reexport: false,
            },
            children,
        ))
    }

    fn parse_import_equals(&mut self, type_only: bool) -> Result<Node> {
        let prefix = if type_only { 4 } else { 3 };
        let binding = self.peek_at(prefix - 2).text.clone();
        let mut children = self.take_n(prefix);
        let mut specifier = None;

        if self.peek().is("require") && self.peek_at(1).is("(") {
            children.push(self.take().into());
            let group = self.parse_group(false)?;
            specifier = match group.inner() {
                [Element::Node(Node {
                    kind: NodeKind::StringLiteral { value },
                    ..
                })] => Some(value.clone()),
                _ => None,
            };
            children.push(group.into());
        } else if self.peek().kind == TokenKind::Ident {
            let len = self.dotted_path_len();
            children.extend(self.take_n(len));
        }

        Ok(Node::new(
            NodeKind::ImportEquals {
                binding,
                specifier,
                type_only,
            },
            children,
        ))
    }

    /// Consume an import/export clause up to and including the module specifier.
    fn parse_module_clause(&mut self, children: &mut Vec<Element>) -> Result<Option<String>> {
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::String => {
                    let literal = self.parse_string_literal();
                    let specifier = match &literal.kind {
                        NodeKind::StringLiteral { value } => Some(value.clone()),
                        _ => None,
                    };
                    children.push(literal.into());
                    return Ok(specifier);
                }
                TokenKind::Punct if token.is("{") => {
                    children.push(self.parse_specifier_list()?.into());
                }
                TokenKind::Punct if token.is("*") || token.is(",") => {
                    children.push(self.take().into());
                }
                TokenKind::Ident => children.push(self.take().into()),
                _ => return Ok(None),
            }
        }
    }

    /// `{ a, b as c, type d }` kept as a flat token group.
    fn parse_specifier_list(&mut self) -> Result<Node> {
        let open = self.take();
        let opener = open.span.start;
        let mut children: Vec<Element> = vec![open.into()];
        loop {
            let token = self.peek();
            if token.kind == TokenKind::Eof {
                return Err(ParserError::syntax(
                    "unclosed delimiter, expected `}`",
                    opener,
                ));
            }
            let done = token.is("}");
            children.push(self.take().into());
            if done {
                return Ok(Node::new(NodeKind::Group(Delimiter::Brace), children));
            }
        }
    }

    fn try_parse_export(&mut self, scope: Scope) -> Result<Option<Node>> {
        let next = self.peek_at(1);
        if matches!(next.text.as_str(), "const" | "let" | "var")
            && next.kind == TokenKind::Ident
            && self.starts_declaration(1)
        {
            let export = self.take();
            return Ok(Some(self.parse_variable_statement(scope, Some(export))?));
        }

        let reexport = if next.is("*") {
            true
        } else {
            let brace = if next.is("{") {
                Some(1)
            } else if next.is("type") && self.peek_at(2).is("{") {
                Some(2)
            } else {
                None
            };
            brace
                .and_then(|offset| self.matching_close(self.pos + offset))
                .is_some_and(|close| self.token_at(close + 1).is("from"))
        };
        if !reexport {
            return Ok(None);
        }

        let mut children: Vec<Element> = vec![self.take().into()];
        let specifier = self.parse_module_clause(&mut children)?;
        Ok(Some(Node::new(
            NodeKind::ImportDeclaration {
                specifier,
                reexport: true,
            },
            children,
        )))
    }

    fn starts_declaration(&self, offset: usize) -> bool {
        let next = self.peek_at(offset + 1);
        match next.kind {
            TokenKind::Ident => !matches!(next.text.as_str(), "enum" | "in" | "of" | "instanceof"),
            TokenKind::Punct => next.is("{") || next.is("["),
            _ => false,
        }
    }

    fn parse_variable_statement(&mut self, scope: Scope, export: Option<Token>) -> Result<Node> {
        let exported = export.is_some();
        let mut children: Vec<Element> = export.into_iter().map(Element::from).collect();
        let keyword_token = self.take();
        let Some(keyword) = DeclarationKeyword::from_text(&keyword_token.text) else {
            return Err(ParserError::syntax(
                format!("expected a declaration keyword, found `{}`", keyword_token.text),
                keyword_token.span.start,
            ));
        };
        children.push(keyword_token.into());

        loop {
            children.push(self.parse_declarator()?.into());
            let next = self.peek_at(1);
            let binding_follows = next.kind == TokenKind::Ident || next.is("{") || next.is("[");
            if self.peek().is(",") && binding_follows {
                children.push(self.take().into());
            } else {
                break;
            }
        }

        Ok(Node::new(
            NodeKind::VariableStatement {
                keyword,
                exported,
                top_level: scope.kind == ScopeKind::Module,
            },
            children,
        ))
    }

    fn parse_declarator(&mut self) -> Result<Node> {
        let mut children: Vec<Element> = Vec::new();
        let mut name = None;

        let token = self.peek();
        if token.kind == TokenKind::Ident {
            name = Some(token.text.clone());
            children.push(self.take().into());
        } else if token.is("{") || token.is("[") {
            children.push(self.parse_group(false)?.into());
        }

        if self.peek().is("!") && self.peek().leading.is_empty() {
            children.push(self.take().into());
        }
        if self.peek().is(":") {
            children.push(self.take().into());
            self.parse_clause(Scope::clause(true), &mut children, &["=", ",", ";"])?;
        }
        if self.peek().is("=") {
            children.push(self.take().into());
            self.parse_clause(Scope::clause(false), &mut children, &[",", ";"])?;
        }

        Ok(Node::new(NodeKind::VariableDeclarator { name }, children))
    }

    /// Parse elements into `children` until a terminator, a closer, or the end of the statement.
    fn parse_clause(
        &mut self,
        scope: Scope,
        children: &mut Vec<Element>,
        terminators: &[&str],
    ) -> Result<()> {
        let start = children.len();
        loop {
            let token = self.peek();
            let ends = match token.kind {
                TokenKind::Eof => true,
                TokenKind::Template(TemplatePart::Middle | TemplatePart::Tail) => true,
                TokenKind::Punct => {
                    matches!(token.text.as_str(), ")" | "]" | "}")
                        || terminators.contains(&token.text.as_str())
                }
                _ => false,
            };
            if ends {
                return Ok(());
            }
            if children.len() > start
                && token.newline_before()
                && !continues(children.last(), token)
            {
                return Ok(());
            }
            let element = self.parse_element(scope, children)?;
            children.push(element);
        }
    }
}

/// Text between the quotes of a string literal token.
fn string_value(text: &str) -> &str {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        ""
    }
}

fn last_token(prev: &[Element]) -> Option<&Token> {
    prev.last().and_then(Element::as_token)
}

/// Whether an expression continues from `last` onto a new line starting with `next`.
fn continues(last: Option<&Element>, next: &Token) -> bool {
    if matches!(next.kind, TokenKind::Punct | TokenKind::Ident)
        && CONTINUATION_TOKENS.contains(&next.text.as_str())
    {
        return true;
    }
    match last.and_then(Element::as_token) {
        Some(t) if t.kind == TokenKind::Punct => {
            !matches!(t.text.as_str(), ")" | "]" | "}" | "++" | "--" | ";")
        }
        Some(t) if t.kind == TokenKind::Ident => CONTINUING_WORDS.contains(&t.text.as_str()),
        _ => false,
    }
}

fn ends_with_paren(element: &Element) -> bool {
    match element {
        Element::Node(node) if node.is_group(Delimiter::Paren) => true,
        Element::Node(node) => matches!(node.kind, NodeKind::CallExpression { .. })
            && node.children.last().is_some_and(ends_with_paren),
        Element::Token(_) => false,
    }
}

/// Whether an unmatched `?` of a conditional expression is open in `prev`.
fn pending_conditional(prev: &[Element]) -> bool {
    let start = prev
        .iter()
        .rposition(|e| e.is_token(";") || e.is_token(","))
        .map_or(0, |i| i + 1);
    let segment = &prev[start..];
    let mut depth = 0i32;
    for (i, element) in segment.iter().enumerate() {
        let optional_marker = element.is_token("?")
            && segment.get(i + 1).is_some_and(|next| next.is_token(":"));
        let optional_colon = element.is_token(":") && i > 0 && segment[i - 1].is_token("?");
        if element.is_token("?") && !optional_marker {
            depth += 1;
        } else if element.is_token(":") && !optional_colon {
            depth -= 1;
        }
    }
    depth > 0
}

/// Whether the next element sits where a type annotation is expected.
fn annotation_position(prev: &[Element], scope: Scope) -> bool {
    let Some((last, rest)) = prev.split_last() else {
        return false;
    };
    if last.is_token("as") || last.is_token("satisfies") {
        return true;
    }
    if !last.is_token(":") {
        return false;
    }
    let Some(before) = rest.last() else {
        return false;
    };
    if ends_with_paren(before) {
        return !pending_conditional(rest);
    }
    if scope.kind != ScopeKind::Group(Delimiter::Paren) {
        return false;
    }
    let rest = if before.is_token("?") {
        &rest[..rest.len() - 1]
    } else {
        rest
    };
    last_token(rest).is_some_and(|t| t.kind == TokenKind::Ident) && !pending_conditional(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Codegen;
    use crate::nodes::CodegenState;

    fn parse(text: &str) -> Node {
        parse_module(text, Dialect::Typed).unwrap()
    }

    fn kinds<'a>(module: &'a Node, pred: impl Fn(&NodeKind) -> bool + 'a) -> Vec<&'a Node> {
        module.descendants().filter(move |n| pred(&n.kind)).collect()
    }

    fn type_refs(module: &Node) -> Vec<String> {
        kinds(module, |k| matches!(k, NodeKind::TypeReference { .. }))
            .into_iter()
            .map(|n| n.code())
            .collect()
    }

    fn round_trip(text: &str) {
        let module = parse(text);
        let mut state = CodegenState::default();
        module.codegen(&mut state);
        assert_eq!(state.to_string(), text);
    }

    mod lossless {
        use super::*;

        #[test]
        fn round_trips_mixed_source() {
            round_trip(
                "// header\nimport x = require('x');\nexport async function f(a: Promise<Map<string, Array<number>>>): Promise<void> {\n  const r = await a; // done\n  return `${r}`;\n}\n",
            );
        }

        #[test]
        fn round_trips_shift_operators() {
            round_trip("const a = b >> 2 >>> c;\nlet d: Array<Array<T>> = [];\n");
        }

        #[test]
        fn module_ends_with_eof_token() {
            let module = parse("x;\n\n");
            let last = module.children.last().unwrap().as_token().unwrap();
            assert_eq!(last.kind, TokenKind::Eof);
            assert_eq!(last.leading, "\n\n");
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn mismatched_closer_is_reported_where_it_occurs() {
            let err = parse_module("f(a, [b);", Dialect::Typed).unwrap_err();
            assert_eq!(err.offset(), 7);
        }

        #[test]
        fn unclosed_group_points_at_opener() {
            let err = parse_module("f(a, [b]", Dialect::Typed).unwrap_err();
            assert_eq!(err.offset(), 1);
            assert_eq!(
                err.to_string(),
                "syntax error: unclosed delimiter, expected `)`"
            );
        }

        #[test]
        fn stray_closer_is_rejected() {
            let err = parse_module("a);", Dialect::Typed).unwrap_err();
            assert_eq!(
                err,
                ParserError::SyntaxError {
                    message: "unexpected `)`".to_string(),
                    offset: 1
                }
            );
        }

        #[test]
        fn tokenizer_errors_are_wrapped() {
            let err = parse_module("'abc", Dialect::Typed).unwrap_err();
            assert!(matches!(err, ParserError::TokenizerError(_)));
        }

        #[test]
        fn converts_to_located_parse_error() {
            let source = "a;\nb(;\n";
            let err = parse_module(source, Dialect::Typed)
                .unwrap_err()
                .into_parse_error("a.ts", source);
            assert_eq!(err.kind(), "ParseError");
            assert_eq!(err.location().unwrap().to_string(), "a.ts:2:2");
        }
    }

    mod async_constructs {
        use super::*;

        #[test]
        fn recognizes_async_modifiers() {
            let module = parse(
                "async function a() {}\nconst b = async () => {};\nconst c = async x => x;\nclass D { async e() {} async *f() {} }\n",
            );
            assert_eq!(
                kinds(&module, |k| *k == NodeKind::AsyncModifier).len(),
                5
            );
        }

        #[test]
        fn async_identifier_is_not_a_modifier() {
            let module = parse("const async = 1;\nasync(x);\nobj.async();\n");
            assert!(kinds(&module, |k| *k == NodeKind::AsyncModifier).is_empty());
        }

        #[test]
        fn await_operand_includes_postfix_chain() {
            let module = parse("const r = await this.client.get(`/x`).data!;\n");
            let awaits = kinds(&module, |k| *k == NodeKind::AwaitExpression);
            assert_eq!(awaits.len(), 1);
            assert_eq!(awaits[0].code(), "await this.client.get(`/x`).data!");
        }

        #[test]
        fn await_stops_at_binary_operator() {
            let module = parse("x = await a + await b;\n");
            let awaits: Vec<String> = kinds(&module, |k| *k == NodeKind::AwaitExpression)
                .into_iter()
                .map(|n| n.code())
                .collect();
            assert_eq!(awaits, vec!["await a", "await b"]);
        }

        #[test]
        fn nested_awaits_nest() {
            let module = parse("await await f();\n");
            let outer = kinds(&module, |k| *k == NodeKind::AwaitExpression)[0];
            assert_eq!(outer.code(), "await await f()");
            assert_eq!(outer.descendants().filter(|n| n.kind == NodeKind::AwaitExpression).count(), 1);
        }

        #[test]
        fn for_await_is_not_an_await_expression() {
            let module = parse("for await (const x of xs) {}\n");
            assert!(kinds(&module, |k| *k == NodeKind::AwaitExpression).is_empty());
        }
    }

    mod types {
        use super::*;

        #[test]
        fn type_references_in_annotations() {
            let module = parse("function f(a: Foo, b?: Promise<string>): Promise<Bar> {}\n");
            assert_eq!(
                type_refs(&module),
                vec!["Foo", "Promise<string>", "string", "Promise<Bar>", "Bar"]
            );
        }

        #[test]
        fn method_return_type() {
            let module = parse("class A { async get(): Promise<number> { return 1; } }\n");
            assert!(type_refs(&module).contains(&"Promise<number>".to_string()));
        }

        #[test]
        fn nested_arguments_split_shift_tokens() {
            let module = parse("let x: Promise<Array<string>> = y;\n");
            let refs = type_refs(&module);
            assert_eq!(refs[0], "Promise<Array<string>>");
            assert_eq!(refs[1], "Array<string>");
        }

        #[test]
        fn comparisons_are_not_type_arguments() {
            let module = parse("if (a < b && c > d) {}\nx = a<b || c>d;\n");
            assert!(type_refs(&module).is_empty());
        }

        #[test]
        fn conditional_expression_is_not_an_annotation() {
            let module = parse("f(ok ? a : b);\n");
            assert!(type_refs(&module).is_empty());
        }

        #[test]
        fn new_expression_keeps_type_arguments_raw() {
            let module = parse("const p = new Promise<void>((resolve) => resolve());\n");
            assert!(type_refs(&module).is_empty());
        }

        #[test]
        fn typeof_query_is_not_a_reference() {
            let module = parse("let x: typeof foo;\n");
            assert!(type_refs(&module).is_empty());
        }

        #[test]
        fn class_field_and_interface_member() {
            let module = parse(
                "class A {\n  pending: Promise<string>[] = [];\n}\ninterface B {\n  items: Promise<number>[];\n  done?: Promise<void>;\n}\n",
            );
            assert_eq!(
                type_refs(&module),
                vec![
                    "Promise<string>",
                    "string",
                    "Promise<number>",
                    "number",
                    "Promise<void>"
                ]
            );
        }

        #[test]
        fn bare_reference_after_as() {
            let module = parse("const x = y as Promise;\n");
            assert_eq!(type_refs(&module), vec!["Promise"]);
        }
    }

    mod calls {
        use super::*;

        #[test]
        fn dotted_callee() {
            let module = parse("const all = Promise.all(items);\n");
            let calls = kinds(&module, |k| matches!(k, NodeKind::CallExpression { .. }));
            assert_eq!(
                calls[0].kind,
                NodeKind::CallExpression {
                    callee: "Promise.all".to_string()
                }
            );
        }

        #[test]
        fn function_declaration_is_not_a_call() {
            let module = parse("function go(a) {}\n");
            assert!(kinds(&module, |k| matches!(k, NodeKind::CallExpression { .. })).is_empty());
        }
    }

    mod imports {
        use super::*;

        #[test]
        fn import_declarations_capture_specifiers() {
            let module = parse(
                "import a from 'then-request';\nimport * as b from \"./b\";\nimport './c';\nexport {d} from './d';\nexport * from './e';\n",
            );
            let specs: Vec<(Option<String>, bool)> = kinds(&module, |k| {
                matches!(k, NodeKind::ImportDeclaration { .. })
            })
            .into_iter()
            .map(|n| match &n.kind {
                NodeKind::ImportDeclaration { specifier, reexport } => {
                    (specifier.clone(), *reexport)
                }
                _ => unreachable!(),
            })
            .collect();
            assert_eq!(
                specs,
                vec![
                    (Some("then-request".to_string()), false),
                    (Some("./b".to_string()), false),
                    (Some("./c".to_string()), false),
                    (Some("./d".to_string()), true),
                    (Some("./e".to_string()), true),
                ]
            );
        }

        #[test]
        fn local_export_list_is_not_a_reexport() {
            let module = parse("export {a, b};\n");
            assert!(kinds(&module, |k| matches!(k, NodeKind::ImportDeclaration { .. })).is_empty());
        }

        #[test]
        fn dynamic_import_is_not_a_declaration() {
            let module = parse("const m = await import('./m');\n");
            assert!(kinds(&module, |k| matches!(k, NodeKind::ImportDeclaration { .. })).is_empty());
        }

        #[test]
        fn import_equals_forms() {
            let module = parse("import x = require('x');\nimport type T = require('t');\nimport N = A.B;\n");
            let forms: Vec<NodeKind> = kinds(&module, |k| matches!(k, NodeKind::ImportEquals { .. }))
                .into_iter()
                .map(|n| n.kind.clone())
                .collect();
            assert_eq!(
                forms,
                vec![
                    NodeKind::ImportEquals {
                        binding: "x".to_string(),
                        specifier: Some("x".to_string()),
                        type_only: false
                    },
                    NodeKind::ImportEquals {
                        binding: "T".to_string(),
                        specifier: Some("t".to_string()),
                        type_only: true
                    },
                    NodeKind::ImportEquals {
                        binding: "N".to_string(),
                        specifier: None,
                        type_only: false
                    },
                ]
            );
        }
    }

    mod declarations {
        use super::*;

        #[test]
        fn exported_top_level_const() {
            let module = parse("export const FooEnum = {A: 1, B: 'b'};\n");
            let statement = kinds(&module, |k| matches!(k, NodeKind::VariableStatement { .. }))[0];
            assert_eq!(
                statement.kind,
                NodeKind::VariableStatement {
                    keyword: DeclarationKeyword::Const,
                    exported: true,
                    top_level: true
                }
            );
            assert_eq!(statement.code(), "export const FooEnum = {A: 1, B: 'b'}");
        }

        #[test]
        fn nested_declarations_are_not_top_level() {
            let module = parse("function f() { const x = 1; }\n");
            let statement = kinds(&module, |k| matches!(k, NodeKind::VariableStatement { .. }))[0];
            assert!(matches!(
                statement.kind,
                NodeKind::VariableStatement { top_level: false, .. }
            ));
        }

        #[test]
        fn declarators_split_on_commas() {
            let module = parse("let a = f(1, 2), b: number, c = [3, 4];\n");
            let names: Vec<Option<String>> = kinds(&module, |k| {
                matches!(k, NodeKind::VariableDeclarator { .. })
            })
            .into_iter()
            .map(|n| match &n.kind {
                NodeKind::VariableDeclarator { name } => name.clone(),
                _ => unreachable!(),
            })
            .collect();
            assert_eq!(
                names,
                vec![Some("a".to_string()), Some("b".to_string()), Some("c".to_string())]
            );
        }

        #[test]
        fn initializer_ends_at_line_break_without_semicolon() {
            let module = parse("const a = 1\nfoo()\n");
            let declarator = kinds(&module, |k| matches!(k, NodeKind::VariableDeclarator { .. }))[0];
            assert_eq!(declarator.code(), "a = 1");
        }

        #[test]
        fn initializer_continues_on_member_access() {
            let module = parse("const a = b\n  .c()\n");
            let declarator = kinds(&module, |k| matches!(k, NodeKind::VariableDeclarator { .. }))[0];
            assert_eq!(declarator.code(), "a = b\n  .c()");
        }

        #[test]
        fn const_enum_is_not_a_variable_statement() {
            let module = parse("const enum E { A }\n");
            assert!(kinds(&module, |k| matches!(k, NodeKind::VariableStatement { .. })).is_empty());
        }
    }
}
