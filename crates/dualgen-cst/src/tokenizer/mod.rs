// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Lossless tokenizer.
//!
//! Every token owns the trivia (whitespace and comments) that precedes it, and
//! the final [`TokenKind::Eof`] token owns the trailing trivia of the file. The
//! concatenation of `leading + text` over all tokens reproduces the input
//! byte-for-byte.
//!
//! Regular-expression literals are recognized with the usual previous-token
//! heuristic: a `/` starts a regex when the preceding significant token cannot
//! end an expression. Template literals are split into head, middle and tail
//! parts around their substitutions, tracked with a brace stack.

#[cfg(test)]
mod tests;

use memchr::memmem;
use thiserror::Error;

use crate::nodes::Span;

/// Part of a template literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplatePart {
    /// `` `text` `` with no substitutions.
    Full,
    /// `` `text${ ``
    Head,
    /// `}text${`
    Middle,
    /// `` }text` ``
    Tail,
}

/// Token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier or keyword (including `#private` names).
    Ident,
    Number,
    /// String literal, quotes included.
    String,
    Regex,
    Template(TemplatePart),
    Punct,
    /// A comment line synthesized by a rewrite rule.
    Comment,
    /// End of input; text is empty, leading holds the trailing trivia.
    Eof,
}

/// A token with its leading trivia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub leading: String,
    pub span: Span,
}

impl Token {
    /// Build a token that does not come from the source text.
    pub fn synthetic(
        kind: TokenKind,
        text: impl Into<String>,
        leading: impl Into<String>,
        span: Span,
    ) -> Self {
        Token {
            kind,
            text: text.into(),
            leading: leading.into(),
            span,
        }
    }

    /// Whether this is the identifier, keyword or punctuator `text`.
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Punct) && self.text == text
    }

    /// Whether a line break occurs in the leading trivia.
    pub fn newline_before(&self) -> bool {
        self.leading.contains(['\n', '\r', '\u{2028}', '\u{2029}'])
    }

    /// Whether this token opens a template literal that continues after a substitution.
    pub fn opens_substitution(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Template(TemplatePart::Head) | TokenKind::Template(TemplatePart::Middle)
        )
    }
}

/// Tokenizer failures. Offsets are byte offsets into the input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokError {
    #[error("unterminated string literal")]
    UnterminatedString { offset: usize },
    #[error("unterminated template literal")]
    UnterminatedTemplate { offset: usize },
    #[error("unterminated block comment")]
    UnterminatedComment { offset: usize },
    #[error("unterminated regular expression literal")]
    UnterminatedRegex { offset: usize },
    #[error("unexpected character {character:?}")]
    UnexpectedCharacter { character: char, offset: usize },
}

impl TokError {
    /// Byte offset where the failing token starts.
    pub fn offset(&self) -> usize {
        match self {
            TokError::UnterminatedString { offset }
            | TokError::UnterminatedTemplate { offset }
            | TokError::UnterminatedComment { offset }
            | TokError::UnterminatedRegex { offset }
            | TokError::UnexpectedCharacter { offset, .. } => *offset,
        }
    }
}

/// Keywords after which a `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Punctuators, longest first within each first character.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**",
];

const SINGLE_PUNCTUATORS: &str = "{}()[];,<>+-*/%&|^!~?:=.@";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Block,
    Substitution,
}

/// Tokenize `text` into a vector ending with an [`TokenKind::Eof`] token.
pub fn tokenize(text: &str) -> Result<Vec<Token>, TokError> {
    let mut tokenizer = Tokenizer::new(text);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
    braces: Vec<Brace>,
    prev: Option<(TokenKind, &'a str)>,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Tokenizer {
            text,
            pos: 0,
            braces: Vec::new(),
            prev: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn skip_trivia(&mut self) -> Result<(), TokError> {
        if self.pos == 0 && self.text.starts_with("#!") {
            self.eat_while(|c| c != '\n');
        }
        loop {
            let rest = self.rest();
            if rest.starts_with("//") {
                self.eat_while(|c| c != '\n' && c != '\r');
            } else if rest.starts_with("/*") {
                let start = self.pos;
                match memmem::find(&rest.as_bytes()[2..], b"*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(TokError::UnterminatedComment { offset: start }),
                }
            } else if self.peek().is_some_and(|c| c.is_whitespace() || c == '\u{feff}') {
                self.eat_while(|c| c.is_whitespace() || c == '\u{feff}');
            } else {
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, TokError> {
        let trivia_start = self.pos;
        self.skip_trivia()?;
        let leading = self.text[trivia_start..self.pos].to_string();
        let start = self.pos;

        let Some(c) = self.peek() else {
            return Ok(Token::synthetic(
                TokenKind::Eof,
                "",
                leading,
                Span::new(start, start),
            ));
        };

        let kind = match c {
            '"' | '\'' => self.lex_string(c)?,
            '`' => {
                self.bump();
                self.lex_template(start, true)?
            }
            '}' if self.braces.last() == Some(&Brace::Substitution) => {
                self.braces.pop();
                self.bump();
                self.lex_template(start, false)?
            }
            '#' if self.peek_nth(1).is_some_and(is_ident_start) => {
                self.bump();
                self.eat_while(is_ident_continue);
                TokenKind::Ident
            }
            c if is_ident_start(c) => {
                self.eat_while(is_ident_continue);
                TokenKind::Ident
            }
            '0'..='9' => self.lex_number(),
            '.' if self.peek_nth(1).is_some_and(|d| d.is_ascii_digit()) => self.lex_number(),
            '/' if self.regex_allowed() => self.lex_regex(start)?,
            _ => self.lex_punct(start, c)?,
        };

        let text = &self.text[start..self.pos];
        self.prev = Some((kind, text));
        Ok(Token {
            kind,
            text: text.to_string(),
            leading,
            span: Span::new(start, self.pos),
        })
    }

    fn lex_string(&mut self, quote: char) -> Result<TokenKind, TokError> {
        let start = self.pos;
        self.bump();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    if self.bump() == Some('\r') && self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                '\n' | '\r' => break,
                c if c == quote => return Ok(TokenKind::String),
                _ => {}
            }
        }
        Err(TokError::UnterminatedString { offset: start })
    }

    /// Lex template text after a backtick or a substitution's closing brace.
    fn lex_template(&mut self, start: usize, opening: bool) -> Result<TokenKind, TokError> {
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '`' => {
                    let part = if opening {
                        TemplatePart::Full
                    } else {
                        TemplatePart::Tail
                    };
                    return Ok(TokenKind::Template(part));
                }
                '$' if self.peek() == Some('{') => {
                    self.bump();
                    self.braces.push(Brace::Substitution);
                    let part = if opening {
                        TemplatePart::Head
                    } else {
                        TemplatePart::Middle
                    };
                    return Ok(TokenKind::Template(part));
                }
                _ => {}
            }
        }
        Err(TokError::UnterminatedTemplate { offset: start })
    }

    fn lex_number(&mut self) -> TokenKind {
        let radix_prefix = self.peek() == Some('0')
            && self
                .peek_nth(1)
                .is_some_and(|c| matches!(c, 'x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        if radix_prefix {
            self.pos += 2;
            self.eat_while(|c| c.is_ascii_hexdigit() || c == '_');
        } else {
            self.eat_while(|c| c.is_ascii_digit() || c == '_');
            if self.peek() == Some('.') {
                self.bump();
                self.eat_while(|c| c.is_ascii_digit() || c == '_');
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let signed = matches!(self.peek_nth(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += digit_at;
                    self.eat_while(|c| c.is_ascii_digit() || c == '_');
                }
            }
        }
        if self.peek() == Some('n') {
            self.bump();
        }
        TokenKind::Number
    }

    fn lex_regex(&mut self, start: usize) -> Result<TokenKind, TokError> {
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None | Some('\n') | Some('\r') => {
                    return Err(TokError::UnterminatedRegex { offset: start })
                }
                Some('\\') => {
                    if matches!(self.bump(), None | Some('\n') | Some('\r')) {
                        return Err(TokError::UnterminatedRegex { offset: start });
                    }
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        self.eat_while(is_ident_continue);
        Ok(TokenKind::Regex)
    }

    fn lex_punct(&mut self, start: usize, c: char) -> Result<TokenKind, TokError> {
        let rest = self.rest();
        let multi = PUNCTUATORS.iter().find(|p| {
            rest.starts_with(**p)
                && !(**p == "?." && rest[2..].starts_with(|d: char| d.is_ascii_digit()))
        });
        let len = match multi {
            Some(p) => p.len(),
            None if SINGLE_PUNCTUATORS.contains(c) => 1,
            None => {
                return Err(TokError::UnexpectedCharacter {
                    character: c,
                    offset: start,
                })
            }
        };
        match &rest[..len] {
            "{" => self.braces.push(Brace::Block),
            "}" => {
                self.braces.pop();
            }
            _ => {}
        }
        self.pos += len;
        Ok(TokenKind::Punct)
    }

    fn regex_allowed(&self) -> bool {
        match self.prev {
            None => true,
            Some((TokenKind::Punct, text)) => !matches!(text, ")" | "]" | "}" | "++" | "--"),
            Some((TokenKind::Ident, text)) => REGEX_PRECEDING_KEYWORDS.contains(&text),
            Some((TokenKind::Template(part), _)) => {
                matches!(part, TemplatePart::Head | TemplatePart::Middle)
            }
            Some(_) => false,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c == '$' || c == '\u{200c}' || c == '\u{200d}' || c.is_alphanumeric()
}
