// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use super::{tokenize, TemplatePart, TokError, TokenKind};

fn kinds_and_texts(text: &str) -> Vec<(TokenKind, String)> {
    let mut tokens = tokenize(text).expect("tokenize");
    assert_eq!(tokens.pop().map(|t| t.kind), Some(TokenKind::Eof));
    tokens.into_iter().map(|t| (t.kind, t.text)).collect()
}

fn texts(text: &str) -> Vec<String> {
    kinds_and_texts(text).into_iter().map(|(_, t)| t).collect()
}

fn round_trip(text: &str) -> String {
    tokenize(text)
        .expect("tokenize")
        .iter()
        .map(|t| format!("{}{}", t.leading, t.text))
        .collect()
}

#[test]
fn test_identifiers_and_keywords() {
    assert_eq!(
        kinds_and_texts("async function $x_1(#y) {}"),
        vec![
            (TokenKind::Ident, "async".to_string()),
            (TokenKind::Ident, "function".to_string()),
            (TokenKind::Ident, "$x_1".to_string()),
            (TokenKind::Punct, "(".to_string()),
            (TokenKind::Ident, "#y".to_string()),
            (TokenKind::Punct, ")".to_string()),
            (TokenKind::Punct, "{".to_string()),
            (TokenKind::Punct, "}".to_string()),
        ]
    );
}

#[test]
fn test_numbers() {
    assert_eq!(
        texts("1 1.5 .5 1e10 1E-3 0xFF 0b1010 0o17 1_000 10n"),
        vec!["1", "1.5", ".5", "1e10", "1E-3", "0xFF", "0b1010", "0o17", "1_000", "10n"]
    );
}

#[test]
fn test_strings_with_escapes() {
    assert_eq!(
        kinds_and_texts(r#"'it\'s' "a\"b""#),
        vec![
            (TokenKind::String, r"'it\'s'".to_string()),
            (TokenKind::String, r#""a\"b""#.to_string()),
        ]
    );
}

#[test]
fn test_unterminated_string() {
    assert_eq!(
        tokenize("x = 'abc\n';"),
        Err(TokError::UnterminatedString { offset: 4 })
    );
}

#[test]
fn test_template_with_substitutions() {
    let tokens = kinds_and_texts("`a${b}c${ {d: 1}.d }e`");
    let template_kinds: Vec<TokenKind> = tokens
        .iter()
        .map(|(k, _)| *k)
        .filter(|k| matches!(k, TokenKind::Template(_)))
        .collect();
    assert_eq!(
        template_kinds,
        vec![
            TokenKind::Template(TemplatePart::Head),
            TokenKind::Template(TemplatePart::Middle),
            TokenKind::Template(TemplatePart::Tail),
        ]
    );
    assert_eq!(tokens[0].1, "`a${");
    assert_eq!(tokens.last().unwrap().1, "}e`");
}

#[test]
fn test_plain_template() {
    assert_eq!(
        kinds_and_texts("`hello`"),
        vec![(TokenKind::Template(TemplatePart::Full), "`hello`".to_string())]
    );
}

#[test]
fn test_unterminated_template() {
    assert_eq!(
        tokenize("`abc"),
        Err(TokError::UnterminatedTemplate { offset: 0 })
    );
}

#[test]
fn test_regex_after_operator() {
    assert_eq!(
        kinds_and_texts("x = /a[/]b/gi;"),
        vec![
            (TokenKind::Ident, "x".to_string()),
            (TokenKind::Punct, "=".to_string()),
            (TokenKind::Regex, "/a[/]b/gi".to_string()),
            (TokenKind::Punct, ";".to_string()),
        ]
    );
}

#[test]
fn test_division_after_operand() {
    assert_eq!(texts("a / b / c"), vec!["a", "/", "b", "/", "c"]);
    assert_eq!(texts("(a) / 2"), vec!["(", "a", ")", "/", "2"]);
}

#[test]
fn test_regex_after_keyword() {
    let tokens = kinds_and_texts("return /x/.test(s)");
    assert_eq!(tokens[1], (TokenKind::Regex, "/x/".to_string()));
}

#[test]
fn test_punctuators_longest_match() {
    assert_eq!(
        texts("a?.b ?? c === d >>>= e => f ... g"),
        vec!["a", "?.", "b", "??", "c", "===", "d", ">>>=", "e", "=>", "f", "...", "g"]
    );
}

#[test]
fn test_optional_chain_vs_conditional_number() {
    assert_eq!(texts("a?.5:1"), vec!["a", "?", ".5", ":", "1"]);
}

#[test]
fn test_trivia_attaches_to_next_token() {
    let tokens = tokenize("  // one\n  /* two */ x\n").unwrap();
    assert_eq!(tokens[0].leading, "  // one\n  /* two */ ");
    assert_eq!(tokens[0].text, "x");
    assert!(tokens[0].newline_before());
    assert_eq!(tokens[1].kind, TokenKind::Eof);
    assert_eq!(tokens[1].leading, "\n");
}

#[test]
fn test_unterminated_comment() {
    assert_eq!(
        tokenize("x /* never closed"),
        Err(TokError::UnterminatedComment { offset: 2 })
    );
}

#[test]
fn test_unexpected_character() {
    assert_eq!(
        tokenize("a \u{1} b"),
        Err(TokError::UnexpectedCharacter {
            character: '\u{1}',
            offset: 2
        })
    );
}

#[test]
fn test_shebang_is_trivia() {
    let tokens = tokenize("#!/usr/bin/env node\nrun();").unwrap();
    assert_eq!(tokens[0].leading, "#!/usr/bin/env node\n");
    assert_eq!(tokens[0].text, "run");
}

#[test]
fn test_round_trip_is_lossless() {
    let source = "\u{feff}// @ts-check\nimport x = require('y');\r\n\nasync function f(): Promise<Array<string>> {\n  const r = await x.get(`/a/${id}`); /* c */\n  return r >>> 0 / 2;\n}\n";
    assert_eq!(round_trip(source), source);
}

#[test]
fn test_spans_cover_token_text() {
    let source = "let abc = 'x';";
    for token in tokenize(source).unwrap() {
        assert_eq!(&source[token.span.start..token.span.end], token.text);
    }
}
