use super::*;
use arnm_ir::KEYWORDS;
use pretty_assertions::assert_eq;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source, SharedInterner::new())
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn empty_source_is_eof() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
    assert_eq!(kinds("   \n\t  "), vec![TokenKind::Eof]);
}

#[test]
fn identifiers_and_keywords() {
    let interner = SharedInterner::new();
    let tokens = tokenize("fn foo actor receive spawned", interner.clone());
    assert_eq!(tokens[0].kind, TokenKind::Fn);
    assert!(matches!(tokens[1].kind, TokenKind::Ident(_)));
    assert_eq!(tokens[2].kind, TokenKind::Actor);
    assert_eq!(tokens[3].kind, TokenKind::Receive);
    // Keyword prefix does not leak: "spawned" is an identifier.
    let TokenKind::Ident(name) = tokens[4].kind else {
        panic!("expected identifier, got {:?}", tokens[4].kind);
    };
    assert_eq!(interner.lookup(name), "spawned");
}

#[test]
fn all_keywords_round_trip() {
    let interner = SharedInterner::new();
    for &(spelling, kind) in KEYWORDS {
        let tokens = tokenize(spelling, interner.clone());
        assert_eq!(tokens[0].kind, kind, "keyword {spelling}");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }
}

#[test]
fn integer_literals() {
    assert_eq!(
        kinds("42 0xFF 0b1010 0o755 0"),
        vec![
            TokenKind::Int(42),
            TokenKind::Int(255),
            TokenKind::Int(10),
            TokenKind::Int(0o755),
            TokenKind::Int(0),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn float_literals() {
    assert_eq!(
        kinds("3.14 1e10 2.5e-3 1E+2"),
        vec![
            TokenKind::Float(3.14f64.to_bits()),
            TokenKind::Float(1e10f64.to_bits()),
            TokenKind::Float(2.5e-3f64.to_bits()),
            TokenKind::Float(1e2f64.to_bits()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn dot_without_trailing_digit_is_not_float() {
    // `1.foo` is Int, Dot, Ident — the decimal point needs digits on both
    // sides.
    let k = kinds("1.foo");
    assert_eq!(k[0], TokenKind::Int(1));
    assert_eq!(k[1], TokenKind::Dot);
    assert!(matches!(k[2], TokenKind::Ident(_)));
}

#[test]
fn range_operators() {
    assert_eq!(
        kinds("0..10 0..=10"),
        vec![
            TokenKind::Int(0),
            TokenKind::DotDot,
            TokenKind::Int(10),
            TokenKind::Int(0),
            TokenKind::DotDotEq,
            TokenKind::Int(10),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn empty_radix_prefix_is_invalid() {
    assert_eq!(
        kinds("0x")[0],
        TokenKind::Error(LexErrorKind::InvalidNumber)
    );
    assert_eq!(
        kinds("0b")[0],
        TokenKind::Error(LexErrorKind::InvalidNumber)
    );
}

#[test]
fn multi_char_operators_are_greedy() {
    assert_eq!(
        kinds("-> => :: == != <= >= && || += -= *= /="),
        vec![
            TokenKind::Arrow,
            TokenKind::FatArrow,
            TokenKind::ColonColon,
            TokenKind::EqEq,
            TokenKind::BangEq,
            TokenKind::LtEq,
            TokenKind::GtEq,
            TokenKind::AmpAmp,
            TokenKind::PipePipe,
            TokenKind::PlusEq,
            TokenKind::MinusEq,
            TokenKind::StarEq,
            TokenKind::SlashEq,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn send_operator() {
    let k = kinds("target ! 42");
    assert!(matches!(k[0], TokenKind::Ident(_)));
    assert_eq!(k[1], TokenKind::Bang);
    assert_eq!(k[2], TokenKind::Int(42));
}

#[test]
fn string_literals_keep_raw_lexeme() {
    let interner = SharedInterner::new();
    let tokens = tokenize(r#""hello \"world\"""#, interner.clone());
    let TokenKind::Str(name) = tokens[0].kind else {
        panic!("expected string, got {:?}", tokens[0].kind);
    };
    assert_eq!(interner.lookup(name), r#""hello \"world\"""#);
}

#[test]
fn unterminated_string() {
    assert_eq!(
        kinds("\"oops")[0],
        TokenKind::Error(LexErrorKind::UnterminatedString)
    );
}

#[test]
fn char_literals() {
    let interner = SharedInterner::new();
    let tokens = tokenize(r"'a' '\n'", interner.clone());
    assert!(matches!(tokens[0].kind, TokenKind::Char(_)));
    assert!(matches!(tokens[1].kind, TokenKind::Char(_)));
    assert_eq!(
        kinds("'ab'")[0],
        TokenKind::Error(LexErrorKind::UnterminatedChar)
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        kinds("1 // comment\n2 /* block /* nested */ still */ 3"),
        vec![
            TokenKind::Int(1),
            TokenKind::Int(2),
            TokenKind::Int(3),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn unterminated_block_comment_is_error() {
    assert_eq!(
        kinds("1 /* never closed")[1],
        TokenKind::Error(LexErrorKind::UnterminatedComment)
    );
}

#[test]
fn line_and_column_tracking() {
    let tokens = tokenize("let x\n  = 1;", SharedInterner::new());
    assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1)); // let
    assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 5)); // x
    assert_eq!((tokens[2].span.line, tokens[2].span.column), (2, 3)); // =
    assert_eq!((tokens[3].span.line, tokens[3].span.column), (2, 5)); // 1
}

#[test]
fn spans_are_monotonic_and_cover_lexemes() {
    let source = "fn add(a: i32, b: i32) -> i32 { return a + b; }";
    let tokens = tokenize(source, SharedInterner::new());
    let mut prev_end = 0;
    for tok in &tokens {
        assert!(tok.span.start >= prev_end, "span went backwards: {tok:?}");
        assert!(tok.span.end >= tok.span.start);
        prev_end = tok.span.end;
    }
    // Non-EOF lexemes re-concatenate (with whitespace) to the source.
    let mut rebuilt = String::new();
    let mut cursor = 0usize;
    for tok in &tokens {
        rebuilt.push_str(&source[cursor..tok.span.start as usize]);
        rebuilt.push_str(tok.span.slice(source));
        cursor = tok.span.end as usize;
    }
    rebuilt.push_str(&source[cursor..]);
    assert_eq!(rebuilt, source);
}

#[test]
fn peek_is_single_slot() {
    let mut lexer = Lexer::new("a b c", SharedInterner::new());
    let p1 = lexer.peek_token();
    let p2 = lexer.peek_token();
    assert_eq!(p1, p2);

    let n1 = lexer.next_token();
    assert_eq!(n1, p1);

    let n2 = lexer.next_token();
    assert_ne!(n2.span, n1.span);
}

#[test]
fn unexpected_character() {
    assert_eq!(
        kinds("$")[0],
        TokenKind::Error(LexErrorKind::UnexpectedChar)
    );
}

#[test]
fn utf8_identifiers_pass_through() {
    let interner = SharedInterner::new();
    let tokens = tokenize("let café = 1;", interner.clone());
    let TokenKind::Ident(name) = tokens[1].kind else {
        panic!("expected identifier");
    };
    assert_eq!(interner.lookup(name), "café");
}
