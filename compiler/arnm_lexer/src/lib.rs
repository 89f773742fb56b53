//! Single-pass tokenizer for the ARNm language.
//!
//! Zero-backtrack byte scanner with a single-slot peek buffer. The lexer
//! never interprets literal contents: string and char tokens carry their raw
//! interned lexeme, escapes included. Errors become [`TokenKind::Error`]
//! tokens; scanning always continues from the next byte.
//!
//! ASCII drives classification; multi-byte UTF-8 sequences pass through
//! transparently inside identifiers and string bodies.

use arnm_ir::{LexErrorKind, SharedInterner, Span, Token, TokenKind};

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

#[inline]
fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

#[inline]
fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

#[inline]
fn is_binary_digit(b: u8) -> bool {
    b == b'0' || b == b'1'
}

#[inline]
fn is_octal_digit(b: u8) -> bool {
    (b'0'..=b'7').contains(&b)
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    // Multi-byte UTF-8 passes through: a leading byte starts an identifier,
    // its continuation bytes are consumed by `is_ident_cont`.
    b.is_ascii_alphabetic() || b == b'_' || b >= 0xC0
}

#[inline]
fn is_ident_cont(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit() || (0x80..0xC0).contains(&b)
}

/// The ARNm tokenizer.
///
/// Owns nothing: tokens reference the source only through spans, so the
/// source buffer must outlive the token stream.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    interner: SharedInterner,
    cursor: usize,
    line: u32,
    column: u16,
    /// Single-slot peek buffer.
    peeked: Option<Token>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, interner: SharedInterner) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            interner,
            cursor: 0,
            line: 1,
            column: 1,
            peeked: None,
        }
    }

    /// The interner used for identifiers and literal lexemes.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Peek the next token without consuming it.
    ///
    /// Single-slot: repeated peeks return the same token; the following
    /// `next_token` consumes it.
    pub fn peek_token(&mut self) -> Token {
        if self.peeked.is_none() {
            let tok = self.scan_token();
            self.peeked = Some(tok);
        }
        // Slot was just filled above.
        self.peeked.unwrap_or_else(|| unreachable!("peek slot filled"))
    }

    /// Produce the next token, consuming any peeked one first.
    pub fn next_token(&mut self) -> Token {
        if let Some(tok) = self.peeked.take() {
            return tok;
        }
        self.scan_token()
    }

    // ── Byte-level helpers ───────────────────────────────────────────────

    #[inline]
    fn peek_byte(&self) -> u8 {
        self.bytes.get(self.cursor).copied().unwrap_or(0)
    }

    #[inline]
    fn peek_byte_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.cursor + offset).copied().unwrap_or(0)
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.cursor >= self.bytes.len()
    }

    /// Advance one byte, maintaining line and column.
    fn advance(&mut self) {
        if let Some(&b) = self.bytes.get(self.cursor) {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column = self.column.saturating_add(1);
            }
            self.cursor += 1;
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            let b = self.peek_byte();

            if !self.at_end() && is_whitespace(b) {
                self.advance();
                continue;
            }

            // Line comment: //...\n
            if b == b'/' && self.peek_byte_at(1) == b'/' {
                // Skip straight to the newline; the comment body cannot
                // contain one, so column arithmetic is a plain add.
                let rest = &self.bytes[self.cursor..];
                match memchr::memchr(b'\n', rest) {
                    Some(pos) => {
                        self.column = self
                            .column
                            .saturating_add(u16::try_from(pos).unwrap_or(u16::MAX));
                        self.cursor += pos;
                    }
                    None => {
                        self.column = self
                            .column
                            .saturating_add(u16::try_from(rest.len()).unwrap_or(u16::MAX));
                        self.cursor = self.bytes.len();
                    }
                }
                continue;
            }

            // Block comment, nesting counted.
            if b == b'/' && self.peek_byte_at(1) == b'*' {
                let start = self.cursor;
                let (start_line, start_col) = (self.line, self.column);
                self.advance();
                self.advance();
                let mut depth = 1u32;
                while depth > 0 && !self.at_end() {
                    if self.peek_byte() == b'/' && self.peek_byte_at(1) == b'*' {
                        self.advance();
                        self.advance();
                        depth += 1;
                    } else if self.peek_byte() == b'*' && self.peek_byte_at(1) == b'/' {
                        self.advance();
                        self.advance();
                        depth -= 1;
                    } else {
                        self.advance();
                    }
                }
                if depth > 0 {
                    return Some(self.error_token(
                        LexErrorKind::UnterminatedComment,
                        start,
                        start_line,
                        start_col,
                    ));
                }
                continue;
            }

            return None;
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize, line: u32, column: u16) -> Token {
        Token::new(
            kind,
            Span::new(start as u32, self.cursor as u32, line, column),
        )
    }

    fn error_token(
        &self,
        kind: LexErrorKind,
        start: usize,
        line: u32,
        column: u16,
    ) -> Token {
        self.make_token(TokenKind::Error(kind), start, line, column)
    }

    // ── Scanners ─────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Token {
        if let Some(err) = self.skip_whitespace_and_comments() {
            return err;
        }

        let start = self.cursor;
        let (line, column) = (self.line, self.column);

        if self.at_end() {
            return self.make_token(TokenKind::Eof, start, line, column);
        }

        let b = self.peek_byte();

        if is_ident_start(b) {
            return self.scan_identifier(start, line, column);
        }
        if is_digit(b) {
            return self.scan_number(start, line, column);
        }
        if b == b'"' {
            return self.scan_string(start, line, column);
        }
        if b == b'\'' {
            return self.scan_char(start, line, column);
        }

        self.advance();

        let kind = match b {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semi,
            b'~' => TokenKind::Tilde,
            b'@' => TokenKind::At,
            b'#' => TokenKind::Hash,
            b'?' => TokenKind::Question,
            b'^' => TokenKind::Caret,
            b'%' => TokenKind::Percent,

            b'+' => self.two_byte(b'=', TokenKind::PlusEq, TokenKind::Plus),
            b'*' => self.two_byte(b'=', TokenKind::StarEq, TokenKind::Star),
            b'/' => self.two_byte(b'=', TokenKind::SlashEq, TokenKind::Slash),
            b'!' => self.two_byte(b'=', TokenKind::BangEq, TokenKind::Bang),
            b'<' => self.two_byte(b'=', TokenKind::LtEq, TokenKind::Lt),
            b'>' => self.two_byte(b'=', TokenKind::GtEq, TokenKind::Gt),
            b'&' => self.two_byte(b'&', TokenKind::AmpAmp, TokenKind::Amp),
            b'|' => self.two_byte(b'|', TokenKind::PipePipe, TokenKind::Pipe),
            b':' => self.two_byte(b':', TokenKind::ColonColon, TokenKind::Colon),

            b'-' => {
                if self.peek_byte() == b'>' {
                    self.advance();
                    TokenKind::Arrow
                } else if self.peek_byte() == b'=' {
                    self.advance();
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            b'=' => {
                if self.peek_byte() == b'=' {
                    self.advance();
                    TokenKind::EqEq
                } else if self.peek_byte() == b'>' {
                    self.advance();
                    TokenKind::FatArrow
                } else {
                    TokenKind::Eq
                }
            }
            b'.' => {
                if self.peek_byte() == b'.' {
                    self.advance();
                    if self.peek_byte() == b'=' {
                        self.advance();
                        TokenKind::DotDotEq
                    } else {
                        TokenKind::DotDot
                    }
                } else {
                    TokenKind::Dot
                }
            }

            _ => TokenKind::Error(LexErrorKind::UnexpectedChar),
        };

        self.make_token(kind, start, line, column)
    }

    /// Greedy two-byte operator: if the next byte is `next`, produce `long`,
    /// else `short`.
    fn two_byte(&mut self, next: u8, long: TokenKind, short: TokenKind) -> TokenKind {
        if self.peek_byte() == next {
            self.advance();
            long
        } else {
            short
        }
    }

    fn scan_identifier(&mut self, start: usize, line: u32, column: u16) -> Token {
        while is_ident_cont(self.peek_byte()) && !self.at_end() {
            self.advance();
        }
        let text = &self.source[start..self.cursor];
        let kind = TokenKind::keyword(text)
            .unwrap_or_else(|| TokenKind::Ident(self.interner.intern(text)));
        self.make_token(kind, start, line, column)
    }

    fn scan_number(&mut self, start: usize, line: u32, column: u16) -> Token {
        // Radix prefixes: 0x, 0b, 0o.
        if self.peek_byte() == b'0' {
            let next = self.peek_byte_at(1);
            let radix: Option<(u32, fn(u8) -> bool)> = match next {
                b'x' | b'X' => Some((16, is_hex_digit)),
                b'b' | b'B' => Some((2, is_binary_digit)),
                b'o' | b'O' => Some((8, is_octal_digit)),
                _ => None,
            };
            if let Some((radix, accepts)) = radix {
                self.advance();
                self.advance();
                let digits_start = self.cursor;
                while accepts(self.peek_byte()) && !self.at_end() {
                    self.advance();
                }
                if self.cursor == digits_start {
                    return self.error_token(LexErrorKind::InvalidNumber, start, line, column);
                }
                let digits = &self.source[digits_start..self.cursor];
                return match i64::from_str_radix(digits, radix) {
                    Ok(value) => self.make_token(TokenKind::Int(value), start, line, column),
                    Err(_) => {
                        self.error_token(LexErrorKind::InvalidNumber, start, line, column)
                    }
                };
            }
        }

        let mut is_float = false;

        while is_digit(self.peek_byte()) {
            self.advance();
        }

        // Decimal point needs a digit on both sides.
        if self.peek_byte() == b'.' && is_digit(self.peek_byte_at(1)) {
            is_float = true;
            self.advance();
            while is_digit(self.peek_byte()) {
                self.advance();
            }
        }

        // An exponent promotes any decimal number to float.
        if matches!(self.peek_byte(), b'e' | b'E') {
            is_float = true;
            self.advance();
            if matches!(self.peek_byte(), b'+' | b'-') {
                self.advance();
            }
            while is_digit(self.peek_byte()) {
                self.advance();
            }
        }

        let text = &self.source[start..self.cursor];
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => {
                    self.make_token(TokenKind::Float(value.to_bits()), start, line, column)
                }
                Err(_) => self.error_token(LexErrorKind::InvalidNumber, start, line, column),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.make_token(TokenKind::Int(value), start, line, column),
                Err(_) => self.error_token(LexErrorKind::InvalidNumber, start, line, column),
            }
        }
    }

    fn scan_string(&mut self, start: usize, line: u32, column: u16) -> Token {
        self.advance(); // opening "

        while self.peek_byte() != b'"' && !self.at_end() {
            if self.peek_byte() == b'\\' {
                self.advance();
                if self.at_end() {
                    return self.error_token(
                        LexErrorKind::UnterminatedString,
                        start,
                        line,
                        column,
                    );
                }
            }
            self.advance();
        }

        if self.at_end() {
            return self.error_token(LexErrorKind::UnterminatedString, start, line, column);
        }

        self.advance(); // closing "
        let name = self.interner.intern(&self.source[start..self.cursor]);
        self.make_token(TokenKind::Str(name), start, line, column)
    }

    fn scan_char(&mut self, start: usize, line: u32, column: u16) -> Token {
        self.advance(); // opening '

        if self.peek_byte() == b'\\' {
            self.advance();
            if self.at_end() {
                return self.error_token(LexErrorKind::UnterminatedChar, start, line, column);
            }
            self.advance();
        } else if self.peek_byte() != b'\'' && !self.at_end() {
            self.advance();
        }

        if self.peek_byte() != b'\'' {
            return self.error_token(LexErrorKind::UnterminatedChar, start, line, column);
        }

        self.advance(); // closing '
        let name = self.interner.intern(&self.source[start..self.cursor]);
        self.make_token(TokenKind::Char(name), start, line, column)
    }
}

/// Tokenize a whole source buffer, ending with the EOF token.
pub fn tokenize(source: &str, interner: SharedInterner) -> Vec<Token> {
    let mut lexer = Lexer::new(source, interner);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests;
