//! Recursive-descent parser for the ARNm language.
//!
//! Statements and declarations parse by recursive descent; expressions use
//! Pratt-style precedence climbing. Errors recover in panic mode: the first
//! mismatch in a window is recorded, further errors are suppressed until the
//! parser synchronizes at a statement boundary.
//!
//! The parser writes only to the AST arena. Failed productions yield
//! `ExprKind::Error`/`StmtKind::Error` placeholder nodes, which later
//! stages tolerate.

mod expr;
mod limits;
mod stmt;

pub use limits::{
    MAX_ARGS, MAX_DECLS, MAX_FIELDS, MAX_METHODS, MAX_PARAMS, MAX_RECEIVE_ARMS, MAX_STMTS,
};

use arnm_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use arnm_ir::ast::{ActorDecl, ActorField, Decl, DeclKind, FnDecl, Param, Program, StructDecl};
use arnm_ir::{
    AstArena, FnRange, LexErrorKind, SharedInterner, Span, Token, TokenKind, TypeAnn, TypeAnnId,
    TypeAnnKind,
};
use arnm_lexer::Lexer;
use smallvec::SmallVec;

/// Grow the stack before deeply recursive productions; breadth is capped by
/// the parser limits, depth is not.
#[cfg(not(target_arch = "wasm32"))]
fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    // 64 KiB red zone, 1 MiB growth.
    stacker::maybe_grow(64 * 1024, 1024 * 1024, f)
}

#[cfg(target_arch = "wasm32")]
fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Everything a parse produces: the root, its arena, and any diagnostics.
pub struct ParseOutput {
    pub program: Program,
    pub arena: AstArena,
    pub diagnostics: DiagnosticQueue,
}

impl ParseOutput {
    pub fn had_error(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Parse a whole source buffer.
pub fn parse(source: &str, interner: SharedInterner) -> ParseOutput {
    let lexer = Lexer::new(source, interner.clone());
    Parser::new(lexer, interner, source.len()).parse_program()
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    pub(crate) interner: SharedInterner,
    pub(crate) arena: AstArena,
    pub(crate) diagnostics: DiagnosticQueue,
    pub(crate) current: Token,
    pub(crate) previous: Token,
    pub(crate) panic_mode: bool,
}

impl<'src> Parser<'src> {
    pub fn new(lexer: Lexer<'src>, interner: SharedInterner, source_len: usize) -> Self {
        let mut parser = Parser {
            lexer,
            interner,
            arena: AstArena::with_capacity(source_len),
            diagnostics: DiagnosticQueue::new(),
            current: Token::new(TokenKind::Eof, Span::DUMMY),
            previous: Token::new(TokenKind::Eof, Span::DUMMY),
            panic_mode: false,
        };
        // Prime with the first token.
        parser.advance();
        parser
    }

    // ── Token plumbing ───────────────────────────────────────────────────

    pub(crate) fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.lexer.next_token();
            // Lexer errors surface here as diagnostics; scanning already
            // continued past the offending bytes.
            if let TokenKind::Error(kind) = self.current.kind {
                self.lex_error(kind, self.current.span);
                continue;
            }
            break;
        }
    }

    #[inline]
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub(crate) fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    pub(crate) fn consume(&mut self, kind: TokenKind, code: ErrorCode, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_current(code, message);
    }

    // ── Error reporting ──────────────────────────────────────────────────

    fn lex_error(&mut self, kind: LexErrorKind, span: Span) {
        let code = match kind {
            LexErrorKind::UnexpectedChar => ErrorCode::UnexpectedChar,
            LexErrorKind::UnterminatedString => ErrorCode::UnterminatedString,
            LexErrorKind::UnterminatedChar => ErrorCode::UnterminatedChar,
            LexErrorKind::UnterminatedComment => ErrorCode::UnterminatedComment,
            LexErrorKind::InvalidEscape => ErrorCode::InvalidEscape,
            LexErrorKind::InvalidNumber => ErrorCode::InvalidNumber,
        };
        self.diagnostics
            .push(Diagnostic::new(code, kind.message(), span));
    }

    fn error_at(&mut self, span: Span, code: ErrorCode, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.diagnostics.push(Diagnostic::new(code, message, span));
    }

    pub(crate) fn error(&mut self, code: ErrorCode, message: &str) {
        self.error_at(self.previous.span, code, message);
    }

    pub(crate) fn error_current(&mut self, code: ErrorCode, message: &str) {
        self.error_at(self.current.span, code, message);
    }

    /// Panic-mode recovery: skip to the next statement boundary.
    pub(crate) fn synchronize(&mut self) {
        self.panic_mode = false;

        while !self.check(TokenKind::Eof) {
            if self.previous.kind == TokenKind::Semi {
                return;
            }
            match self.current.kind {
                TokenKind::Fn
                | TokenKind::Actor
                | TokenKind::Let
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Spawn
                | TokenKind::Receive => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ── Type annotations ─────────────────────────────────────────────────

    /// `NAME`, `NAME?`, or `NAME[]`.
    pub(crate) fn parse_type(&mut self) -> Option<TypeAnnId> {
        let TokenKind::Ident(name) = self.current.kind else {
            self.error_current(ErrorCode::ExpectedIdent, "expected type name");
            return None;
        };
        self.advance();
        let span = self.previous.span;
        let base = self.arena.alloc_type_ann(TypeAnn {
            kind: TypeAnnKind::Named(name),
            span,
        });

        if self.matches(TokenKind::Question) {
            let full = span.merge(self.previous.span);
            return Some(self.arena.alloc_type_ann(TypeAnn {
                kind: TypeAnnKind::Optional(base),
                span: full,
            }));
        }

        if self.matches(TokenKind::LBracket) {
            self.consume(TokenKind::RBracket, ErrorCode::UnexpectedToken, "expected ']'");
            let full = span.merge(self.previous.span);
            return Some(self.arena.alloc_type_ann(TypeAnn {
                kind: TypeAnnKind::Array(base),
                span: full,
            }));
        }

        Some(base)
    }

    // ── Declarations ─────────────────────────────────────────────────────

    fn parse_program(mut self) -> ParseOutput {
        let mut decls: Vec<arnm_ir::DeclId> = Vec::new();

        while !self.check(TokenKind::Eof) {
            if decls.len() >= MAX_DECLS {
                self.error_current(ErrorCode::LimitExceeded, "too many declarations");
                break;
            }
            if let Some(decl) = self.parse_declaration() {
                decls.push(decl);
            }
            if self.panic_mode {
                self.synchronize();
            }
        }

        let range = self.arena.alloc_decl_list(decls);
        ParseOutput {
            program: Program { decls: range },
            arena: self.arena,
            diagnostics: self.diagnostics,
        }
    }

    fn parse_declaration(&mut self) -> Option<arnm_ir::DeclId> {
        if self.matches(TokenKind::Fn) {
            let span = self.previous.span;
            let fn_id = self.parse_function();
            return Some(self.arena.alloc_decl(Decl {
                kind: DeclKind::Fn(fn_id),
                span,
            }));
        }

        if self.matches(TokenKind::Actor) {
            let actor = self.parse_actor();
            let span = actor.span;
            return Some(self.arena.alloc_decl(Decl {
                kind: DeclKind::Actor(actor),
                span,
            }));
        }

        if self.matches(TokenKind::Struct) {
            let decl = self.parse_struct();
            let span = decl.span;
            return Some(self.arena.alloc_decl(Decl {
                kind: DeclKind::Struct(decl),
                span,
            }));
        }

        self.error_current(
            ErrorCode::UnexpectedToken,
            "expected 'fn', 'actor', or 'struct'",
        );
        self.advance(); // guarantee progress before synchronizing
        None
    }

    /// Parse `NAME ( params ) [-> type] { body }` after the `fn` keyword.
    pub(crate) fn parse_function(&mut self) -> arnm_ir::FnId {
        let span = self.previous.span;
        let name = self.expect_ident("expected function name");

        self.consume(TokenKind::LParen, ErrorCode::UnexpectedToken, "expected '(' after function name");

        let mut params: SmallVec<[Param; 8]> = SmallVec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                if params.len() >= MAX_PARAMS {
                    self.error(ErrorCode::LimitExceeded, "too many parameters");
                    break;
                }
                let is_mut = self.matches(TokenKind::Mut);
                let pname = self.expect_ident("expected parameter name");
                let pspan = self.previous.span;
                self.consume(TokenKind::Colon, ErrorCode::UnexpectedToken, "expected ':' after parameter name");
                let ty = self.parse_type();
                params.push(Param {
                    name: pname,
                    is_mut,
                    ty,
                    span: pspan,
                });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, ErrorCode::UnclosedParen, "expected ')' after parameters");

        let return_type = if self.matches(TokenKind::Arrow) {
            self.parse_type()
        } else {
            None
        };

        let body = self.parse_block();
        let params = self.arena.alloc_params(params);
        self.arena.alloc_fn(FnDecl {
            name,
            params,
            return_type,
            body,
            span,
        })
    }

    fn parse_actor(&mut self) -> ActorDecl {
        let span = self.previous.span;
        let name = self.expect_ident("expected actor name");

        self.consume(TokenKind::LBrace, ErrorCode::UnexpectedToken, "expected '{' after actor name");

        let first_method = self.arena.next_fn_id();
        let mut method_count: u16 = 0;
        let mut fields: SmallVec<[ActorField; 8]> = SmallVec::new();
        let mut receive_arms = None;

        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            if self.matches(TokenKind::Fn) {
                if usize::from(method_count) >= MAX_METHODS {
                    self.error(ErrorCode::LimitExceeded, "too many methods in actor");
                    break;
                }
                self.parse_function();
                method_count += 1;
            } else if self.matches(TokenKind::Receive) {
                receive_arms = Some(self.parse_receive_arms());
            } else if self.matches(TokenKind::Let) {
                if fields.len() >= MAX_FIELDS {
                    self.error(ErrorCode::LimitExceeded, "too many fields in actor");
                } else {
                    let fspan = self.previous.span;
                    let (fname, is_mut, ty, init) = self.parse_let_parts();
                    fields.push(ActorField {
                        name: fname,
                        is_mut,
                        ty,
                        init,
                        span: fspan,
                    });
                }
            } else {
                self.error_current(
                    ErrorCode::UnexpectedToken,
                    "expected 'fn', 'receive', or 'let' in actor",
                );
                self.advance();
                self.panic_mode = false;
            }
        }

        self.consume(TokenKind::RBrace, ErrorCode::UnclosedBrace, "expected '}' after actor body");

        let fields = self.arena.alloc_actor_fields(fields);
        ActorDecl {
            name,
            fields,
            methods: FnRange::new(first_method.raw(), method_count),
            receive_arms,
            span,
        }
    }

    fn parse_struct(&mut self) -> StructDecl {
        let span = self.previous.span;
        let name = self.expect_ident("expected struct name");

        self.consume(TokenKind::LBrace, ErrorCode::UnexpectedToken, "expected '{' after struct name");

        let mut fields: SmallVec<[Param; 8]> = SmallVec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                if fields.len() >= MAX_FIELDS {
                    self.error(ErrorCode::LimitExceeded, "too many fields in struct");
                    break;
                }
                let is_mut = self.matches(TokenKind::Mut);
                let fname = self.expect_ident("expected field name");
                let fspan = self.previous.span;
                self.consume(TokenKind::Colon, ErrorCode::UnexpectedToken, "expected ':' after field name");
                let ty = self.parse_type();
                fields.push(Param {
                    name: fname,
                    is_mut,
                    ty,
                    span: fspan,
                });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenKind::RBrace, ErrorCode::UnclosedBrace, "expected '}' after struct body");

        let fields = self.arena.alloc_params(fields);
        StructDecl { name, fields, span }
    }

    /// Consume an identifier, returning its name ( `Name::EMPTY` on error).
    pub(crate) fn expect_ident(&mut self, message: &str) -> arnm_ir::Name {
        if let TokenKind::Ident(name) = self.current.kind {
            self.advance();
            return name;
        }
        self.error_current(ErrorCode::ExpectedIdent, message);
        arnm_ir::Name::EMPTY
    }
}

#[cfg(test)]
mod tests;
