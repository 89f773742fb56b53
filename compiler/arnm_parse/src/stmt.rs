//! Statement and block parsing.

use crate::limits::{MAX_RECEIVE_ARMS, MAX_STMTS};
use crate::Parser;
use arnm_diagnostic::ErrorCode;
use arnm_ir::ast::{Block, Pattern, ReceiveArm, Stmt, StmtKind};
use arnm_ir::{ArmRange, BlockId, ExprId, Name, StmtId, TokenKind, TypeAnnId};
use smallvec::SmallVec;

impl Parser<'_> {
    /// Parse `{ stmts }`.
    pub(crate) fn parse_block(&mut self) -> BlockId {
        let open = self.current.span;
        self.consume(TokenKind::LBrace, ErrorCode::ExpectedBlock, "expected '{'");

        let mut stmts: SmallVec<[StmtId; 16]> = SmallVec::new();

        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            if stmts.len() >= MAX_STMTS {
                self.error(ErrorCode::LimitExceeded, "too many statements in block");
                break;
            }
            stmts.push(self.parse_statement());
            if self.panic_mode {
                self.synchronize();
            }
        }

        self.consume(TokenKind::RBrace, ErrorCode::UnclosedBrace, "expected '}'");

        let span = open.merge(self.previous.span);
        let stmts = self.arena.alloc_stmt_list(stmts);
        self.arena.alloc_block(Block { stmts, span })
    }

    pub(crate) fn parse_statement(&mut self) -> StmtId {
        if self.matches(TokenKind::Let) {
            return self.parse_let_stmt();
        }
        if self.matches(TokenKind::Return) {
            return self.parse_return_stmt();
        }
        if self.matches(TokenKind::If) {
            return self.parse_if_stmt();
        }
        if self.matches(TokenKind::While) {
            return self.parse_while_stmt();
        }
        if self.matches(TokenKind::For) {
            return self.parse_for_stmt();
        }
        if self.matches(TokenKind::Loop) {
            return self.parse_loop_stmt();
        }
        if self.matches(TokenKind::Spawn) {
            return self.parse_spawn_stmt();
        }
        if self.matches(TokenKind::Receive) {
            return self.parse_receive_stmt();
        }
        if self.matches(TokenKind::Break) {
            let span = self.previous.span;
            self.consume(TokenKind::Semi, ErrorCode::UnexpectedToken, "expected ';' after break");
            return self.arena.alloc_stmt(Stmt::new(StmtKind::Break, span));
        }
        if self.matches(TokenKind::Continue) {
            let span = self.previous.span;
            self.consume(TokenKind::Semi, ErrorCode::UnexpectedToken, "expected ';' after continue");
            return self.arena.alloc_stmt(Stmt::new(StmtKind::Continue, span));
        }

        // Expression statement.
        let expr = self.parse_expression();
        let span = self.arena.expr(expr).span;
        self.consume(TokenKind::Semi, ErrorCode::UnexpectedToken, "expected ';' after expression");
        self.arena.alloc_stmt(Stmt::new(StmtKind::Expr(expr), span))
    }

    /// The pieces of `NAME [: type] [= init] ;` after the `let` keyword.
    /// Shared between let statements and actor fields.
    pub(crate) fn parse_let_parts(
        &mut self,
    ) -> (Name, bool, Option<TypeAnnId>, Option<ExprId>) {
        let is_mut = self.matches(TokenKind::Mut);
        let name = self.expect_ident("expected variable name");

        let ty = if self.matches(TokenKind::Colon) {
            self.parse_type()
        } else {
            None
        };

        let init = if self.matches(TokenKind::Eq) {
            Some(self.parse_expression())
        } else {
            None
        };

        self.consume(
            TokenKind::Semi,
            ErrorCode::UnexpectedToken,
            "expected ';' after variable declaration",
        );
        (name, is_mut, ty, init)
    }

    fn parse_let_stmt(&mut self) -> StmtId {
        let span = self.previous.span;
        let (name, is_mut, ty, init) = self.parse_let_parts();
        self.arena.alloc_stmt(Stmt::new(
            StmtKind::Let {
                name,
                is_mut,
                ty,
                init,
            },
            span,
        ))
    }

    fn parse_return_stmt(&mut self) -> StmtId {
        let span = self.previous.span;
        let value = if self.check(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.consume(TokenKind::Semi, ErrorCode::UnexpectedToken, "expected ';' after return");
        self.arena
            .alloc_stmt(Stmt::new(StmtKind::Return(value), span))
    }

    fn parse_if_stmt(&mut self) -> StmtId {
        let span = self.previous.span;
        let cond = self.parse_expression();
        let then_block = self.parse_block();

        let else_branch = if self.matches(TokenKind::Else) {
            if self.matches(TokenKind::If) {
                Some(self.parse_if_stmt())
            } else {
                let block = self.parse_block();
                let bspan = self.arena.block(block).span;
                Some(
                    self.arena
                        .alloc_stmt(Stmt::new(StmtKind::Block(block), bspan)),
                )
            }
        } else {
            None
        };

        self.arena.alloc_stmt(Stmt::new(
            StmtKind::If {
                cond,
                then_block,
                else_branch,
            },
            span,
        ))
    }

    fn parse_while_stmt(&mut self) -> StmtId {
        let span = self.previous.span;
        let cond = self.parse_expression();
        let body = self.parse_block();
        self.arena
            .alloc_stmt(Stmt::new(StmtKind::While { cond, body }, span))
    }

    fn parse_for_stmt(&mut self) -> StmtId {
        let span = self.previous.span;
        let var = self.expect_ident("expected iterator variable after 'for'");

        // `in` is not a keyword; it arrives as a plain identifier.
        let mut saw_in = false;
        if let TokenKind::Ident(name) = self.current.kind {
            if self.interner.lookup(name) == "in" {
                self.advance();
                saw_in = true;
            }
        }
        if !saw_in {
            self.error_current(ErrorCode::UnexpectedToken, "expected 'in' after iterator variable");
        }

        let iterable = self.parse_expression();
        let body = self.parse_block();
        self.arena.alloc_stmt(Stmt::new(
            StmtKind::For {
                var,
                iterable,
                body,
            },
            span,
        ))
    }

    fn parse_loop_stmt(&mut self) -> StmtId {
        let span = self.previous.span;
        let body = self.parse_block();
        self.arena
            .alloc_stmt(Stmt::new(StmtKind::Loop { body }, span))
    }

    fn parse_spawn_stmt(&mut self) -> StmtId {
        let span = self.previous.span;
        let expr = self.parse_expression();
        self.consume(TokenKind::Semi, ErrorCode::UnexpectedToken, "expected ';' after spawn");
        self.arena
            .alloc_stmt(Stmt::new(StmtKind::Spawn(expr), span))
    }

    fn parse_receive_stmt(&mut self) -> StmtId {
        let span = self.previous.span;
        let arms = self.parse_receive_arms();
        self.arena
            .alloc_stmt(Stmt::new(StmtKind::Receive { arms }, span))
    }

    /// Parse `{ pattern => block ... }` after the `receive` keyword.
    pub(crate) fn parse_receive_arms(&mut self) -> ArmRange {
        self.consume(TokenKind::LBrace, ErrorCode::ExpectedBlock, "expected '{' after receive");

        let mut arms: SmallVec<[ReceiveArm; 8]> = SmallVec::new();

        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            if arms.len() >= MAX_RECEIVE_ARMS {
                self.error(ErrorCode::LimitExceeded, "too many receive arms");
                break;
            }

            let arm_span = self.current.span;
            let pattern = match self.current.kind {
                TokenKind::Ident(name) => {
                    self.advance();
                    Pattern::Bind(name)
                }
                TokenKind::Int(value) => {
                    self.advance();
                    Pattern::Tag(value)
                }
                _ => {
                    self.error_current(
                        ErrorCode::UnexpectedToken,
                        "expected pattern (identifier or number)",
                    );
                    self.advance();
                    Pattern::Tag(0)
                }
            };

            self.consume(TokenKind::FatArrow, ErrorCode::UnexpectedToken, "expected '=>' after pattern");
            let body = self.parse_block();
            arms.push(ReceiveArm {
                pattern,
                body,
                span: arm_span,
            });

            if self.panic_mode {
                self.synchronize();
            }
        }

        self.consume(TokenKind::RBrace, ErrorCode::UnclosedBrace, "expected '}' after receive arms");
        self.arena.alloc_arms(arms)
    }
}
