//! Pratt expression parsing.

use crate::{limits::MAX_ARGS, with_stack, Parser};
use arnm_diagnostic::ErrorCode;
use arnm_ir::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use arnm_ir::{ExprId, Span, TokenKind};
use smallvec::SmallVec;

/// Binding strength, weakest to strongest.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub(crate) enum Precedence {
    None,
    /// `=` `+=` `-=` `*=` `/=`
    Assignment,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==` `!=`
    Equality,
    /// `<` `>` `<=` `>=`
    Comparison,
    /// `!` (message send)
    Send,
    /// `+` `-`
    Term,
    /// `*` `/` `%`
    Factor,
    /// unary `-` `!` `~`
    Unary,
    /// `.` `()` `[]`
    Call,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Send,
            Precedence::Send => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary | Precedence::Call => Precedence::Call,
        }
    }
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq
        | TokenKind::PlusEq
        | TokenKind::MinusEq
        | TokenKind::StarEq
        | TokenKind::SlashEq => Precedence::Assignment,
        TokenKind::PipePipe => Precedence::Or,
        TokenKind::AmpAmp => Precedence::And,
        TokenKind::EqEq | TokenKind::BangEq => Precedence::Equality,
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
            Precedence::Comparison
        }
        TokenKind::Bang => Precedence::Send,
        TokenKind::Plus | TokenKind::Minus => Precedence::Term,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Factor,
        TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot => Precedence::Call,
        _ => Precedence::None,
    }
}

/// Infix operator mapping. Compound assignments report their arithmetic op;
/// the assignment itself is rebuilt by `parse_binary`.
fn binary_op_of(kind: TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Plus | TokenKind::PlusEq => BinaryOp::Add,
        TokenKind::Minus | TokenKind::MinusEq => BinaryOp::Sub,
        TokenKind::Star | TokenKind::StarEq => BinaryOp::Mul,
        TokenKind::Slash | TokenKind::SlashEq => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::BangEq => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::Ge,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Eq => BinaryOp::Assign,
        _ => BinaryOp::Add,
    }
}

impl Parser<'_> {
    /// Parse one expression.
    pub fn parse_expression(&mut self) -> ExprId {
        self.parse_precedence(Precedence::Assignment)
    }

    pub(crate) fn error_expr(&mut self, span: Span) -> ExprId {
        self.arena.alloc_expr(Expr::new(ExprKind::Error, span))
    }

    fn parse_precedence(&mut self, prec: Precedence) -> ExprId {
        with_stack(|| {
            self.advance();
            let mut left = self.parse_prefix();

            while prec <= precedence_of(self.current.kind) {
                self.advance();
                left = self.parse_infix(left);
            }
            left
        })
    }

    fn parse_prefix(&mut self) -> ExprId {
        let span = self.previous.span;
        let kind = match self.previous.kind {
            TokenKind::Int(value) => ExprKind::Int(value),
            TokenKind::Float(bits) => ExprKind::Float(bits),
            TokenKind::Str(name) => ExprKind::Str(name),
            TokenKind::Char(name) => ExprKind::Char(name),
            TokenKind::Ident(name) => ExprKind::Ident(name),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Nil => ExprKind::Nil,
            TokenKind::SelfKw => ExprKind::SelfRef,
            TokenKind::LParen => return self.parse_grouping(span),
            TokenKind::Minus => return self.parse_unary(UnaryOp::Neg, span),
            TokenKind::Bang => return self.parse_unary(UnaryOp::Not, span),
            TokenKind::Tilde => return self.parse_unary(UnaryOp::BitNot, span),
            TokenKind::Spawn => return self.parse_spawn_expr(span),
            _ => {
                self.error(ErrorCode::ExpectedExpr, "expected expression");
                return self.error_expr(span);
            }
        };
        self.arena.alloc_expr(Expr::new(kind, span))
    }

    fn parse_infix(&mut self, left: ExprId) -> ExprId {
        match self.previous.kind {
            TokenKind::LParen => self.parse_call(left),
            TokenKind::LBracket => self.parse_index(left),
            TokenKind::Dot => self.parse_field(left),
            _ => self.parse_binary(left),
        }
    }

    fn parse_grouping(&mut self, span: Span) -> ExprId {
        let inner = self.parse_expression();
        self.consume(
            TokenKind::RParen,
            ErrorCode::UnclosedParen,
            "expected ')' after expression",
        );
        let full = span.merge(self.previous.span);
        self.arena
            .alloc_expr(Expr::new(ExprKind::Group(inner), full))
    }

    fn parse_unary(&mut self, op: UnaryOp, span: Span) -> ExprId {
        let operand = self.parse_precedence(Precedence::Unary);
        self.arena
            .alloc_expr(Expr::new(ExprKind::Unary { op, operand }, span))
    }

    fn parse_spawn_expr(&mut self, span: Span) -> ExprId {
        let inner = self.parse_precedence(Precedence::Unary);
        self.arena
            .alloc_expr(Expr::new(ExprKind::Spawn(inner), span))
    }

    fn parse_binary(&mut self, left: ExprId) -> ExprId {
        let op_kind = self.previous.kind;
        let op_span = self.previous.span;
        let prec = precedence_of(op_kind);

        let right = self.parse_precedence(prec.next());
        let span = self.arena.expr(left).span.merge(self.arena.expr(right).span);

        // `target ! message` builds a send node, not a binary.
        if op_kind == TokenKind::Bang {
            return self.arena.alloc_expr(Expr::new(
                ExprKind::Send {
                    target: left,
                    message: right,
                },
                span,
            ));
        }

        // Compound assignment desugars: `a += b` is `a = a + b`, sharing
        // the target node.
        let is_compound = matches!(
            op_kind,
            TokenKind::PlusEq | TokenKind::MinusEq | TokenKind::StarEq | TokenKind::SlashEq
        );
        if is_compound {
            let computed = self.arena.alloc_expr(Expr::new(
                ExprKind::Binary {
                    op: binary_op_of(op_kind),
                    lhs: left,
                    rhs: right,
                },
                op_span.merge(span),
            ));
            return self.arena.alloc_expr(Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Assign,
                    lhs: left,
                    rhs: computed,
                },
                span,
            ));
        }

        self.arena.alloc_expr(Expr::new(
            ExprKind::Binary {
                op: binary_op_of(op_kind),
                lhs: left,
                rhs: right,
            },
            span,
        ))
    }

    fn parse_call(&mut self, callee: ExprId) -> ExprId {
        let mut args: SmallVec<[ExprId; 8]> = SmallVec::new();

        if !self.check(TokenKind::RParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    self.error(ErrorCode::LimitExceeded, "too many arguments");
                    break;
                }
                args.push(self.parse_expression());
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(
            TokenKind::RParen,
            ErrorCode::UnclosedParen,
            "expected ')' after arguments",
        );

        let span = self
            .arena
            .expr(callee)
            .span
            .merge(self.previous.span);
        let args = self.arena.alloc_expr_list(args);
        self.arena
            .alloc_expr(Expr::new(ExprKind::Call { callee, args }, span))
    }

    fn parse_index(&mut self, object: ExprId) -> ExprId {
        let index = self.parse_expression();
        self.consume(
            TokenKind::RBracket,
            ErrorCode::UnexpectedToken,
            "expected ']' after index",
        );
        let span = self.arena.expr(object).span.merge(self.previous.span);
        self.arena
            .alloc_expr(Expr::new(ExprKind::Index { object, index }, span))
    }

    fn parse_field(&mut self, object: ExprId) -> ExprId {
        let field = self.expect_ident("expected field name after '.'");
        let span = self.arena.expr(object).span.merge(self.previous.span);
        self.arena
            .alloc_expr(Expr::new(ExprKind::Field { object, field }, span))
    }
}
