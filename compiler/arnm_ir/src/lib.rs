//! ARNm IR - core compiler data structures.
//!
//! This crate contains the types shared by every stage of the ARNm compiler:
//! - [`Span`] for source locations
//! - [`Name`] and [`StringInterner`] for interned identifiers
//! - [`Token`] and [`TokenKind`] for lexer output
//! - The flat AST ([`ast`]) and its arena ([`AstArena`])
//!
//! # Design
//!
//! - **Intern everything**: strings become `Name(u32)`.
//! - **Flatten everything**: no `Box<Expr>`; children are `ExprId(u32)`
//!   indices into the arena, and lists are `(start, len)` ranges into
//!   side vectors. The whole tree is dropped in one shot with the arena.

/// Compile-time assertion that a type has a specific size.
///
/// Prevents accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod span;
mod name;
mod interner;
mod token;
mod ids;
pub mod ast;
mod arena;

pub use span::Span;
pub use name::Name;
pub use interner::{SharedInterner, StringInterner};
pub use token::{LexErrorKind, Token, TokenKind, KEYWORDS};
pub use ids::{
    ArmId, ArmRange, BlockId, DeclId, DeclRange, ExprId, ExprRange, FieldId, FieldRange, FnId,
    FnRange, ParamId, ParamRange, StmtId, StmtRange, TypeAnnId,
};
pub use arena::AstArena;
pub use ast::{
    ActorDecl, ActorField, BinaryOp, Block, Decl, DeclKind, Expr, ExprKind, FnDecl, Param,
    Pattern, Program, ReceiveArm, Stmt, StmtKind, StructDecl, TypeAnn, TypeAnnKind, UnaryOp,
};
