//! Typed index handles into the AST arena.
//!
//! Every node kind gets its own `u32` newtype so an `ExprId` cannot be used
//! where a `StmtId` is expected. List-valued fields use `(start, len)` range
//! types into the arena's side vectors.

use std::fmt;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                $name(raw)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

macro_rules! define_range {
    ($(#[$doc:meta])* $name:ident => $id:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
        pub struct $name {
            pub start: u32,
            pub len: u16,
        }

        impl $name {
            pub const EMPTY: $name = $name { start: 0, len: 0 };

            #[inline]
            pub const fn new(start: u32, len: u16) -> Self {
                $name { start, len }
            }

            #[inline]
            pub const fn len(self) -> usize {
                self.len as usize
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.len == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($name), "({}..+{})"),
                    self.start, self.len
                )
            }
        }
    };
}

define_id!(
    /// Handle to an expression in the arena.
    ExprId
);
define_id!(
    /// Handle to a statement in the arena.
    StmtId
);
define_id!(
    /// Handle to a block in the arena.
    BlockId
);
define_id!(
    /// Handle to a top-level declaration in the arena.
    DeclId
);
define_id!(
    /// Handle to a type annotation in the arena.
    TypeAnnId
);
define_id!(
    /// Handle to a function declaration (top-level or actor method).
    FnId
);
define_id!(
    /// Handle to a function/struct parameter.
    ParamId
);
define_id!(
    /// Handle to an actor field.
    FieldId
);
define_id!(
    /// Handle to a receive arm.
    ArmId
);

define_range!(
    /// Range into the arena's expression-list store (call arguments).
    ExprRange => ExprId
);
define_range!(
    /// Range into the arena's statement-list store (block bodies).
    StmtRange => StmtId
);
define_range!(
    /// Range into the arena's parameter store.
    ParamRange => ParamId
);
define_range!(
    /// Range into the arena's actor-field store.
    FieldRange => FieldId
);
define_range!(
    /// Range into the arena's receive-arm store.
    ArmRange => ArmId
);
define_range!(
    /// Range into the arena's method store.
    FnRange => FnId
);
define_range!(
    /// Range into the arena's declaration-list store.
    DeclRange => DeclId
);

#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{ExprId, ExprRange};
    crate::static_assert_size!(ExprId, 4);
    crate::static_assert_size!(ExprRange, 8);
}
