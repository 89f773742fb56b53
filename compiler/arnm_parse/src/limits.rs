//! Hard caps on parsed constructs.
//!
//! Exceeding a cap is a diagnostic, never a crash; parsing continues with
//! the overflow dropped.

/// Top-level declarations per compilation unit.
pub const MAX_DECLS: usize = 256;
/// Statements per block.
pub const MAX_STMTS: usize = 256;
/// Arguments per call.
pub const MAX_ARGS: usize = 64;
/// Parameters per function.
pub const MAX_PARAMS: usize = 32;
/// Fields per struct or actor.
pub const MAX_FIELDS: usize = 64;
/// Methods per actor.
pub const MAX_METHODS: usize = 64;
/// Arms per receive block.
pub const MAX_RECEIVE_ARMS: usize = 32;
