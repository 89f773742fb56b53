//! Diagnostics for the ARNm compiler.
//!
//! Every stage reports failures as [`Diagnostic`] values collected in a
//! bounded [`DiagnosticQueue`]; nothing user-facing panics. The driver
//! prints the queue to stderr as `line:col: message` and exits non-zero.

mod error_code;
mod queue;

pub use error_code::ErrorCode;
pub use queue::{DiagnosticQueue, MAX_DIAGNOSTICS};

use arnm_ir::Span;
use std::fmt;

/// A single reported problem with its source location.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: error[{}]: {}",
            self.span.line, self.span.column, self.code, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let diag = Diagnostic::new(
            ErrorCode::UndefinedIdent,
            "undefined identifier",
            Span::new(4, 5, 3, 7),
        );
        assert_eq!(
            diag.to_string(),
            "3:7: error[E2001]: undefined identifier"
        );
    }
}
