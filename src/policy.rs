use itertools::Itertools as _;

use crate::error::{ErrorCode, ParseError};
use crate::span::Span;

pub mod traits {
    use super::{ErrorEvent, TraceEvent};

    /// Structured sink for parser notifications.
    ///
    /// Called synchronously from the driver; formatting and routing are the
    /// host's concern.
    pub trait ErrorPolicy {
        fn report(&mut self, error: &ErrorEvent);
        fn print(&mut self, event: &TraceEvent);
    }
}

/// An error notification delivered through the policy.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub code: ErrorCode,
    pub span: Option<Span>,
    pub message: String,
}

impl From<&ParseError> for ErrorEvent {
    fn from(error: &ParseError) -> Self {
        Self {
            code: error.code(),
            span: error.span(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "[{}] {} ({})", self.code, self.message, span),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// A debug-trace event emitted by the driver on each shift or reduce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Shift {
        symbol: String,
        lexeme: String,
    },
    Reduce {
        lhs: String,
        /// Symbol and lexeme of each frame in the reduced span.
        rhs: Vec<(String, String)>,
    },
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEvent::Shift { symbol, lexeme } => write!(f, "SHIFT: ({} {})", symbol, lexeme),
            TraceEvent::Reduce { lhs, rhs } => write!(
                f,
                "REDUCE: {} <- {}",
                lhs,
                rhs.iter().map(|(sym, lex)| format!("({} {})", sym, lex)).join(" ")
            ),
        }
    }
}
