use itertools::Itertools as _;
use thiserror::Error;

use crate::span::Span;

#[derive(Debug, Clone)]
pub struct ExpectedSymbols(Vec<String>);

impl std::fmt::Display for ExpectedSymbols {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.iter().join(", ").fmt(f)
    }
}

/// Code delivered to the error policy alongside each notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No transition matched the lookahead.
    Syntax,
    /// Table corruption or internal bug.
    Unexpected,
    /// Forwarded from the lexer.
    Lexical,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Syntax => write!(f, "syntax"),
            ErrorCode::Unexpected => write!(f, "unexpected"),
            ErrorCode::Lexical => write!(f, "lexical"),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ErrorKind {
    #[error("unexpected symbol {got}, expecting {expecting}")]
    UnexpectedSymbol {
        expecting: ExpectedSymbols,
        got: String,
    },

    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("no goto transition for {0} after reduction")]
    MissingGoto(String),

    #[error("reduction of {len} frames with only {depth} on the stack")]
    BadReduction { len: usize, depth: usize },

    #[error("accepted with {0} frames on the stack")]
    MalformedAccept(usize),

    #[error("shift on the end-of-input marker")]
    ShiftOnEos,

    #[error("unexpected char '{0}'")]
    UnexpectedChar(char),

    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,
}

impl ErrorKind {
    pub fn unexpected_symbol<I, S>(got: &str, expecting: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::UnexpectedSymbol {
            expecting: ExpectedSymbols(expecting.into_iter().map(|s| s.to_string()).collect()),
            got: got.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ErrorKind::UnexpectedSymbol { .. } | ErrorKind::UnknownSymbol(_) => ErrorCode::Syntax,
            ErrorKind::MissingGoto(_)
            | ErrorKind::BadReduction { .. }
            | ErrorKind::MalformedAccept(_)
            | ErrorKind::ShiftOnEos => ErrorCode::Unexpected,
            ErrorKind::UnexpectedChar(_) | ErrorKind::UnexpectedEndOfStream => ErrorCode::Lexical,
        }
    }
}

#[derive(Error, Debug, Clone)]
#[error("{kind}")]
pub struct ParseError {
    /// Kind of error
    kind: ErrorKind,
    /// Location of the error in the stream.
    span: Option<Span>,
}

impl ParseError {
    pub fn new(kind: impl Into<ErrorKind>, span: Option<Span>) -> Self {
        Self {
            kind: kind.into(),
            span,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

impl From<ErrorKind> for ParseError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }
}
