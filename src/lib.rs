pub mod error;
pub mod lexer;
pub mod lr;
pub mod policy;
pub mod prelude;
pub mod span;
pub mod symbol;
pub mod token;

pub use error::{ErrorCode, ErrorKind, ParseError};
pub use span::Span;
pub use token::Token;

pub type LalrtResult<T> = Result<T, ParseError>;
