//! Template parser.
//!
//! Templates are tokenized by the lossless [`Lexer`](crate::lexer::Lexer),
//! then parsed into [`Sql`](crate::Sql) nodes by a hand-written recursive
//! descent parser. Joining the parsed nodes' template text gives back the
//! input unchanged.

mod error;
mod parser;

pub use error::ParseError;
pub use parser::{ParseLevel, Parser};
