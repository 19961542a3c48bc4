//! Template lexer.
//!
//! A hand-written lexer that turns SQL template text into a lossless stream
//! of tokens: SQL text, template parameters and control directives.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
