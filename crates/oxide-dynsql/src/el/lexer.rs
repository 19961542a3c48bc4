//! Tokenizer for expression text.

use super::ExpressionError;

/// Expression tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprToken {
    Integer(i64),
    Float(f64),
    String(String),
    /// A possibly dotted name (`a`, `params.name`).
    Identifier(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LeftParen,
    RightParen,
    Comma,
    Eof,
}

/// A token with its byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: ExprToken,
    pub offset: usize,
}

pub struct ExprLexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ExprLexer<'a> {
    pub const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>, position: usize) -> ExpressionError {
        ExpressionError::Syntax {
            message: message.into(),
            position,
            text: String::from(self.input),
        }
    }

    /// Tokenizes the whole input, ending with [`ExprToken::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, ExpressionError> {
        let mut tokens = Vec::new();
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            let offset = self.pos;
            let Some(c) = self.advance() else {
                tokens.push(Spanned {
                    token: ExprToken::Eof,
                    offset,
                });
                return Ok(tokens);
            };
            let token = match c {
                '(' => ExprToken::LeftParen,
                ')' => ExprToken::RightParen,
                ',' => ExprToken::Comma,
                '+' => ExprToken::Plus,
                '-' => ExprToken::Minus,
                '*' => ExprToken::Star,
                '/' => ExprToken::Slash,
                '%' => ExprToken::Percent,
                '=' if self.peek() == Some('=') => {
                    self.advance();
                    ExprToken::EqEq
                }
                '!' if self.peek() == Some('=') => {
                    self.advance();
                    ExprToken::NotEq
                }
                '!' => ExprToken::Not,
                '<' if self.peek() == Some('=') => {
                    self.advance();
                    ExprToken::LtEq
                }
                '<' if self.peek() == Some('>') => {
                    self.advance();
                    ExprToken::NotEq
                }
                '<' => ExprToken::Lt,
                '>' if self.peek() == Some('=') => {
                    self.advance();
                    ExprToken::GtEq
                }
                '>' => ExprToken::Gt,
                '&' if self.peek() == Some('&') => {
                    self.advance();
                    ExprToken::And
                }
                '|' if self.peek() == Some('|') => {
                    self.advance();
                    ExprToken::Or
                }
                '\'' | '"' => self.scan_string(c, offset)?,
                c if c.is_ascii_digit() => self.scan_number(offset)?,
                c if c.is_alphabetic() || c == '_' => self.scan_identifier(offset),
                other => return Err(self.error(format!("Unexpected character '{other}'"), offset)),
            };
            tokens.push(Spanned { token, offset });
        }
    }

    fn scan_string(&mut self, quote: char, start: usize) -> Result<ExprToken, ExpressionError> {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => {
                    // doubled quote is an escaped quote
                    if self.peek() == Some(quote) {
                        self.advance();
                        value.push(quote);
                    } else {
                        return Ok(ExprToken::String(value));
                    }
                }
                Some('\\') => match self.advance() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(self.error("Unterminated string literal", start)),
                },
                Some(c) => value.push(c),
                None => return Err(self.error("Unterminated string literal", start)),
            }
        }
    }

    fn scan_number(&mut self, start: usize) -> Result<ExprToken, ExpressionError> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.input[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(ExprToken::Float)
                .map_err(|e| self.error(format!("Invalid number: {e}"), start))
        } else {
            text.parse::<i64>()
                .map(ExprToken::Integer)
                .map_err(|e| self.error(format!("Invalid number: {e}"), start))
        }
    }

    fn scan_identifier(&mut self, start: usize) -> ExprToken {
        loop {
            match self.peek() {
                Some(c) if c.is_alphanumeric() || c == '_' => {
                    self.advance();
                }
                Some('.') if self.peek_next().is_some_and(|c| c.is_alphabetic() || c == '_') => {
                    self.advance();
                }
                _ => break,
            }
        }
        let text = &self.input[start..self.pos];
        match text.to_ascii_lowercase().as_str() {
            "true" => ExprToken::True,
            "false" => ExprToken::False,
            "null" => ExprToken::Null,
            "and" => ExprToken::And,
            "or" => ExprToken::Or,
            "not" => ExprToken::Not,
            _ => ExprToken::Identifier(String::from(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<ExprToken> {
        ExprLexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a != null && b.c >= 2"),
            vec![
                ExprToken::Identifier(String::from("a")),
                ExprToken::NotEq,
                ExprToken::Null,
                ExprToken::And,
                ExprToken::Identifier(String::from("b.c")),
                ExprToken::GtEq,
                ExprToken::Integer(2),
                ExprToken::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds("'it''s'"),
            vec![ExprToken::String(String::from("it's")), ExprToken::Eof]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(ExprLexer::new("'abc").tokenize().is_err());
    }
}
