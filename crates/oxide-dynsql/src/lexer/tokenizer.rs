//! Template tokenizer implementation.

use super::{Keyword, Span, Token, TokenKind};

/// A lexer that tokenizes SQL template text.
///
/// Unlike a plain SQL lexer it keeps whitespace and comments as tokens, so
/// the parser can hand them through as literal text.
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Creates a token with the current span.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    fn error(&self, message: &str) -> Token {
        self.make_token(TokenKind::Error(String::from(message)))
    }

    const fn is_name_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_name_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    /// Scans a parameter name, dots allowed between segments (`a.b`).
    fn scan_param_name(&mut self) -> &'a str {
        let input = self.input;
        let start = self.pos;
        loop {
            match self.peek() {
                Some(c) if Self::is_name_char(c) => {
                    self.advance();
                }
                Some('.') if self.peek_next().is_some_and(Self::is_name_start) => {
                    self.advance();
                }
                _ => break,
            }
        }
        &input[start..self.pos]
    }

    /// Scans up to the closing character of a balanced pair, skipping
    /// string literals. The opening character has been consumed.
    ///
    /// Returns the content between the delimiters.
    fn scan_balanced(&mut self, open: char, close: char) -> Option<&'a str> {
        let input = self.input;
        let content_start = self.pos;
        let mut depth = 0usize;
        loop {
            match self.advance()? {
                c if c == close && depth == 0 => {
                    return Some(&input[content_start..self.pos - close.len_utf8()]);
                }
                c if c == close => depth -= 1,
                c if c == open => depth += 1,
                '\'' => {
                    while self.advance()? != '\'' {}
                }
                _ => {}
            }
        }
    }

    /// Scans until `close`, without nesting.
    fn scan_until(&mut self, close: char) -> Option<&'a str> {
        let input = self.input;
        let content_start = self.pos;
        loop {
            if self.advance()? == close {
                return Some(&input[content_start..self.pos - close.len_utf8()]);
            }
        }
    }

    fn scan_whitespace(&mut self) -> Token {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
        self.make_token(TokenKind::Whitespace)
    }

    fn scan_line_comment(&mut self) -> Token {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
        self.make_token(TokenKind::Comment)
    }

    fn scan_block_comment(&mut self) -> Token {
        self.advance(); // *
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return self.make_token(TokenKind::Comment);
                }
                Some(_) => {}
                None => return self.error("Unterminated block comment"),
            }
        }
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_some_and(Self::is_name_char) {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];

        if let Some(keyword) = Keyword::from_str(text) {
            self.make_token(TokenKind::Keyword(keyword))
        } else {
            self.make_token(TokenKind::Identifier(String::from(text)))
        }
    }

    /// Scans a quoted identifier (e.g., "column name" or `column name`).
    fn scan_quoted_identifier(&mut self, quote: char) -> Token {
        match self.scan_until(quote) {
            Some(content) => self.make_token(TokenKind::QuotedIdentifier(String::from(content))),
            None => self.error("Unterminated quoted identifier"),
        }
    }

    /// Scans a number, integer or decimal.
    fn scan_number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.make_token(TokenKind::Number)
    }

    /// Scans a string literal, `''` is an escaped quote.
    fn scan_string(&mut self) -> Token {
        let content_start = self.pos;
        loop {
            match self.advance() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.advance();
                }
                Some('\'') => {
                    let content = &self.input[content_start..self.pos - 1];
                    return self.make_token(TokenKind::String(String::from(content)));
                }
                Some(_) => {}
                None => return self.error("Unterminated string literal"),
            }
        }
    }

    /// Scans `:name`. The colon has been consumed.
    fn scan_colon(&mut self) -> Token {
        match self.peek() {
            Some(':' | '=') => {
                self.advance();
                self.make_token(TokenKind::Operator)
            }
            Some(c) if Self::is_name_start(c) => {
                let name = self.scan_param_name();
                self.make_token(TokenKind::NamedParam(String::from(name)))
            }
            _ => self.make_token(TokenKind::Operator),
        }
    }

    /// Scans `#name#` or `#{expr}`. The `#` has been consumed.
    fn scan_sharp(&mut self) -> Token {
        if self.peek() == Some('{') {
            self.advance();
            return match self.scan_until('}') {
                Some(expr) if expr.trim().is_empty() => self.error("Empty expression not allowed"),
                Some(expr) => self.make_token(TokenKind::ExprPlaceholder(String::from(expr))),
                None => self.error("Unclosed expression"),
            };
        }
        let name = self.scan_param_name();
        if name.is_empty() {
            return self.error("Empty parameter name not allowed");
        }
        if self.peek() == Some('#') {
            self.advance();
            self.make_token(TokenKind::SharpParam(String::from(name)))
        } else {
            self.error("Unclosed parameter")
        }
    }

    /// Scans `$name$` or `${expr}`. The `$` has been consumed.
    ///
    /// A `$` that starts neither form is plain text.
    fn scan_dollar(&mut self) -> Token {
        if self.peek() == Some('{') {
            self.advance();
            return match self.scan_until('}') {
                Some(expr) if expr.trim().is_empty() => self.error("Empty expression not allowed"),
                Some(expr) => self.make_token(TokenKind::ExprReplacement(String::from(expr))),
                None => self.error("Unclosed expression"),
            };
        }
        let mark = self.pos;
        let name = self.scan_param_name();
        if !name.is_empty() && self.peek() == Some('$') {
            self.advance();
            return self.make_token(TokenKind::Replacement(String::from(name)));
        }
        self.pos = mark;
        self.make_token(TokenKind::Operator)
    }

    /// Scans `@if(..)`, `@elseif(..)`, `@else`, `@endif`, `@include(..)` and
    /// tags. The `@` has been consumed.
    fn scan_at(&mut self) -> Token {
        if self.peek() == Some('@') {
            self.advance();
            return self.make_token(TokenKind::Operator);
        }
        let input = self.input;
        let mark = self.pos;
        while self.peek().is_some_and(Self::is_name_char) {
            self.advance();
        }
        let word = &input[mark..self.pos];
        match word.to_ascii_lowercase().as_str() {
            "" => self.make_token(TokenKind::Operator),
            "if" | "elseif" => {
                let is_if = word.eq_ignore_ascii_case("if");
                match self.scan_parenthesized() {
                    Ok(cond) if is_if => self.make_token(TokenKind::AtIf(cond)),
                    Ok(cond) => self.make_token(TokenKind::AtElseIf(cond)),
                    Err(message) => self.error(message),
                }
            }
            "else" => self.make_token(TokenKind::AtElse),
            "endif" => self.make_token(TokenKind::AtEndIf),
            "include" => match self.scan_parenthesized() {
                Ok(key) => self.make_token(TokenKind::AtInclude(String::from(key.trim()))),
                Err(message) => self.error(message),
            },
            _ => {
                let name = String::from(word);
                let (open, close, braced) = match self.peek() {
                    Some('{') => ('{', '}', true),
                    Some('(') => ('(', ')', false),
                    _ => {
                        // `@name` without content is plain text, e.g. a variable
                        self.pos = mark;
                        return self.make_token(TokenKind::Operator);
                    }
                };
                self.advance();
                match self.scan_balanced(open, close) {
                    Some(content) => self.make_token(TokenKind::Tag {
                        name,
                        content: String::from(content),
                        braced,
                    }),
                    None => self.error("Unclosed tag"),
                }
            }
        }
    }

    /// Scans `( .. )` after an `@` word, whitespace allowed before `(`.
    fn scan_parenthesized(&mut self) -> Result<String, &'static str> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
        if self.peek() != Some('(') {
            return Err("Expected '('");
        }
        self.advance();
        match self.scan_balanced('(', ')') {
            Some(content) if content.trim().is_empty() => Err("Expression can not be empty"),
            Some(content) => Ok(String::from(content)),
            None => Err("Unclosed parenthesis"),
        }
    }

    /// Returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.start = self.pos;

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        if c.is_whitespace() {
            return self.scan_whitespace();
        }
        if Self::is_name_start(c) || (c.is_alphabetic() && !c.is_ascii()) {
            return self.scan_identifier();
        }
        if c.is_ascii_digit() {
            return self.scan_number();
        }

        self.advance();
        match c {
            '\'' => self.scan_string(),
            '"' | '`' => self.scan_quoted_identifier(c),
            '-' if self.peek() == Some('-') => self.scan_line_comment(),
            '/' if self.peek() == Some('/') => self.scan_line_comment(),
            '/' if self.peek() == Some('*') => self.scan_block_comment(),
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            ',' => self.make_token(TokenKind::Comma),
            '.' => self.make_token(TokenKind::Dot),
            ';' => self.make_token(TokenKind::Semicolon),
            '*' => self.make_token(TokenKind::Star),
            '?' => self.make_token(TokenKind::Question),
            '{' if self.peek() == Some('?') => {
                self.advance();
                self.make_token(TokenKind::DynamicStart)
            }
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            '=' => self.make_token(TokenKind::Eq),
            '<' | '>' | '!' => {
                if matches!(self.peek(), Some('=' | '>')) {
                    self.advance();
                }
                self.make_token(TokenKind::Operator)
            }
            '|' | '&' => {
                if self.peek() == Some(c) {
                    self.advance();
                }
                self.make_token(TokenKind::Operator)
            }
            ':' => self.scan_colon(),
            '#' => self.scan_sharp(),
            '$' => self.scan_dollar(),
            '@' => self.scan_at(),
            _ => self.make_token(TokenKind::Operator),
        }
    }

    /// Tokenizes the entire input, the last token is always `Eof`.
    #[must_use]
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::Whitespace))
            .collect()
    }

    #[test]
    fn test_tokens_cover_input() {
        let input = "select a, 'x''y' from t /* c */ where b = :b -- end";
        let tokens = Lexer::new(input).tokenize();
        let joined: String = tokens.iter().map(|t| t.span.slice(input)).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn test_parameters() {
        assert_eq!(
            kinds(":a.b #c# #{d + 1} $e$ ${f} ?"),
            vec![
                TokenKind::NamedParam(String::from("a.b")),
                TokenKind::SharpParam(String::from("c")),
                TokenKind::ExprPlaceholder(String::from("d + 1")),
                TokenKind::Replacement(String::from("e")),
                TokenKind::ExprReplacement(String::from("f")),
                TokenKind::Question,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_colon_operators() {
        assert_eq!(
            kinds("a::int b := 1"),
            vec![
                TokenKind::Identifier(String::from("a")),
                TokenKind::Operator,
                TokenKind::Identifier(String::from("int")),
                TokenKind::Identifier(String::from("b")),
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_at_tokens() {
        assert_eq!(
            kinds("@if(size(a) > (1)) @elseif (b) @else @endif @include(common.cols)"),
            vec![
                TokenKind::AtIf(String::from("size(a) > (1)")),
                TokenKind::AtElseIf(String::from("b")),
                TokenKind::AtElse,
                TokenKind::AtEndIf,
                TokenKind::AtInclude(String::from("common.cols")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tags_and_plain_at() {
        assert_eq!(
            kinds("@where{a = {b}} @@x @var"),
            vec![
                TokenKind::Tag {
                    name: String::from("where"),
                    content: String::from("a = {b}"),
                    braced: true,
                },
                TokenKind::Operator,
                TokenKind::Identifier(String::from("x")),
                TokenKind::Operator,
                TokenKind::Identifier(String::from("var")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dynamic_start() {
        assert_eq!(
            kinds("{? a } {b}"),
            vec![
                TokenKind::DynamicStart,
                TokenKind::Identifier(String::from("a")),
                TokenKind::RightBrace,
                TokenKind::LeftBrace,
                TokenKind::Identifier(String::from("b")),
                TokenKind::RightBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(kinds("'abc")[0], TokenKind::Error(_)));
        assert!(matches!(kinds("#abc")[0], TokenKind::Error(_)));
        assert!(matches!(kinds("#{}")[0], TokenKind::Error(_)));
        assert!(matches!(kinds("@if()")[0], TokenKind::Error(_)));
    }
}
