//! Literal text and keyword nodes.

use crate::lexer::Keyword;

/// Literal template text, emitted as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    text: String,
}

impl Text {
    /// Creates a text node.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Appends more text.
    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Returns the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns true if the text is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A SQL keyword, kept with its original spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlToken {
    keyword: Keyword,
    text: String,
}

impl SqlToken {
    /// Creates a keyword node.
    #[must_use]
    pub fn new(keyword: Keyword, text: impl Into<String>) -> Self {
        Self {
            keyword,
            text: text.into(),
        }
    }

    /// Returns the keyword.
    #[must_use]
    pub const fn keyword(&self) -> Keyword {
        self.keyword
    }

    /// Returns the keyword as written.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}
