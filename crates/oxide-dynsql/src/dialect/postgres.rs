//! PostgreSQL dialect.

use super::Dialect;

/// PostgreSQL identifier rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn is_keyword(&self, word: &str) -> bool {
        // Unquoted identifiers fold to lower case, so mixed case must be quoted too.
        super::RESERVED_WORDS
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(word))
            || word.chars().any(char::is_uppercase)
    }
}
