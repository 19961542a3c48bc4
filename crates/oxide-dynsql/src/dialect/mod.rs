//! SQL Dialect support.
//!
//! The template engine only needs a dialect for identifier quoting: mapped
//! column and table names, and names written quoted in a template, are
//! emitted through [`Dialect::quote_identifier`].

mod generic;
mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

use std::sync::Arc;

pub use generic::GenericDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

/// Words quoted by every dialect when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "CONSTRAINT",
    "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END",
    "EXISTS", "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTO",
    "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR",
    "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN",
    "TO", "UNION", "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the opening identifier quote (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the closing identifier quote.
    fn identifier_close_quote(&self) -> char {
        self.identifier_quote()
    }

    /// Returns true if the word is reserved and must be quoted as an identifier.
    fn is_keyword(&self, word: &str) -> bool {
        RESERVED_WORDS
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(word))
    }

    /// Quotes an identifier unconditionally.
    fn quote_identifier_always(&self, name: &str) -> String {
        let open = self.identifier_quote();
        let close = self.identifier_close_quote();
        format!("{open}{name}{close}")
    }

    /// Quotes an identifier if necessary (reserved words only).
    fn quote_identifier(&self, name: &str) -> String {
        if self.is_keyword(name) {
            self.quote_identifier_always(name)
        } else {
            String::from(name)
        }
    }
}

/// Looks up a dialect by name (case-insensitive).
#[must_use]
pub fn by_name(name: &str) -> Option<Arc<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "generic" | "ansi" => Some(Arc::new(GenericDialect::new())),
        "postgres" | "postgresql" => Some(Arc::new(PostgresDialect::new())),
        "mysql" | "mariadb" => Some(Arc::new(MySqlDialect::new())),
        "sqlite" => Some(Arc::new(SqliteDialect::new())),
        "sqlserver" | "mssql" => Some(Arc::new(SqlServerDialect::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("PostgreSQL").map(|d| d.name()), Some("postgres"));
        assert_eq!(by_name("mssql").map(|d| d.name()), Some("sqlserver"));
        assert!(by_name("oracle").is_none());
    }

    #[test]
    fn test_quote_keyword_only() {
        let dialect = GenericDialect::new();
        assert_eq!(dialect.quote_identifier("name"), "name");
        assert_eq!(dialect.quote_identifier("order"), "\"order\"");
        assert_eq!(dialect.quote_identifier_always("name"), "\"name\"");
    }
}
