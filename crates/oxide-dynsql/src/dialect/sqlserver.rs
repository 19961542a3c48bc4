//! SQL Server dialect.

use super::Dialect;

/// SQL Server quotes identifiers with square brackets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn identifier_quote(&self) -> char {
        '['
    }

    fn identifier_close_quote(&self) -> char {
        ']'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlserver_brackets() {
        let dialect = SqlServerDialect::new();
        assert_eq!(dialect.quote_identifier_always("name"), "[name]");
    }
}
