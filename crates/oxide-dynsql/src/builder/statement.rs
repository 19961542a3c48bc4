//! Single statement builder.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::ast::Scope;
use crate::context::SqlContext;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::mapping::EntityMapping;
use crate::params::Params;
use crate::sql::Sql;
use crate::value::SqlValue;

/// A built statement: SQL text with `?` placeholders and the bound values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    sql: String,
    args: Vec<SqlValue>,
}

impl SqlStatement {
    /// Creates a statement.
    #[must_use]
    pub const fn new(sql: String, args: Vec<SqlValue>) -> Self {
        Self { sql, args }
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the bound values, in placeholder order.
    #[must_use]
    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }

    /// Splits the statement into SQL and values.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.args)
    }
}

/// A snapshot of a builder's buffer, values and parameter index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePoint {
    buf_len: usize,
    args_len: usize,
    parameter_index: usize,
}

impl SavePoint {
    /// Discards everything appended since the snapshot.
    pub fn restore(self, builder: &mut SqlStatementBuilder<'_>) {
        builder.buf.truncate(self.buf_len);
        builder.args.truncate(self.args_len);
        builder.parameter_index = self.parameter_index;
    }

    /// Returns true if text or values were appended since the snapshot.
    #[must_use]
    pub fn has_changes(&self, builder: &SqlStatementBuilder<'_>) -> bool {
        builder.buf.len() != self.buf_len || builder.args.len() != self.args_len
    }
}

/// Builds one statement from a template and a parameter source.
pub struct SqlStatementBuilder<'a> {
    ctx: &'a SqlContext,
    sql: &'a Sql,
    query: bool,
    buf: String,
    args: Vec<SqlValue>,
    parameter_index: usize,
    vars: BTreeMap<String, SqlValue>,
    table_names: HashMap<String, String>,
    include_depth: usize,
}

impl<'a> SqlStatementBuilder<'a> {
    /// Creates a builder. `query` is true for statements that read rows,
    /// which enables the `= NULL` to `is null` rewrite.
    #[must_use]
    pub fn new(ctx: &'a SqlContext, sql: &'a Sql, query: bool) -> Self {
        Self {
            ctx,
            sql,
            query,
            buf: String::new(),
            args: Vec::new(),
            parameter_index: 0,
            vars: BTreeMap::new(),
            table_names: HashMap::new(),
            include_depth: 0,
        }
    }

    /// Appends text.
    pub fn append(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Appends a character.
    pub fn append_char(&mut self, c: char) {
        self.buf.push(c);
    }

    /// Returns the running parameter index and advances it.
    pub fn next_parameter_index(&mut self) -> usize {
        let index = self.parameter_index;
        self.parameter_index += 1;
        index
    }

    /// Returns the running parameter index without advancing it.
    #[must_use]
    pub const fn parameter_index(&self) -> usize {
        self.parameter_index
    }

    /// Advances the running parameter index past slots that were not built.
    pub fn skip_parameters(&mut self, count: usize) {
        self.parameter_index += count;
    }

    /// Binds a value without emitting text.
    pub fn add_parameter(&mut self, value: SqlValue) {
        self.args.push(value);
    }

    /// Emits the placeholder for a value and binds it.
    ///
    /// After `in` or `in (`, arrays expand to one `?` per item that is
    /// neither NULL nor an empty string, and a NULL or empty array binds a
    /// single NULL. A NULL compared with `=` in a query becomes `is null`,
    /// except inside `SET`.
    pub fn append_placeholder(&mut self, value: SqlValue, scope: Scope) {
        if self.is_last_in_operator() {
            self.append_in_list(value);
            return;
        }
        if value.is_null()
            && self.query
            && scope != Scope::Set
            && self.remove_last_equals_operator()
        {
            self.buf.push_str(" is null");
            return;
        }
        self.buf.push('?');
        self.args.push(value);
    }

    fn append_in_list(&mut self, value: SqlValue) {
        let open = !self.buf.trim_end().ends_with('(');
        if open {
            self.buf.push('(');
        }
        let items: Vec<SqlValue> = match value {
            SqlValue::Array(items) => items
                .into_iter()
                .filter(|item| !item.is_null() && !item.is_empty_text())
                .collect(),
            SqlValue::Null => Vec::new(),
            other => vec![other],
        };
        if items.is_empty() {
            self.buf.push('?');
            self.args.push(SqlValue::Null);
        }
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.buf.push('?');
            self.args.push(item);
        }
        if open {
            self.buf.push(')');
        }
    }

    /// Snapshots the buffer and bound values.
    #[must_use]
    pub fn create_save_point(&self) -> SavePoint {
        SavePoint {
            buf_len: self.buf.len(),
            args_len: self.args.len(),
            parameter_index: self.parameter_index,
        }
    }

    /// Returns true if the text emitted so far ends with an `in` operator,
    /// optionally followed by `(`.
    #[must_use]
    pub fn is_last_in_operator(&self) -> bool {
        let text = self.buf.trim_end();
        let text = text.strip_suffix('(').unwrap_or(text).trim_end();
        let bytes = text.as_bytes();
        let Some(start) = bytes.len().checked_sub(2) else {
            return false;
        };
        if !bytes[start..].eq_ignore_ascii_case(b"in") {
            return false;
        }
        start == 0 || !is_word_byte(bytes[start - 1])
    }

    /// Removes a trailing `=` and the whitespace before it.
    ///
    /// Returns false, leaving the buffer untouched, when the text does not
    /// end with a plain `=` (`!=`, `<=`, `>=` and `:=` are left alone).
    pub fn remove_last_equals_operator(&mut self) -> bool {
        let text = self.buf.trim_end();
        let Some(before) = text.strip_suffix('=') else {
            return false;
        };
        if before.ends_with(['!', '<', '>', ':']) {
            return false;
        }
        let len = before.trim_end().len();
        self.buf.truncate(len);
        true
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &'a dyn Dialect {
        self.ctx.dialect()
    }

    /// Returns the context.
    #[must_use]
    pub const fn context(&self) -> &'a SqlContext {
        self.ctx
    }

    /// Returns the template being built.
    #[must_use]
    pub const fn sql(&self) -> &'a Sql {
        self.sql
    }

    /// Returns true if the statement reads rows.
    #[must_use]
    pub const fn is_query(&self) -> bool {
        self.query
    }

    /// Returns the builder variables, visible to expressions.
    #[must_use]
    pub const fn vars(&self) -> &BTreeMap<String, SqlValue> {
        &self.vars
    }

    /// Sets a builder variable.
    pub fn set_var(&mut self, name: impl Into<String>, value: SqlValue) {
        self.vars.insert(name.into(), value);
    }

    /// Returns the SQL emitted so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.buf
    }

    /// Returns the values bound so far.
    #[must_use]
    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }

    /// Returns the dynamic table name of an entity, computed once per build.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error.
    pub fn dynamic_table_name(
        &mut self,
        entity: &Arc<EntityMapping>,
        params: &dyn Params,
    ) -> Result<String> {
        if let Some(name) = self.table_names.get(entity.entity_name()) {
            return Ok(name.clone());
        }
        let name = match entity.dynamic_table_name() {
            Some(resolver) => resolver.table_name(entity, params)?,
            None => entity.table_name().to_string(),
        };
        self.table_names
            .insert(entity.entity_name().to_string(), name.clone());
        Ok(name)
    }

    pub(crate) fn enter_include(&mut self, key: &str) -> Result<()> {
        super::enter_include(&mut self.include_depth, key)
    }

    pub(crate) fn leave_include(&mut self) {
        self.include_depth = self.include_depth.saturating_sub(1);
    }

    /// Finishes the statement.
    #[must_use]
    pub fn build(self) -> SqlStatement {
        SqlStatement::new(self.buf, self.args)
    }
}

impl fmt::Write for SqlStatementBuilder<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_builder(query: bool, f: impl FnOnce(&mut SqlStatementBuilder<'_>)) {
        let ctx = SqlContext::default();
        let sql = Sql::empty();
        let mut builder = SqlStatementBuilder::new(&ctx, &sql, query);
        f(&mut builder);
    }

    #[test]
    fn test_parameter_index_advances() {
        with_builder(true, |b| {
            assert_eq!(b.next_parameter_index(), 0);
            assert_eq!(b.next_parameter_index(), 1);
            assert_eq!(b.parameter_index(), 2);
            b.skip_parameters(3);
            assert_eq!(b.next_parameter_index(), 5);
        });
    }

    #[test]
    fn test_is_last_in_operator() {
        for (text, expected) in [
            ("x in ", true),
            ("x IN (", true),
            ("x in(", true),
            ("x in  (  ", true),
            ("x = ", false),
            ("join ", false),
            ("min(", false),
            ("in", true),
        ] {
            with_builder(true, |b| {
                b.append(text);
                assert_eq!(b.is_last_in_operator(), expected, "{text:?}");
            });
        }
    }

    #[test]
    fn test_in_expansion() {
        with_builder(true, |b| {
            b.append("x in ");
            b.append_placeholder(SqlValue::array(vec![1_i64, 2, 3]), Scope::Where);
            assert_eq!(b.text(), "x in (?,?,?)");
            assert_eq!(b.args().len(), 3);
        });
        with_builder(true, |b| {
            b.append("x in (");
            b.append_placeholder(SqlValue::Array(vec![]), Scope::Where);
            b.append(")");
            assert_eq!(b.text(), "x in (?)");
            assert_eq!(b.args(), &[SqlValue::Null]);
        });
        with_builder(true, |b| {
            b.append("x in (");
            b.append_placeholder(
                SqlValue::Array(vec![
                    SqlValue::Null,
                    SqlValue::Text(String::new()),
                    SqlValue::Text(String::from("a")),
                ]),
                Scope::Where,
            );
            b.append(")");
            assert_eq!(b.text(), "x in (?)");
            assert_eq!(b.args(), &[SqlValue::Text(String::from("a"))]);
        });
    }

    #[test]
    fn test_null_equals_rewrite() {
        with_builder(true, |b| {
            b.append("where a = ");
            b.append_placeholder(SqlValue::Null, Scope::Where);
            assert_eq!(b.text(), "where a is null");
            assert!(b.args().is_empty());
        });
        with_builder(true, |b| {
            b.append("where a <= ");
            b.append_placeholder(SqlValue::Null, Scope::Where);
            assert_eq!(b.text(), "where a <= ?");
        });
        with_builder(true, |b| {
            b.append("set a = ");
            b.append_placeholder(SqlValue::Null, Scope::Set);
            assert_eq!(b.text(), "set a = ?");
        });
        with_builder(false, |b| {
            b.append("where a = ");
            b.append_placeholder(SqlValue::Null, Scope::Where);
            assert_eq!(b.text(), "where a = ?");
            assert_eq!(b.args(), &[SqlValue::Null]);
        });
    }

    #[test]
    fn test_save_point_restore() {
        with_builder(true, |b| {
            b.append("a");
            let sp = b.create_save_point();
            assert!(!sp.has_changes(b));
            b.append(" and b = ?");
            b.add_parameter(SqlValue::Int(1));
            b.next_parameter_index();
            assert!(sp.has_changes(b));
            sp.restore(b);
            assert_eq!(b.text(), "a");
            assert_eq!(b.parameter_index(), 0);
            assert!(b.args().is_empty());
        });
    }
}
