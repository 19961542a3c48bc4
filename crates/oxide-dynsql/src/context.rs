//! Ambient configuration shared by every template of an application.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dialect::{Dialect, GenericDialect};
use crate::el::{DefaultExpressionLanguage, ExpressionLanguage};
use crate::error::Result;
use crate::fragment::{FragmentRegistry, SqlFragment};
use crate::mapping::OrmMetadata;
use crate::parser::{ParseLevel, Parser};
use crate::tag::{TagProcessor, TagRegistry};

/// Dialect, metadata, tags, fragments and expression language used to parse,
/// prepare and build templates.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use oxide_dynsql::dialect::MySqlDialect;
/// use oxide_dynsql::{OrmMetadata, SqlContext};
///
/// let ctx = SqlContext::new(Arc::new(MySqlDialect::new()))
///     .with_metadata(Arc::new(OrmMetadata::new()));
/// assert_eq!(ctx.dialect().name(), "mysql");
/// ```
pub struct SqlContext {
    dialect: Arc<dyn Dialect>,
    metadata: Arc<OrmMetadata>,
    tags: TagRegistry,
    fragments: FragmentRegistry,
    el: Arc<dyn ExpressionLanguage>,
    parse_level: ParseLevel,
}

impl fmt::Debug for SqlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlContext")
            .field("dialect", &self.dialect.name())
            .field("metadata", &self.metadata)
            .field("tags", &self.tags)
            .field("parse_level", &self.parse_level)
            .finish_non_exhaustive()
    }
}

impl Default for SqlContext {
    fn default() -> Self {
        Self::new(Arc::new(GenericDialect::new()))
    }
}

impl SqlContext {
    /// Creates a context with empty metadata and the default expression
    /// language.
    #[must_use]
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            metadata: Arc::new(OrmMetadata::new()),
            tags: TagRegistry::new(),
            fragments: FragmentRegistry::new(),
            el: Arc::new(DefaultExpressionLanguage::new()),
            parse_level: ParseLevel::More,
        }
    }

    /// Sets the entity metadata used to resolve names.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Arc<OrmMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Registers a tag processor.
    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>, processor: Arc<dyn TagProcessor>) -> Self {
        self.tags.register(name, processor);
        self
    }

    /// Replaces the expression language.
    #[must_use]
    pub fn with_expression_language(mut self, el: Arc<dyn ExpressionLanguage>) -> Self {
        self.el = el;
        self
    }

    /// Sets the level templates are parsed at.
    #[must_use]
    pub const fn with_parse_level(mut self, level: ParseLevel) -> Self {
        self.parse_level = level;
        self
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the entity metadata.
    #[must_use]
    pub fn metadata(&self) -> &OrmMetadata {
        &self.metadata
    }

    /// Returns the tag registry.
    #[must_use]
    pub const fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Returns the fragment registry.
    #[must_use]
    pub const fn fragments(&self) -> &FragmentRegistry {
        &self.fragments
    }

    /// Returns the expression language.
    #[must_use]
    pub fn expression_language(&self) -> &dyn ExpressionLanguage {
        self.el.as_ref()
    }

    /// Returns the parse level.
    #[must_use]
    pub const fn parse_level(&self) -> ParseLevel {
        self.parse_level
    }

    /// Parses, prepares and registers a fragment for `@include(key)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or a tag is unknown.
    pub fn register_fragment(&self, key: &str, text: &str) -> Result<()> {
        let sql = Parser::new(self).parse(text)?;
        sql.prepare(self)?;
        if self.fragments.register(SqlFragment::new(key, sql)).is_some() {
            debug!(key = %key, "Replaced sql fragment");
        } else {
            debug!(key = %key, "Registered sql fragment");
        }
        Ok(())
    }
}
