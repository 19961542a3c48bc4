//! Tag extension points (`@name{content}`).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builder::SqlStatementBuilder;
use crate::context::SqlContext;
use crate::error::Result;
use crate::params::Params;

/// Generates SQL for a tag.
pub trait TagProcessor: Send + Sync {
    /// Validates a tag once, when its template is prepared.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid for this tag.
    fn prepare_tag(&self, ctx: &SqlContext, name: &str, content: &str) -> Result<()> {
        let _ = (ctx, name, content);
        Ok(())
    }

    /// Emits the tag's SQL into the builder.
    ///
    /// Emitting nothing makes an enclosing tag-only dynamic clause disappear.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL cannot be generated.
    fn process_tag(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
        content: &str,
    ) -> Result<()>;
}

/// Tag processors by name.
#[derive(Clone, Default)]
pub struct TagRegistry {
    processors: HashMap<String, Arc<dyn TagProcessor>>,
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.processors.keys().collect();
        names.sort();
        f.debug_struct("TagRegistry").field("tags", &names).finish()
    }
}

impl TagRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processor, replacing any previous one with that name.
    pub fn register(&mut self, name: impl Into<String>, processor: Arc<dyn TagProcessor>) {
        self.processors.insert(name.into(), processor);
    }

    /// Returns the processor registered under a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn TagProcessor>> {
        self.processors.get(name)
    }
}
