//! Reusable SQL fragments spliced in with `@include(key)`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::sql::Sql;

/// A named, parsed template fragment.
#[derive(Debug)]
pub struct SqlFragment {
    key: String,
    sql: Sql,
}

impl SqlFragment {
    /// Creates a fragment from parsed nodes.
    #[must_use]
    pub fn new(key: impl Into<String>, sql: Sql) -> Self {
        Self {
            key: key.into(),
            sql,
        }
    }

    /// Returns the key the fragment is registered under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the parsed fragment.
    #[must_use]
    pub const fn sql(&self) -> &Sql {
        &self.sql
    }
}

/// Fragments by key.
///
/// Includes look fragments up on every build, so a fragment registered again
/// is picked up by templates parsed before the update.
#[derive(Debug, Default)]
pub struct FragmentRegistry {
    fragments: RwLock<HashMap<String, Arc<SqlFragment>>>,
}

impl FragmentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fragment, returning the one it replaced.
    pub fn register(&self, fragment: SqlFragment) -> Option<Arc<SqlFragment>> {
        let mut fragments = self
            .fragments
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        fragments.insert(fragment.key.clone(), Arc::new(fragment))
    }

    /// Returns the fragment registered under a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<SqlFragment>> {
        self.fragments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns true if a fragment is registered under the key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fragments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}
