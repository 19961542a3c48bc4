//! Parameter sources.
//!
//! A parameter source is a read-only view over the values a caller supplies to
//! a template. It is either addressed by name ([`MapParams`]) or by position
//! ([`ArrayParams`]); [`Params::is_indexed`] tells the two apart so the
//! evaluation policy lives in one place.

use std::collections::BTreeMap;

use crate::el::VarScope;
use crate::value::{SqlValue, ToSqlValue};

/// A name-or-index addressable view over caller supplied values.
pub trait Params {
    /// Returns true if values are addressed by position.
    fn is_indexed(&self) -> bool {
        false
    }

    /// Returns true if the name is present, even when its value is NULL.
    fn contains(&self, name: &str) -> bool;

    /// Returns the value of a name, `None` when the name is absent.
    fn get(&self, name: &str) -> Option<SqlValue>;

    /// Returns the value at a zero-based position.
    fn get_at(&self, index: usize) -> Option<SqlValue> {
        let _ = index;
        None
    }

    /// Returns the names of all values, empty for positional sources.
    fn names(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<P: Params + ?Sized> Params for Box<P> {
    fn is_indexed(&self) -> bool {
        (**self).is_indexed()
    }

    fn contains(&self, name: &str) -> bool {
        (**self).contains(name)
    }

    fn get(&self, name: &str) -> Option<SqlValue> {
        (**self).get(name)
    }

    fn get_at(&self, index: usize) -> Option<SqlValue> {
        (**self).get_at(index)
    }

    fn names(&self) -> Vec<String> {
        (**self).names()
    }
}

impl<P: Params + ?Sized> Params for &P {
    fn is_indexed(&self) -> bool {
        (**self).is_indexed()
    }

    fn contains(&self, name: &str) -> bool {
        (**self).contains(name)
    }

    fn get(&self, name: &str) -> Option<SqlValue> {
        (**self).get(name)
    }

    fn get_at(&self, index: usize) -> Option<SqlValue> {
        (**self).get_at(index)
    }

    fn names(&self) -> Vec<String> {
        (**self).names()
    }
}

/// Resolves a named parameter.
///
/// Reads by name when the source contains it, otherwise falls back to the
/// running index for positional sources, otherwise NULL.
#[must_use]
pub fn resolve_named(params: &dyn Params, name: &str, index: usize) -> SqlValue {
    if params.contains(name) {
        return params.get(name).unwrap_or(SqlValue::Null);
    }
    if params.is_indexed() {
        return params.get_at(index).unwrap_or(SqlValue::Null);
    }
    SqlValue::Null
}

/// Named parameters backed by an ordered map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapParams {
    values: BTreeMap<String, SqlValue>,
}

impl MapParams {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, consuming and returning the map.
    #[must_use]
    pub fn with<T: ToSqlValue>(mut self, name: &str, value: T) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a value.
    pub fn set<T: ToSqlValue>(&mut self, name: &str, value: T) {
        self.values
            .insert(String::from(name), value.to_sql_value());
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Params for MapParams {
    fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<SqlValue> {
        self.values.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

impl<K: Into<String>> FromIterator<(K, SqlValue)> for MapParams {
    fn from_iter<I: IntoIterator<Item = (K, SqlValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for MapParams {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter()
            .map(|(k, v)| (k, SqlValue::from(v)))
            .collect()
    }
}

/// Positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayParams {
    values: Vec<SqlValue>,
}

impl ArrayParams {
    /// Creates positional parameters from values.
    #[must_use]
    pub const fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }
}

impl Params for ArrayParams {
    fn is_indexed(&self) -> bool {
        true
    }

    fn contains(&self, _name: &str) -> bool {
        false
    }

    fn get(&self, _name: &str) -> Option<SqlValue> {
        None
    }

    fn get_at(&self, index: usize) -> Option<SqlValue> {
        self.values.get(index).cloned()
    }
}

/// A source with no values at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyParams;

impl Params for EmptyParams {
    fn contains(&self, _name: &str) -> bool {
        false
    }

    fn get(&self, _name: &str) -> Option<SqlValue> {
        None
    }
}

/// Variables seen by expressions: builder variables first, then parameters.
///
/// Parameters are also reachable through a `params.` prefix, so an expression
/// can name a parameter that a variable shadows.
pub struct ParamScope<'a> {
    params: &'a dyn Params,
    vars: Option<&'a BTreeMap<String, SqlValue>>,
}

impl<'a> ParamScope<'a> {
    /// Creates a scope over parameters only.
    #[must_use]
    pub fn new(params: &'a dyn Params) -> Self {
        Self { params, vars: None }
    }

    /// Creates a scope over parameters and builder variables.
    #[must_use]
    pub fn with_vars(params: &'a dyn Params, vars: &'a BTreeMap<String, SqlValue>) -> Self {
        Self {
            params,
            vars: Some(vars),
        }
    }
}

impl VarScope for ParamScope<'_> {
    fn resolve(&self, name: &str) -> Option<SqlValue> {
        if let Some(value) = self.vars.and_then(|vars| vars.get(name)) {
            return Some(value.clone());
        }
        if self.params.contains(name) {
            return self.params.get(name);
        }
        name.strip_prefix("params.")
            .filter(|rest| self.params.contains(rest))
            .and_then(|rest| self.params.get(rest))
    }

    fn has_param(&self, name: &str) -> bool {
        self.params.contains(name)
    }
}

/// Creates a parameter source from a JSON value.
///
/// Objects become named parameters, arrays positional ones (a one element
/// array is unwrapped first), NULL means no parameters and any other scalar is
/// a single positional value.
#[must_use]
pub fn from_json(value: serde_json::Value) -> Box<dyn Params + Send + Sync> {
    use serde_json::Value;
    match value {
        Value::Null => Box::new(EmptyParams),
        Value::Object(map) => Box::new(MapParams::from(map)),
        Value::Array(mut items) if items.len() == 1 => from_json(items.remove(0)),
        Value::Array(items) => Box::new(ArrayParams::new(
            items.into_iter().map(SqlValue::from).collect(),
        )),
        other => Box::new(ArrayParams::new(vec![SqlValue::from(other)])),
    }
}
