//! Entity-mapping metadata consumed by the resolver and the batch builder.
//!
//! The engine only reads mappings: field and column names, nullability and
//! the expressions generating insert, update and default values.

use std::fmt;
use std::sync::Arc;

use crate::el::Expression;
use crate::error::Result;
use crate::params::Params;

/// Computes a table name at build time (sharding, multi-tenancy).
pub trait DynamicTableName: Send + Sync {
    /// Returns the physical table name for this build.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be derived from the parameters.
    fn table_name(&self, entity: &EntityMapping, params: &dyn Params) -> Result<String>;
}

impl<F> DynamicTableName for F
where
    F: Fn(&EntityMapping, &dyn Params) -> Result<String> + Send + Sync,
{
    fn table_name(&self, entity: &EntityMapping, params: &dyn Params) -> Result<String> {
        self(entity, params)
    }
}

/// Mapping of one entity field to a column.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    field_name: String,
    column_name: String,
    nullable: bool,
    primary_key: bool,
    insert_value: Option<Arc<dyn Expression>>,
    update_value: Option<Arc<dyn Expression>>,
    default_value: Option<Arc<dyn Expression>>,
}

impl FieldMapping {
    /// Creates a nullable, non-key field mapping.
    #[must_use]
    pub fn new(field_name: impl Into<String>, column_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            column_name: column_name.into(),
            nullable: true,
            primary_key: false,
            insert_value: None,
            update_value: None,
            default_value: None,
        }
    }

    /// Marks the field as part of the primary key (and not nullable).
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Sets nullability.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the expression producing the value on insert.
    #[must_use]
    pub fn with_insert_value(mut self, expr: Arc<dyn Expression>) -> Self {
        self.insert_value = Some(expr);
        self
    }

    /// Sets the expression producing the value on update.
    #[must_use]
    pub fn with_update_value(mut self, expr: Arc<dyn Expression>) -> Self {
        self.update_value = Some(expr);
        self
    }

    /// Sets the expression producing the default value.
    #[must_use]
    pub fn with_default_value(mut self, expr: Arc<dyn Expression>) -> Self {
        self.default_value = Some(expr);
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Returns the column name.
    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// Returns true if the column accepts NULL.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns true if the field is part of the primary key.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Returns the insert value expression.
    #[must_use]
    pub const fn insert_value(&self) -> Option<&Arc<dyn Expression>> {
        self.insert_value.as_ref()
    }

    /// Returns the update value expression.
    #[must_use]
    pub const fn update_value(&self) -> Option<&Arc<dyn Expression>> {
        self.update_value.as_ref()
    }

    /// Returns the default value expression.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Arc<dyn Expression>> {
        self.default_value.as_ref()
    }
}

/// Mapping of an entity to a table.
#[derive(Clone)]
pub struct EntityMapping {
    entity_name: String,
    table_name: String,
    schema: Option<String>,
    fields: Vec<Arc<FieldMapping>>,
    dynamic_table_name: Option<Arc<dyn DynamicTableName>>,
}

impl fmt::Debug for EntityMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMapping")
            .field("entity_name", &self.entity_name)
            .field("table_name", &self.table_name)
            .field("schema", &self.schema)
            .field("fields", &self.fields)
            .field("dynamic_table_name", &self.dynamic_table_name.is_some())
            .finish()
    }
}

impl EntityMapping {
    /// Creates a mapping without fields.
    #[must_use]
    pub fn new(entity_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            table_name: table_name.into(),
            schema: None,
            fields: Vec::new(),
            dynamic_table_name: None,
        }
    }

    /// Sets the schema the table lives in.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, field: FieldMapping) -> Self {
        self.fields.push(Arc::new(field));
        self
    }

    /// Computes the table name on every build instead of using a fixed one.
    #[must_use]
    pub fn with_dynamic_table_name(mut self, resolver: Arc<dyn DynamicTableName>) -> Self {
        self.dynamic_table_name = Some(resolver);
        self
    }

    /// Returns the entity name.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Returns all fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Arc<FieldMapping>] {
        &self.fields
    }

    /// Returns the primary key fields.
    pub fn key_fields(&self) -> impl Iterator<Item = &Arc<FieldMapping>> {
        self.fields.iter().filter(|f| f.is_primary_key())
    }

    /// Returns the dynamic table name resolver, if any.
    #[must_use]
    pub fn dynamic_table_name(&self) -> Option<&Arc<dyn DynamicTableName>> {
        self.dynamic_table_name.as_ref()
    }

    /// Finds a field by field name (case-insensitive).
    #[must_use]
    pub fn try_get_field_mapping(&self, field_name: &str) -> Option<&Arc<FieldMapping>> {
        self.fields
            .iter()
            .find(|f| f.field_name.eq_ignore_ascii_case(field_name))
    }

    /// Finds a field by column name (case-insensitive).
    #[must_use]
    pub fn try_get_field_mapping_by_column(&self, column_name: &str) -> Option<&Arc<FieldMapping>> {
        self.fields
            .iter()
            .find(|f| f.column_name.eq_ignore_ascii_case(column_name))
    }

    /// Resolves a name used in a template to a field.
    ///
    /// Tries the field name, then the column name. `id` resolves to the key
    /// field when the entity has exactly one.
    #[must_use]
    pub fn resolve_field(&self, name: &str) -> Option<&Arc<FieldMapping>> {
        if let Some(field) = self
            .try_get_field_mapping(name)
            .or_else(|| self.try_get_field_mapping_by_column(name))
        {
            return Some(field);
        }
        if name.eq_ignore_ascii_case("id") {
            let mut keys = self.key_fields();
            if let (Some(key), None) = (keys.next(), keys.next()) {
                return Some(key);
            }
        }
        None
    }
}

/// Registry of entity mappings.
#[derive(Debug, Clone, Default)]
pub struct OrmMetadata {
    entities: Vec<Arc<EntityMapping>>,
}

impl OrmMetadata {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity mapping.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityMapping) -> Self {
        self.entities.push(Arc::new(entity));
        self
    }

    /// Returns true if no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Finds an entity by name (case-insensitive).
    #[must_use]
    pub fn try_get_entity_mapping(&self, entity_name: &str) -> Option<&Arc<EntityMapping>> {
        self.entities
            .iter()
            .find(|e| e.entity_name.eq_ignore_ascii_case(entity_name))
    }

    /// Finds an entity by table name (case-insensitive).
    #[must_use]
    pub fn try_get_entity_mapping_by_table_name(
        &self,
        table_name: &str,
    ) -> Option<&Arc<EntityMapping>> {
        self.entities
            .iter()
            .find(|e| e.table_name.eq_ignore_ascii_case(table_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> EntityMapping {
        EntityMapping::new("User", "users")
            .with_field(FieldMapping::new("userId", "user_id").primary_key())
            .with_field(FieldMapping::new("firstName", "first_name").nullable(false))
    }

    #[test]
    fn test_field_lookup() {
        let user = user();
        assert_eq!(
            user.try_get_field_mapping("FIRSTNAME").map(|f| f.column_name()),
            Some("first_name")
        );
        assert_eq!(
            user.try_get_field_mapping_by_column("user_id")
                .map(|f| f.field_name()),
            Some("userId")
        );
        assert!(user.try_get_field_mapping("missing").is_none());
    }

    #[test]
    fn test_id_resolves_to_single_key() {
        let user = user();
        assert_eq!(user.resolve_field("id").map(|f| f.column_name()), Some("user_id"));

        let composite = EntityMapping::new("Pair", "pairs")
            .with_field(FieldMapping::new("a", "a").primary_key())
            .with_field(FieldMapping::new("b", "b").primary_key());
        assert!(composite.resolve_field("id").is_none());
    }

    #[test]
    fn test_metadata_lookup() {
        let metadata = OrmMetadata::new().with_entity(user());
        assert!(metadata.try_get_entity_mapping("user").is_some());
        assert!(metadata.try_get_entity_mapping_by_table_name("USERS").is_some());
        assert!(metadata.try_get_entity_mapping("order").is_none());
    }
}
