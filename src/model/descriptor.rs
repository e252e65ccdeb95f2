//! Normalized, immutable schema of a record type.

use std::collections::HashSet;

use serde::Serialize;

use crate::id::{IdGenerator, IdGenerators, IdStrategy};
use crate::model::naming::camel_to_snake;
use crate::model::schema::{FieldSchema, FieldType, TypeSchema};
use crate::model::{FieldAccess, Record, Value};
use crate::error::{Result, TesseraError};

/// Property name that doubles as the key when no field carries a key marker.
pub const DEFAULT_ID_PROPERTY: &str = "id";

/// One persistent field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Logical property name.
    pub property: String,
    /// Storage column name.
    pub column: String,
    /// Declared type.
    #[serde(skip)]
    pub field_type: FieldType,
    /// Whether inserts write this column.
    pub insertable: bool,
    /// Whether updates write this column.
    pub updatable: bool,
}

impl FieldDescriptor {
    fn from_schema(field: &FieldSchema) -> Self {
        let column_override = field.column.clone().unwrap_or_default();
        let column = column_override
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| camel_to_snake(&field.name));
        Self {
            property: field.name.clone(),
            column,
            field_type: field.field_type,
            insertable: column_override.insertable,
            updatable: column_override.updatable,
        }
    }

    /// True when sparse statements must include the field unconditionally.
    pub fn is_primitive(&self) -> bool {
        self.field_type.primitive
    }
}

/// Schema description of a record type.
///
/// Built once per type by the registry and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    type_name: String,
    model_name: String,
    fields: Vec<FieldDescriptor>,
    id_index: Option<usize>,
    id_strategy: IdStrategy,
    id_generator: Option<IdGenerator>,
}

impl ModelDescriptor {
    /// Extracts a descriptor, naming it after the schema's simple type name.
    pub fn build(schema: &TypeSchema, generators: &IdGenerators) -> Self {
        Self::build_named(schema.name.clone(), schema, generators)
    }

    /// Extracts a descriptor under an explicit type name.
    ///
    /// The type name only namespaces statement ids; the table name is still
    /// derived from the schema.
    pub fn build_named(
        type_name: impl Into<String>,
        schema: &TypeSchema,
        generators: &IdGenerators,
    ) -> Self {
        let declared = collect_fields(schema);
        let mut fields: Vec<FieldDescriptor> = declared
            .iter()
            .map(|field| FieldDescriptor::from_schema(field))
            .collect();

        let id_index = declared
            .iter()
            .position(|field| field.primary_key)
            .or_else(|| {
                declared
                    .iter()
                    .position(|field| field.name == DEFAULT_ID_PROPERTY)
            });
        let decl = id_index.and_then(|idx| declared[idx].id_strategy.as_ref());
        let id_strategy = generators.resolve(decl);
        let id_generator = generators.generator(id_strategy);

        if let Some(idx) = id_index {
            let field = &mut fields[idx];
            field.updatable = false;
            if id_generator.is_none() {
                field.insertable = false;
            }
        }

        Self {
            type_name: type_name.into(),
            model_name: model_name(schema),
            fields,
            id_index,
            id_strategy,
            id_generator,
        }
    }

    /// Type name used to namespace statement ids.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Storage table name, optionally schema-qualified.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Persistent fields; subtype fields first, then inherited ones.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Primary-key field, if one was resolved.
    pub fn id_field(&self) -> Option<&FieldDescriptor> {
        self.id_index.map(|idx| &self.fields[idx])
    }

    /// Primary-key field or a [`TesseraError::MissingPrimaryKey`] error.
    pub fn require_id_field(&self) -> Result<&FieldDescriptor> {
        self.id_field()
            .ok_or_else(|| TesseraError::MissingPrimaryKey {
                model: self.type_name.clone(),
            })
    }

    /// Resolved key strategy.
    pub fn id_strategy(&self) -> IdStrategy {
        self.id_strategy
    }

    /// Key generator; `None` when storage assigns keys.
    pub fn id_generator(&self) -> Option<&IdGenerator> {
        self.id_generator.as_ref()
    }

    /// True when storage assigns keys on insert.
    pub fn auto_id(&self) -> bool {
        self.id_generator.is_none()
    }

    /// Fields written by inserts.
    pub fn insert_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.insertable)
    }

    /// Fields written by updates.
    pub fn update_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.updatable)
    }

    /// Looks a field up by property name.
    pub fn field(&self, property: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.property == property)
    }

    /// Current key value of `record`.
    pub fn id_value(&self, record: &dyn FieldAccess) -> Result<Value> {
        let field = self.require_id_field()?;
        Ok(record.field_value(&field.property))
    }

    /// Generates and assigns a key when `record` has none.
    ///
    /// Returns `true` if a key was written.
    pub fn fill_id_if_absent<R: Record>(&self, record: &mut R) -> Result<bool> {
        let (Some(field), Some(generator)) = (self.id_field(), self.id_generator.as_ref()) else {
            return Ok(false);
        };
        if !record.field_value(&field.property).is_absent_key() {
            return Ok(false);
        }
        let id = generator.generate(self)?;
        record.set_field_value(&field.property, id)?;
        Ok(true)
    }
}

fn collect_fields(schema: &TypeSchema) -> Vec<&FieldSchema> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for level in schema.lineage() {
        for field in &level.fields {
            if seen.insert(field.name.as_str()) {
                merged.push(field);
            }
        }
    }
    merged.retain(|field| field.is_persistent());
    merged
}

fn model_name(schema: &TypeSchema) -> String {
    let mut name = camel_to_snake(&schema.name);
    if let Some(table) = &schema.table {
        if let Some(explicit) = table.name.as_deref().filter(|n| !n.trim().is_empty()) {
            name = explicit.to_string();
        }
        if let Some(prefix) = table.schema.as_deref().filter(|s| !s.trim().is_empty()) {
            name = format!("{prefix}.{name}");
        }
    }
    name
}
