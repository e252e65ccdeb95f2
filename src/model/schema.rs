//! Declarative description of a record type.
//!
//! A [`TypeSchema`] is what a record type says about itself: its simple name,
//! declared fields, optional parent type and override annotations. It is the
//! raw input of descriptor extraction and can be written by hand, produced by
//! a record's [`Record::schema`](crate::model::Record::schema) implementation,
//! or deserialized from TOML.

use serde::{Deserialize, Serialize};

/// Semantic scalar kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    /// Boolean flag.
    Bool,
    /// Integer of any width.
    Int,
    /// Floating point number.
    Float,
    /// Text.
    Text,
    /// Binary payload.
    Bytes,
    /// Timestamp stored by the engine's native representation.
    Timestamp,
}

/// Field type: a scalar kind plus whether the field can be absent.
///
/// Primitive fields always carry a value, so sparse statements include them
/// unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    /// Scalar kind.
    #[serde(rename = "type")]
    pub scalar: Scalar,
    /// True when the field can never be null.
    #[serde(default)]
    pub primitive: bool,
}

impl FieldType {
    /// Nullable field of the given kind.
    pub const fn nullable(scalar: Scalar) -> Self {
        Self {
            scalar,
            primitive: false,
        }
    }

    /// Non-nullable field of the given kind.
    pub const fn primitive(scalar: Scalar) -> Self {
        Self {
            scalar,
            primitive: true,
        }
    }

    /// True for text fields; generated numeric keys are stringified for them.
    pub fn is_textual(&self) -> bool {
        self.scalar == Scalar::Text
    }
}

/// Storage class of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// Ordinary instance state.
    #[default]
    Persistent,
    /// Type-level state shared by all instances.
    Static,
    /// Process-local instance state that is never stored.
    Transient,
}

/// Key generation strategy declared on a primary-key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategyKind {
    /// Time-ordered 64-bit snowflake id.
    #[default]
    Snowflake,
    /// Random 128-bit identifier rendered as 32 hex characters.
    #[serde(alias = "hex")]
    Uuid,
    /// Key assigned by storage on insert.
    Auto,
}

/// Per-field key strategy annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdStrategyDecl {
    /// Strategy kind.
    #[serde(default)]
    pub kind: IdStrategyKind,
    /// Snowflake epoch in milliseconds. `None` or values `<= 0` select the
    /// configured default epoch.
    #[serde(default)]
    pub begin_time: Option<i64>,
}

impl Default for IdStrategyDecl {
    fn default() -> Self {
        Self::snowflake()
    }
}

impl IdStrategyDecl {
    /// Snowflake with the default epoch.
    pub const fn snowflake() -> Self {
        Self {
            kind: IdStrategyKind::Snowflake,
            begin_time: None,
        }
    }

    /// Snowflake with a per-type epoch.
    pub const fn snowflake_since(begin_time: i64) -> Self {
        Self {
            kind: IdStrategyKind::Snowflake,
            begin_time: Some(begin_time),
        }
    }

    /// Random hex identifier.
    pub const fn uuid() -> Self {
        Self {
            kind: IdStrategyKind::Uuid,
            begin_time: None,
        }
    }

    /// Storage-assigned key.
    pub const fn auto() -> Self {
        Self {
            kind: IdStrategyKind::Auto,
            begin_time: None,
        }
    }
}

/// Per-field column annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOverride {
    /// Explicit column name; blank means "derive from the property".
    #[serde(default)]
    pub name: Option<String>,
    /// Whether inserts write this column.
    #[serde(default = "yes")]
    pub insertable: bool,
    /// Whether updates write this column.
    #[serde(default = "yes")]
    pub updatable: bool,
}

fn yes() -> bool {
    true
}

impl Default for ColumnOverride {
    fn default() -> Self {
        Self {
            name: None,
            insertable: true,
            updatable: true,
        }
    }
}

/// Per-type table annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOverride {
    /// Explicit table name; blank means "derive from the type name".
    #[serde(default)]
    pub name: Option<String>,
    /// Schema qualifier prepended as `schema.table`.
    #[serde(default)]
    pub schema: Option<String>,
}

impl TableOverride {
    /// Table renamed to `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            schema: None,
        }
    }

    /// Adds a schema qualifier.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Logical property name.
    pub name: String,
    /// Declared type.
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Storage class modifier.
    #[serde(default)]
    pub storage: Storage,
    /// Explicit "not persistent" annotation.
    #[serde(default)]
    pub not_persistent: bool,
    /// Column annotation.
    #[serde(default)]
    pub column: Option<ColumnOverride>,
    /// Explicit primary-key marker.
    #[serde(default)]
    pub primary_key: bool,
    /// Key strategy annotation; only read on the primary-key field.
    #[serde(default)]
    pub id_strategy: Option<IdStrategyDecl>,
}

impl FieldSchema {
    /// Declares a nullable field.
    pub fn new(name: impl Into<String>, scalar: Scalar) -> Self {
        Self::typed(name, FieldType::nullable(scalar))
    }

    /// Declares a field with an explicit type.
    pub fn typed(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            storage: Storage::Persistent,
            not_persistent: false,
            column: None,
            primary_key: false,
            id_strategy: None,
        }
    }

    /// Marks the field as never null.
    pub fn primitive(mut self) -> Self {
        self.field_type.primitive = true;
        self
    }

    /// Overrides the storage class.
    pub fn storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    /// Marks the field as not persistent.
    pub fn not_persistent(mut self) -> Self {
        self.not_persistent = true;
        self
    }

    /// Overrides the column name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column.get_or_insert_with(ColumnOverride::default).name = Some(name.into());
        self
    }

    /// Sets the insertable flag.
    pub fn insertable(mut self, insertable: bool) -> Self {
        self.column
            .get_or_insert_with(ColumnOverride::default)
            .insertable = insertable;
        self
    }

    /// Sets the updatable flag.
    pub fn updatable(mut self, updatable: bool) -> Self {
        self.column
            .get_or_insert_with(ColumnOverride::default)
            .updatable = updatable;
        self
    }

    /// Marks the field as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Declares the key strategy.
    pub fn id_strategy(mut self, strategy: IdStrategyDecl) -> Self {
        self.id_strategy = Some(strategy);
        self
    }

    pub(crate) fn is_persistent(&self) -> bool {
        self.storage == Storage::Persistent && !self.not_persistent
    }
}

/// Description of a record type and its ancestors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// Simple type name, e.g. `UserAccount`.
    pub name: String,
    /// Table annotation.
    #[serde(default)]
    pub table: Option<TableOverride>,
    /// Fields declared directly on this type, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    /// Parent type, if any.
    #[serde(default)]
    pub parent: Option<Box<TypeSchema>>,
}

impl TypeSchema {
    /// Starts a schema for the named type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
            parent: None,
        }
    }

    /// Sets the table annotation.
    pub fn table(mut self, table: TableOverride) -> Self {
        self.table = Some(table);
        self
    }

    /// Appends a declared field.
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares the parent type.
    pub fn extends(mut self, parent: TypeSchema) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Parses a schema from TOML.
    pub fn from_toml_str(src: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(src)
    }

    /// Iterates this type and its ancestors, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &TypeSchema> {
        std::iter::successors(Some(self), |schema| schema.parent.as_deref())
    }
}
