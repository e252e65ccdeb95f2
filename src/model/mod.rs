#![forbid(unsafe_code)]

//! Record types and their metadata.
//!
//! A record type describes itself through [`Record::schema`]; the registry
//! turns that description into a [`ModelDescriptor`] once per type. Field
//! values travel as [`Value`]s in both directions.

use std::collections::{BTreeMap, HashMap};

mod descriptor;
pub mod naming;
pub mod schema;
pub mod value;

pub use descriptor::{FieldDescriptor, ModelDescriptor, DEFAULT_ID_PROPERTY};
pub use naming::camel_to_snake;
pub use schema::{
    ColumnOverride, FieldSchema, FieldType, IdStrategyDecl, IdStrategyKind, Scalar, Storage,
    TableOverride, TypeSchema,
};
pub use value::{FromValue, Value};

use crate::error::Result;

/// Read access to a record's fields by property name.
pub trait FieldAccess {
    /// Current value of `property`; [`Value::Null`] when absent or unknown.
    fn field_value(&self, property: &str) -> Value;
}

/// A persistent record type.
///
/// `Default` supplies the all-absent instance used both as the starting point
/// for mapping result rows and as the match-everything filter.
pub trait Record: FieldAccess + Default + Send + Sync + 'static {
    /// Declarative description of the type.
    fn schema() -> TypeSchema;

    /// Assigns `value` to `property`.
    ///
    /// Implementations return [`TesseraError::UnknownProperty`] for names
    /// they do not declare and [`TesseraError::TypeMismatch`] for values that
    /// do not convert.
    ///
    /// [`TesseraError::UnknownProperty`]: crate::error::TesseraError::UnknownProperty
    /// [`TesseraError::TypeMismatch`]: crate::error::TesseraError::TypeMismatch
    fn set_field_value(&mut self, property: &str, value: Value) -> Result<()>;
}

impl FieldAccess for BTreeMap<String, Value> {
    fn field_value(&self, property: &str) -> Value {
        self.get(property).cloned().unwrap_or_default()
    }
}

impl FieldAccess for HashMap<String, Value> {
    fn field_value(&self, property: &str) -> Value {
        self.get(property).cloned().unwrap_or_default()
    }
}

impl<T: FieldAccess + ?Sized> FieldAccess for &T {
    fn field_value(&self, property: &str) -> Value {
        (**self).field_value(property)
    }
}
