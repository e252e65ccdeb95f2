#![forbid(unsafe_code)]

//! Per-record-type data-access façade.
//!
//! [`Database`] ties a [`ModelRegistry`] to a [`SqlExecutor`] and, optionally,
//! a [`PageEngine`]. [`Mapper`] exposes the CRUD operations for one record
//! type; it only fetches cached statements, binds them and maps rows back.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::trace;

use crate::accessor::Sorter;
use crate::executor::{Row, SqlExecutor};
use crate::model::{FieldAccess, ModelDescriptor, Record, Value};
use crate::page::{self, Page, PageEngine};
use crate::registry::ModelRegistry;
use crate::sql::synth::{sort_columns, Operation};
use crate::sql::{Bindings, BoundStatement, Statement};
use crate::error::{Result, TesseraError};

/// Registry plus execution collaborators.
#[derive(Clone)]
pub struct Database {
    registry: Arc<ModelRegistry>,
    executor: Arc<dyn SqlExecutor>,
    pages: Option<Arc<dyn PageEngine>>,
}

impl Database {
    /// Database without a pagination engine.
    pub fn new(registry: Arc<ModelRegistry>, executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            registry,
            executor,
            pages: None,
        }
    }

    /// Installs a pagination engine.
    pub fn with_pages(mut self, engine: Arc<dyn PageEngine>) -> Self {
        self.pages = Some(engine);
        self
    }

    /// Shared registry.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Façade for `T`, registering the type on first use.
    pub fn mapper<T: Record>(&self) -> Mapper<T> {
        Mapper {
            model: self.registry.descriptor::<T>(),
            registry: Arc::clone(&self.registry),
            executor: Arc::clone(&self.executor),
            pages: self.pages.clone(),
            _record: PhantomData,
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("registered", &self.registry.len())
            .field("paginated", &self.pages.is_some())
            .finish_non_exhaustive()
    }
}

/// CRUD operations for record type `T`.
pub struct Mapper<T> {
    model: Arc<ModelDescriptor>,
    registry: Arc<ModelRegistry>,
    executor: Arc<dyn SqlExecutor>,
    pages: Option<Arc<dyn PageEngine>>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Mapper<T> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            registry: Arc::clone(&self.registry),
            executor: Arc::clone(&self.executor),
            pages: self.pages.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Mapper<T> {
    /// Descriptor of `T`.
    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    /// Inserts the present fields of `record`.
    ///
    /// A missing key is generated first; a storage-assigned key is written
    /// back after the insert.
    pub fn insert(&self, record: &mut T) -> Result<bool> {
        self.model.fill_id_if_absent(record)?;
        let statement = self.bind(Operation::Insert, &Bindings::Record(&*record))?;
        let outcome = self.executor.insert(&statement)?;
        if let (Some(key), Some(value)) = (&statement.generated_key, outcome.generated_keys.into_iter().next()) {
            record.set_field_value(&key.property, value)?;
        }
        Ok(outcome.affected > 0)
    }

    /// Inserts every record with the full insertable column set.
    ///
    /// Returns `false` without touching storage for an empty slice.
    pub fn batch_insert(&self, records: &mut [T]) -> Result<bool> {
        if records.is_empty() {
            trace!(record = self.model.type_name(), "empty batch; skipping insert");
            return Ok(false);
        }
        for record in records.iter_mut() {
            self.model.fill_id_if_absent(record)?;
        }
        let (statement, outcome) = {
            let rows: Vec<&dyn FieldAccess> = records.iter().map(|r| r as &dyn FieldAccess).collect();
            let statement = self.bind(Operation::BatchInsert, &Bindings::Batch(&rows))?;
            let outcome = self.executor.insert(&statement)?;
            (statement, outcome)
        };
        if let Some(key) = &statement.generated_key {
            for (record, value) in records.iter_mut().zip(outcome.generated_keys) {
                record.set_field_value(&key.property, value)?;
            }
        }
        Ok(outcome.affected > 0)
    }

    /// Deletes the row keyed `id`; a null key is a no-op.
    pub fn delete_by_id(&self, id: impl Into<Value>) -> Result<bool> {
        let id = id.into();
        if id.is_null() {
            trace!(record = self.model.type_name(), "null key; skipping delete");
            return Ok(false);
        }
        let statement = self.bind(Operation::DeleteById, &Bindings::Key(&id))?;
        Ok(self.executor.execute(&statement)? > 0)
    }

    /// Deletes the rows keyed by `ids`; an empty set is a no-op.
    pub fn delete_by_ids<I, V>(&self, ids: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            trace!(record = self.model.type_name(), "empty key set; skipping delete");
            return Ok(false);
        }
        let statement = self.bind(Operation::DeleteByIds, &Bindings::Keys(&ids))?;
        Ok(self.executor.execute(&statement)? > 0)
    }

    /// Updates the present updatable fields of `record`, scoped by its key.
    ///
    /// A null key, or nothing to set, is a no-op.
    pub fn update_by_id(&self, record: &T) -> Result<bool> {
        let key = self.model.id_value(record)?;
        let has_changes = self
            .model
            .update_fields()
            .any(|field| field.is_primitive() || !record.field_value(&field.property).is_null());
        if key.is_null() || !has_changes {
            trace!(record = self.model.type_name(), "nothing to update");
            return Ok(false);
        }
        let statement = self.bind(Operation::UpdateById, &Bindings::Record(record))?;
        Ok(self.executor.execute(&statement)? > 0)
    }

    /// Updates every updatable field of `record`, nulls included.
    pub fn update_by_id_full(&self, record: &T) -> Result<bool> {
        let key = self.model.id_value(record)?;
        if key.is_null() || self.model.update_fields().next().is_none() {
            trace!(record = self.model.type_name(), "nothing to update");
            return Ok(false);
        }
        let statement = self.bind(Operation::UpdateByIdFull, &Bindings::Record(record))?;
        Ok(self.executor.execute(&statement)? > 0)
    }

    /// Inserts `record` when its key is absent, otherwise updates it sparsely.
    pub fn save(&self, record: &mut T) -> Result<bool> {
        if self.model.id_value(record)?.is_absent_key() {
            self.insert(record)
        } else {
            self.update_by_id(record)
        }
    }

    /// Loads the row keyed `id`; a null key finds nothing.
    pub fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<T>> {
        let id = id.into();
        if id.is_null() {
            return Ok(None);
        }
        let statement = self.bind(Operation::FindById, &Bindings::Key(&id))?;
        let rows = self.executor.query(&statement)?;
        rows.into_iter().next().map(|row| self.map_row(row)).transpose()
    }

    /// Loads the rows keyed by `ids`; an empty set loads nothing.
    pub fn list_by_ids<I, V>(&self, ids: I) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let statement = self.bind(Operation::ListByIds, &Bindings::Keys(&ids))?;
        self.map_rows(self.executor.query(&statement)?)
    }

    /// Loads rows equal to `filter` on each of its present fields.
    pub fn list_by_condition(&self, filter: &T, sorters: &[Sorter<T>]) -> Result<Vec<T>> {
        let statement = self.condition_query(filter, sorters)?;
        self.map_rows(self.executor.query(&statement)?)
    }

    /// One page of [`list_by_condition`](Self::list_by_condition).
    ///
    /// Fails with [`TesseraError::UnsupportedCapability`] when no pagination
    /// engine is installed.
    pub fn page_by_condition(
        &self,
        filter: &T,
        page_num: i32,
        page_size: i32,
        sorters: &[Sorter<T>],
    ) -> Result<Page<T>> {
        let engine = self
            .pages
            .as_deref()
            .ok_or(TesseraError::UnsupportedCapability("pagination"))?;
        let dialect = self.registry.dialect();
        page::select_page(
            engine,
            page_num,
            page_size,
            || self.count_by_condition(filter),
            |window| {
                let statement = self.condition_query(filter, sorters)?;
                let statement = engine.restrict(statement, window, dialect);
                self.map_rows(self.executor.query(&statement)?)
            },
        )
    }

    /// Counts rows equal to `filter` on each of its present fields.
    pub fn count_by_condition(&self, filter: &T) -> Result<i64> {
        let statement = self.bind(Operation::CountByCondition, &Bindings::Record(filter))?;
        self.executor.query_count(&statement)
    }

    /// True when at least one row matches `filter`.
    pub fn exists_by_condition(&self, filter: &T) -> Result<bool> {
        Ok(self.count_by_condition(filter)? > 0)
    }

    /// Key value of `record`.
    pub fn id_value(&self, record: &T) -> Result<Value> {
        self.model.id_value(record)
    }

    fn statement(&self, operation: Operation) -> Result<Arc<Statement>> {
        self.registry.statements().statement(&self.model, operation)
    }

    fn bind(&self, operation: Operation, bindings: &Bindings<'_>) -> Result<BoundStatement> {
        self.statement(operation)?
            .bind(bindings, self.registry.dialect())
    }

    fn condition_query(&self, filter: &T, sorters: &[Sorter<T>]) -> Result<BoundStatement> {
        let resolved: Vec<(Arc<str>, bool)> = sorters
            .iter()
            .map(|sorter| (self.registry.property_of(sorter.accessor()), sorter.is_ascending()))
            .collect();
        let sorts = sort_columns(
            &self.model,
            resolved.iter().map(|(property, asc)| (&**property, *asc)),
        );
        let statement = self
            .registry
            .statements()
            .list_by_condition(&self.model, &sorts);
        statement.bind(&Bindings::Record(filter), self.registry.dialect())
    }

    fn map_row(&self, row: Row) -> Result<T> {
        let properties: Vec<&str> = self
            .model
            .fields()
            .iter()
            .map(|field| field.property.as_str())
            .collect();
        row.into_record(&properties)
    }

    fn map_rows(&self, rows: Vec<Row>) -> Result<Vec<T>> {
        rows.into_iter().map(|row| self.map_row(row)).collect()
    }
}
