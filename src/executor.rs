#![forbid(unsafe_code)]

//! Statement execution seam.
//!
//! The core never talks to a database directly. Bound statements are handed
//! to a [`SqlExecutor`]; errors it raises reach the caller unchanged.

use crate::model::{Record, Value};
use crate::sql::BoundStatement;
use crate::error::Result;

/// One result row: column labels paired with values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    pub fn push(&mut self, label: impl Into<String>, value: Value) {
        self.columns.push((label.into(), value));
    }

    /// Value of the column labelled `label`.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value)
    }

    /// Value of the first column.
    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True for a row without columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Maps the row onto a default `T`, assigning every column whose label
    /// names a property of `T`.
    ///
    /// Labels match exactly first, then ignoring ASCII case, since some
    /// engines fold unquoted aliases to lower case.
    pub fn into_record<T: Record>(self, properties: &[&str]) -> Result<T> {
        let mut record = T::default();
        for (label, value) in self.columns {
            let property = properties
                .iter()
                .find(|property| **property == label)
                .or_else(|| {
                    properties
                        .iter()
                        .find(|property| property.eq_ignore_ascii_case(&label))
                });
            if let Some(property) = property {
                record.set_field_value(property, value)?;
            }
        }
        Ok(record)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Result of an insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOutcome {
    /// Rows inserted.
    pub affected: u64,
    /// Storage-assigned keys, in insertion order, when the statement asked for them.
    pub generated_keys: Vec<Value>,
}

/// Executes bound statements against a store.
pub trait SqlExecutor: Send + Sync {
    /// Runs an `UPDATE`/`DELETE` (or an insert without generated keys) and
    /// returns the affected row count.
    fn execute(&self, statement: &BoundStatement) -> Result<u64>;

    /// Runs an `INSERT`, reading back generated keys when
    /// [`BoundStatement::generated_key`] is set.
    fn insert(&self, statement: &BoundStatement) -> Result<InsertOutcome> {
        Ok(InsertOutcome {
            affected: self.execute(statement)?,
            generated_keys: Vec::new(),
        })
    }

    /// Runs a `SELECT`.
    fn query(&self, statement: &BoundStatement) -> Result<Vec<Row>>;

    /// Runs a single-value `SELECT` such as a count; absent rows read as 0.
    fn query_count(&self, statement: &BoundStatement) -> Result<i64> {
        let rows = self.query(statement)?;
        Ok(rows
            .first()
            .and_then(Row::first)
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }
}
