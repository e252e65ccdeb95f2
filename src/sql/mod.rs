#![forbid(unsafe_code)]

//! Statement shapes and their rendering.
//!
//! A [`Statement`] is the compiled, reusable shape of one operation on one
//! record type. Its [`Script`] decides at bind time which fragments to
//! include, based on which fields of the bound record are present. Binding
//! produces a [`BoundStatement`]: final SQL text plus positional parameters,
//! ready for a [`SqlExecutor`](crate::executor::SqlExecutor).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Value;
use crate::error::Result;

pub mod script;
pub mod synth;

pub use script::{Binding, Bindings, Collection, Node, Script};
pub use synth::{Operation, SortColumn};

/// Placeholder style of rendered SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `?` placeholders (SQLite, MySQL).
    #[default]
    Question,
    /// `$1`, `$2`, ... placeholders (PostgreSQL).
    Dollar,
}

impl Dialect {
    pub(crate) fn write_placeholder(self, out: &mut String, position: usize) {
        match self {
            Dialect::Question => out.push('?'),
            Dialect::Dollar => {
                out.push('$');
                out.push_str(&position.to_string());
            }
        }
    }
}

/// Kind of SQL command a statement issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandKind {
    /// `INSERT`
    Insert,
    /// `UPDATE`
    Update,
    /// `DELETE`
    Delete,
    /// `SELECT`
    Select,
}

impl CommandKind {
    /// Upper-case SQL keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Insert => "INSERT",
            CommandKind::Update => "UPDATE",
            CommandKind::Delete => "DELETE",
            CommandKind::Select => "SELECT",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic statement key: `{type}.{operation}.{COMMAND}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StatementId(String);

impl StatementId {
    /// Key of a fixed-shape statement.
    pub fn new(type_name: &str, operation: &str, command: CommandKind) -> Self {
        Self(format!("{type_name}.{operation}.{command}"))
    }

    /// Key of a call-site-varying statement; `shape_hash` identifies the script.
    pub fn varying(type_name: &str, operation: &str, shape_hash: u64, command: CommandKind) -> Self {
        Self(format!("{type_name}.{operation}_{shape_hash:016x}.{command}"))
    }

    /// The key as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage-assigned key read back after an insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedKey {
    /// Key column.
    pub column: String,
    /// Key property the value is written back to.
    pub property: String,
}

/// Compiled statement shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// Cache key.
    pub id: StatementId,
    /// Command kind.
    pub command: CommandKind,
    /// Conditional script.
    #[serde(serialize_with = "serialize_display")]
    pub script: Script,
    /// Generated-key channel, set for inserts into storage-keyed types.
    pub generated_key: Option<GeneratedKey>,
}

impl Statement {
    /// Renders the statement against `bindings`.
    pub fn bind(&self, bindings: &Bindings<'_>, dialect: Dialect) -> Result<BoundStatement> {
        let (sql, params) = self.script.render(bindings, dialect)?;
        Ok(BoundStatement {
            id: self.id.clone(),
            command: self.command,
            sql,
            params,
            generated_key: self.generated_key.clone(),
        })
    }
}

fn serialize_display<S, T>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: fmt::Display,
{
    serializer.collect_str(value)
}

/// Statement text with its parameters, as handed to an executor.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    /// Originating statement.
    pub id: StatementId,
    /// Command kind.
    pub command: CommandKind,
    /// Final SQL text.
    pub sql: String,
    /// Positional parameters.
    pub params: Vec<Value>,
    /// Generated-key channel.
    pub generated_key: Option<GeneratedKey>,
}
