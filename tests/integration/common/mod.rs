#![allow(dead_code, missing_docs)]

use std::sync::Arc;

use parking_lot::Mutex;
use tessera::{
    config::SnowflakeConfig,
    model::{FieldSchema, IdStrategyDecl, Scalar, Storage, TableOverride, TypeSchema},
    sql::BoundStatement,
    Accessor, Config, Database, FieldAccess, FromValue, InsertOutcome, LimitOffsetPages,
    ModelRegistry, Record, Result, Row, SqlExecutor, SqliteExecutor, TesseraError, Value,
};

pub const SCHEMA_SQL: &str = "
    CREATE TABLE user_account (
        id INTEGER PRIMARY KEY,
        user_name TEXT,
        status TEXT,
        created_at INTEGER
    );
    CREATE TABLE counters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT
    );
    CREATE TABLE document (
        id TEXT PRIMARY KEY,
        title TEXT
    );
    CREATE TABLE staff (
        id INTEGER PRIMARY KEY,
        created_at INTEGER,
        name TEXT,
        department TEXT
    );
";

fn unknown(model: &str, property: &str) -> TesseraError {
    TesseraError::UnknownProperty {
        model: model.to_string(),
        property: property.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAccount {
    pub id: Option<i64>,
    pub user_name: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<i64>,
    pub scratch: Option<String>,
}

impl UserAccount {
    pub const ID: Accessor<Self> = Accessor::new("getId");
    pub const USER_NAME: Accessor<Self> = Accessor::new("getUserName");
    pub const STATUS: Accessor<Self> = Accessor::new("getStatus");
    pub const SCRATCH: Accessor<Self> = Accessor::new("getScratch");

    pub fn named(name: &str, status: &str) -> Self {
        Self {
            user_name: Some(name.to_string()),
            status: Some(status.to_string()),
            ..Self::default()
        }
    }

    pub fn with_status(status: &str) -> Self {
        Self {
            status: Some(status.to_string()),
            ..Self::default()
        }
    }
}

impl FieldAccess for UserAccount {
    fn field_value(&self, property: &str) -> Value {
        match property {
            "id" => self.id.into(),
            "userName" => (&self.user_name).into(),
            "status" => (&self.status).into(),
            "createdAt" => self.created_at.into(),
            "scratch" => (&self.scratch).into(),
            _ => Value::Null,
        }
    }
}

impl Record for UserAccount {
    fn schema() -> TypeSchema {
        TypeSchema::new("UserAccount")
            .field(FieldSchema::new("id", Scalar::Int))
            .field(FieldSchema::new("userName", Scalar::Text))
            .field(FieldSchema::new("status", Scalar::Text))
            .field(FieldSchema::new("createdAt", Scalar::Int).updatable(false))
            .field(FieldSchema::new("scratch", Scalar::Text).storage(Storage::Transient))
    }

    fn set_field_value(&mut self, property: &str, value: Value) -> Result<()> {
        match property {
            "id" => self.id = FromValue::from_value(property, value)?,
            "userName" => self.user_name = FromValue::from_value(property, value)?,
            "status" => self.status = FromValue::from_value(property, value)?,
            "createdAt" => self.created_at = FromValue::from_value(property, value)?,
            "scratch" => self.scratch = FromValue::from_value(property, value)?,
            other => return Err(unknown("UserAccount", other)),
        }
        Ok(())
    }
}

/// Storage-assigned keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counter {
    pub id: Option<i64>,
    pub label: Option<String>,
}

impl Counter {
    pub fn labelled(label: &str) -> Self {
        Self {
            id: None,
            label: Some(label.to_string()),
        }
    }
}

impl FieldAccess for Counter {
    fn field_value(&self, property: &str) -> Value {
        match property {
            "id" => self.id.into(),
            "label" => (&self.label).into(),
            _ => Value::Null,
        }
    }
}

impl Record for Counter {
    fn schema() -> TypeSchema {
        TypeSchema::new("Counter")
            .table(TableOverride::named("counters"))
            .field(
                FieldSchema::new("id", Scalar::Int)
                    .primary_key()
                    .id_strategy(IdStrategyDecl::auto()),
            )
            .field(FieldSchema::new("label", Scalar::Text))
    }

    fn set_field_value(&mut self, property: &str, value: Value) -> Result<()> {
        match property {
            "id" => self.id = FromValue::from_value(property, value)?,
            "label" => self.label = FromValue::from_value(property, value)?,
            other => return Err(unknown("Counter", other)),
        }
        Ok(())
    }
}

/// Random hex keys on a text key field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub id: Option<String>,
    pub title: Option<String>,
}

impl FieldAccess for Document {
    fn field_value(&self, property: &str) -> Value {
        match property {
            "id" => (&self.id).into(),
            "title" => (&self.title).into(),
            _ => Value::Null,
        }
    }
}

impl Record for Document {
    fn schema() -> TypeSchema {
        TypeSchema::new("Document")
            .field(
                FieldSchema::new("id", Scalar::Text)
                    .primary_key()
                    .id_strategy(IdStrategyDecl::uuid()),
            )
            .field(FieldSchema::new("title", Scalar::Text))
    }

    fn set_field_value(&mut self, property: &str, value: Value) -> Result<()> {
        match property {
            "id" => self.id = FromValue::from_value(property, value)?,
            "title" => self.title = FromValue::from_value(property, value)?,
            other => return Err(unknown("Document", other)),
        }
        Ok(())
    }
}

/// Inherits its key and audit column from a base schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Employee {
    pub id: Option<i64>,
    pub created_at: Option<i64>,
    pub name: Option<String>,
    pub department: Option<String>,
}

impl Employee {
    pub const NAME: Accessor<Self> = Accessor::new("getName");

    pub fn base_schema() -> TypeSchema {
        TypeSchema::new("BaseEntity")
            .field(FieldSchema::new("id", Scalar::Int))
            .field(FieldSchema::new("createdAt", Scalar::Int).updatable(false))
    }
}

impl FieldAccess for Employee {
    fn field_value(&self, property: &str) -> Value {
        match property {
            "id" => self.id.into(),
            "createdAt" => self.created_at.into(),
            "name" => (&self.name).into(),
            "department" => (&self.department).into(),
            _ => Value::Null,
        }
    }
}

impl Record for Employee {
    fn schema() -> TypeSchema {
        TypeSchema::new("Employee")
            .table(TableOverride::named("staff"))
            .extends(Self::base_schema())
            .field(FieldSchema::new("name", Scalar::Text))
            .field(FieldSchema::new("department", Scalar::Text))
    }

    fn set_field_value(&mut self, property: &str, value: Value) -> Result<()> {
        match property {
            "id" => self.id = FromValue::from_value(property, value)?,
            "createdAt" => self.created_at = FromValue::from_value(property, value)?,
            "name" => self.name = FromValue::from_value(property, value)?,
            "department" => self.department = FromValue::from_value(property, value)?,
            other => return Err(unknown("Employee", other)),
        }
        Ok(())
    }
}

/// No key field at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLine {
    pub line: Option<String>,
}

impl FieldAccess for AuditLine {
    fn field_value(&self, property: &str) -> Value {
        match property {
            "line" => (&self.line).into(),
            _ => Value::Null,
        }
    }
}

impl Record for AuditLine {
    fn schema() -> TypeSchema {
        TypeSchema::new("AuditLine").field(FieldSchema::new("line", Scalar::Text))
    }

    fn set_field_value(&mut self, property: &str, value: Value) -> Result<()> {
        match property {
            "line" => self.line = FromValue::from_value(property, value)?,
            other => return Err(unknown("AuditLine", other)),
        }
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        snowflake: SnowflakeConfig {
            datacenter_id: Some(1),
            worker_id: Some(1),
            ..SnowflakeConfig::default()
        },
        ..Config::default()
    }
}

pub fn registry() -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::new(test_config()).expect("registry"))
}

/// SQLite-backed database with every fixture table created.
pub fn sqlite_database(paginated: bool) -> Database {
    let executor = SqliteExecutor::open_in_memory().expect("open sqlite");
    executor.execute_batch(SCHEMA_SQL).expect("create tables");
    let db = Database::new(registry(), Arc::new(executor));
    if paginated {
        db.with_pages(Arc::new(LimitOffsetPages))
    } else {
        db
    }
}

/// Executor that records every statement it is handed and touches nothing.
#[derive(Default)]
pub struct RecordingExecutor {
    pub statements: Mutex<Vec<BoundStatement>>,
    pub rows: Mutex<Vec<Row>>,
}

impl RecordingExecutor {
    pub fn calls(&self) -> usize {
        self.statements.lock().len()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.statements.lock().last().map(|s| s.sql.clone())
    }

    pub fn last(&self) -> Option<BoundStatement> {
        self.statements.lock().last().cloned()
    }
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&self, statement: &BoundStatement) -> Result<u64> {
        self.statements.lock().push(statement.clone());
        Ok(1)
    }

    fn insert(&self, statement: &BoundStatement) -> Result<InsertOutcome> {
        self.statements.lock().push(statement.clone());
        Ok(InsertOutcome {
            affected: 1,
            generated_keys: Vec::new(),
        })
    }

    fn query(&self, statement: &BoundStatement) -> Result<Vec<Row>> {
        self.statements.lock().push(statement.clone());
        Ok(self.rows.lock().clone())
    }
}

pub fn recording_database() -> (Database, Arc<RecordingExecutor>) {
    let executor = Arc::new(RecordingExecutor::default());
    let db = Database::new(registry(), executor.clone());
    (db, executor)
}
