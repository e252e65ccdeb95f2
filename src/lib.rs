//! Tessera: descriptor-driven CRUD statement synthesis and unique-key generation.
//!
//! Record types describe themselves with a [`TypeSchema`]; the
//! [`ModelRegistry`] turns that into an immutable [`ModelDescriptor`] once per
//! type. Statements are synthesized from descriptors, compiled once into the
//! [`StatementCache`] and executed through a [`SqlExecutor`]. Keys come from a
//! lock-coordinated snowflake generator, random hex identifiers, or storage.

#![warn(missing_docs)]

pub mod accessor;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod id;
pub mod mapper;
pub mod model;
pub mod page;
pub mod registry;
pub mod sql;
pub mod sqlite;

pub use accessor::{Accessor, AccessorResolver, Sorter};
pub use cache::{StatementCache, StatementCacheStats};
pub use config::{Config, ConfigError};
pub use error::{Result, TesseraError};
pub use executor::{InsertOutcome, Row, SqlExecutor};
pub use id::{IdGenerator, IdGenerators, IdStrategy, SnowflakeGenerator};
pub use mapper::{Database, Mapper};
pub use model::{
    FieldAccess, FieldDescriptor, FieldSchema, FromValue, ModelDescriptor, Record, Scalar,
    TypeSchema, Value,
};
pub use page::{LimitOffsetPages, Page, PageEngine, PageWindow};
pub use registry::ModelRegistry;
pub use sqlite::SqliteExecutor;
