#![forbid(unsafe_code)]

//! Process-wide home of descriptors, generators and caches.
//!
//! A [`ModelRegistry`] is created once and shared by reference; tests build
//! their own isolated registries. Descriptors are written once per record
//! type and read-only afterwards.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::accessor::{Accessor, AccessorResolver};
use crate::cache::StatementCache;
use crate::config::Config;
use crate::id::{Clock, IdGenerators, SystemClock};
use crate::model::{ModelDescriptor, Record, TypeSchema};
use crate::sql::Dialect;
use crate::error::Result;

/// Registry of record types.
pub struct ModelRegistry {
    config: Config,
    generators: IdGenerators,
    models: RwLock<HashMap<TypeId, Arc<ModelDescriptor>>>,
    statements: StatementCache,
    accessors: AccessorResolver,
}

impl ModelRegistry {
    /// Registry reading the wall clock.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Registry whose snowflake generators read `clock`.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let generators = IdGenerators::with_clock(&config.snowflake, clock)?;
        Ok(Self {
            statements: StatementCache::new(config.statements.variable_capacity),
            accessors: AccessorResolver::new(config.accessors.capacity),
            generators,
            models: RwLock::new(HashMap::new()),
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Placeholder style of rendered statements.
    pub fn dialect(&self) -> Dialect {
        self.config.statements.dialect
    }

    /// Descriptor of `T`, extracting it on first use.
    pub fn descriptor<T: Record>(&self) -> Arc<ModelDescriptor> {
        let key = TypeId::of::<T>();
        if let Some(model) = self.models.read().get(&key) {
            return Arc::clone(model);
        }
        let mut models = self.models.write();
        let model = models.entry(key).or_insert_with(|| {
            let model = ModelDescriptor::build_named(type_name::<T>(), &T::schema(), &self.generators);
            info!(
                record = type_name::<T>(),
                table = model.model_name(),
                fields = model.fields().len(),
                strategy = ?model.id_strategy(),
                "registered record type"
            );
            Arc::new(model)
        });
        Arc::clone(model)
    }

    /// Registers `T` ahead of first use.
    pub fn register<T: Record>(&self) -> Arc<ModelDescriptor> {
        self.descriptor::<T>()
    }

    /// True once `T` has a descriptor.
    pub fn is_registered<T: Record>(&self) -> bool {
        self.models.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of registered record types.
    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    /// True when no record type is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds an unregistered descriptor for a free-standing schema.
    pub fn describe(&self, schema: &TypeSchema) -> ModelDescriptor {
        ModelDescriptor::build(schema, &self.generators)
    }

    /// Property name behind `accessor`.
    pub fn property_of<T: Record>(&self, accessor: Accessor<T>) -> Arc<str> {
        self.accessors.resolve(accessor)
    }

    /// Key generators.
    pub fn generators(&self) -> &IdGenerators {
        &self.generators
    }

    /// Statement cache.
    pub fn statements(&self) -> &StatementCache {
        &self.statements
    }

    /// Accessor resolution cache.
    pub fn accessors(&self) -> &AccessorResolver {
        &self.accessors
    }
}
