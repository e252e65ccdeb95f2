#![forbid(unsafe_code)]

//! Compiled statement cache.
//!
//! Fixed shapes (one per type and operation) live in an unbounded map, since
//! their count is bounded by the number of registered types. Shapes that vary
//! with the call site (sorted condition queries) are looked up by type and
//! resolved sort columns, identified by a hash of their script, and kept in an
//! LRU so distinct sort combinations cannot grow the cache without limit.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::model::ModelDescriptor;
use crate::sql::synth::{self, Operation, SortColumn};
use crate::sql::{Statement, StatementId};
use crate::error::Result;

/// Point-in-time cache counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StatementCacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that compiled a statement.
    pub misses: u64,
    /// Registered fixed shapes.
    pub fixed_entries: usize,
    /// Registered call-site-varying shapes.
    pub varying_entries: usize,
}

type SortKey = (String, Vec<SortColumn>);

/// Statement shapes compiled at most once per key.
pub struct StatementCache {
    fixed: RwLock<HashMap<StatementId, Arc<Statement>>>,
    varying: Mutex<LruCache<SortKey, Arc<Statement>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatementCache {
    /// Creates a cache holding at most `varying_capacity` call-site-varying shapes.
    pub fn new(varying_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(varying_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            fixed: RwLock::new(HashMap::new()),
            varying: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the statement for a fixed-shape operation, compiling it on miss.
    pub fn statement(&self, model: &ModelDescriptor, operation: Operation) -> Result<Arc<Statement>> {
        let id = StatementId::new(model.type_name(), operation.name(), operation.command());
        self.get_or_build(id, || synth::statement(model, operation))
    }

    /// Returns a sorted condition query, compiling it on miss.
    ///
    /// Hits are found by type and sort columns without synthesizing the script.
    pub fn list_by_condition(&self, model: &ModelDescriptor, sorts: &[SortColumn]) -> Arc<Statement> {
        let key = (model.type_name().to_owned(), sorts.to_vec());
        let mut varying = self.varying.lock();
        if let Some(existing) = varying.get(&key) {
            self.hits.fetch_add(1, AtomicOrdering::Relaxed);
            trace!(statement = %existing.id, "statement cache hit");
            return Arc::clone(existing);
        }
        let statement = Arc::new(synth::list_by_condition(model, sorts));
        self.misses.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(statement = %statement.id, "compiled statement");
        varying.put(key, Arc::clone(&statement));
        statement
    }

    /// Looks `id` up among fixed shapes, registering `build`'s result on miss.
    ///
    /// Racing builders may each compile; the first registration wins and every
    /// caller receives that entry.
    pub fn get_or_build<F>(&self, id: StatementId, build: F) -> Result<Arc<Statement>>
    where
        F: FnOnce() -> Result<Statement>,
    {
        if let Some(existing) = self.fixed.read().get(&id) {
            self.hits.fetch_add(1, AtomicOrdering::Relaxed);
            trace!(statement = %id, "statement cache hit");
            return Ok(Arc::clone(existing));
        }
        let built = Arc::new(build()?);
        self.misses.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(statement = %id, "compiled statement");
        let mut fixed = self.fixed.write();
        Ok(Arc::clone(fixed.entry(id).or_insert(built)))
    }

    /// True when `id` is registered.
    pub fn contains(&self, id: &StatementId) -> bool {
        self.fixed.read().contains_key(id)
            || self.varying.lock().iter().any(|(_, statement)| &statement.id == id)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StatementCacheStats {
        StatementCacheStats {
            hits: self.hits.load(AtomicOrdering::Relaxed),
            misses: self.misses.load(AtomicOrdering::Relaxed),
            fixed_entries: self.fixed.read().len(),
            varying_entries: self.varying.lock().len(),
        }
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new(512)
    }
}
