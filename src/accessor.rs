#![forbid(unsafe_code)]

//! Typed field accessors used as sort keys.
//!
//! An [`Accessor`] names a getter or setter of a record type, e.g.
//! `Accessor::<UserAccount>::new("getUserName")`. Record types usually expose
//! them as associated constants so call sites never spell property names. The
//! [`AccessorResolver`] recovers the property name by naming convention and
//! caches the result per record type and accessor.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

const ACCESSOR_PREFIXES: [&str; 3] = ["is", "get", "set"];

/// Handle to a getter or setter of `T`.
pub struct Accessor<T> {
    name: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Accessor<T> {
    /// Accessor named `name`; usable in `const` items.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _record: PhantomData,
        }
    }

    /// Accessor name as declared.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Ascending sort on this accessor's property.
    pub const fn asc(self) -> Sorter<T> {
        Sorter::asc(self)
    }

    /// Descending sort on this accessor's property.
    pub const fn desc(self) -> Sorter<T> {
        Sorter::desc(self)
    }
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Accessor<T> {}

impl<T> PartialEq for Accessor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Accessor<T> {}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Accessor").field(&self.name).finish()
    }
}

/// Sort directive on one accessor.
pub struct Sorter<T> {
    accessor: Accessor<T>,
    ascending: bool,
}

impl<T> Sorter<T> {
    /// Ascending sort.
    pub const fn asc(accessor: Accessor<T>) -> Self {
        Self {
            accessor,
            ascending: true,
        }
    }

    /// Descending sort.
    pub const fn desc(accessor: Accessor<T>) -> Self {
        Self {
            accessor,
            ascending: false,
        }
    }

    /// Sorted accessor.
    pub fn accessor(&self) -> Accessor<T> {
        self.accessor
    }

    /// True for ascending order.
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

impl<T> Clone for Sorter<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Sorter<T> {}

impl<T> fmt::Debug for Sorter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorter")
            .field("accessor", &self.accessor.name)
            .field("ascending", &self.ascending)
            .finish()
    }
}

/// Recovers property names from accessor names.
///
/// A leading `is`, `get` or `set` is stripped when it is followed by an
/// upper-case letter or `_`; a leading `_` is then dropped, and the first
/// character is lower-cased unless the second is upper-case (`getURL` stays
/// `URL`).
pub fn property_name(accessor: &str) -> String {
    let mut rest = ACCESSOR_PREFIXES
        .iter()
        .find_map(|prefix| {
            accessor.strip_prefix(prefix).filter(|tail| {
                tail.chars()
                    .next()
                    .is_some_and(|c| c.is_uppercase() || c == '_')
            })
        })
        .unwrap_or(accessor);
    rest = rest.strip_prefix('_').unwrap_or(rest);

    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) {
        return rest.to_string();
    }
    let mut property: String = first.to_lowercase().collect();
    property.push_str(&rest[first.len_utf8()..]);
    property
}

/// Cache of resolved accessor names, keyed by record type and accessor.
///
/// Bounded so entries for accessors that are no longer used get reclaimed.
pub struct AccessorResolver {
    resolved: Mutex<LruCache<(TypeId, &'static str), Arc<str>>>,
}

impl AccessorResolver {
    /// Creates a resolver caching at most `capacity` names.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            resolved: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Property name behind `accessor`.
    pub fn resolve<T: 'static>(&self, accessor: Accessor<T>) -> Arc<str> {
        let key = (TypeId::of::<T>(), accessor.name);
        let mut resolved = self.resolved.lock();
        if let Some(property) = resolved.get(&key) {
            return Arc::clone(property);
        }
        let property: Arc<str> = Arc::from(property_name(accessor.name));
        trace!(accessor = accessor.name, %property, "resolved accessor");
        resolved.put(key, Arc::clone(&property));
        property
    }

    /// Number of cached resolutions.
    pub fn len(&self) -> usize {
        self.resolved.lock().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AccessorResolver {
    fn default() -> Self {
        Self::new(256)
    }
}
