//! Request-scoped memoization for correlation lookups.
//!
//! A `QueryCache` is created when a query starts and dropped when it ends.
//! It is never shared across queries or providers.

use std::collections::HashMap;

use crate::error::Result;

/// Memoizes lookups keyed by a stable identifier.
#[derive(Debug)]
pub struct QueryCache<V> {
    entries: HashMap<String, V>,
    hits: usize,
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
        }
    }
}

impl<V: Clone> QueryCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or run `fetch` once and cache it.
    ///
    /// Errors are not cached, so a failed lookup aborts the query instead
    /// of being remembered.
    pub fn get_or_try_insert_with<F>(&mut self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.entries.get(key) {
            self.hits += 1;
            return Ok(value.clone());
        }
        let value = fetch()?;
        self.entries.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Number of distinct identifiers resolved.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }
}
