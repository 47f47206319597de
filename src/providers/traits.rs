//! Provider trait for waypoint.
//!
//! A provider turns a group of queries into decorated records. Providers
//! are registered once at startup and only read during a cycle, so
//! discovery takes `&self`; anything scoped to one query (such as the
//! correlation cache) lives on the stack of that query's execution.

use std::sync::Arc;

use tracing::debug;

use crate::error::{FailOpen, Result};
use crate::model::{Query, Record};

/// Trait for discovery backends.
pub trait Provider: Send + Sync {
    /// Name stamped into every record this provider produces.
    fn name(&self) -> &'static str;

    /// Run one query: list, correlate, filter, decorate, sort and limit.
    fn query(&self, query: &Query) -> Result<Vec<Record>>;

    /// Run a provider's whole query group.
    ///
    /// The default runs each query in order and isolates failures: a
    /// failing query is logged and contributes nothing, while the other
    /// queries' records are still returned.
    fn discover(&self, queries: &[Query]) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for (index, query) in queries.iter().enumerate() {
            let found = self
                .query(query)
                .fail_open_default(&format!("{} query #{} failed", self.name(), index));
            debug!(
                provider = self.name(),
                query = index,
                count = found.len(),
                "query complete"
            );
            records.extend(found);
        }
        Ok(records)
    }
}

/// One-time setup with a provider-specific configuration.
pub trait Configure {
    /// Strongly-typed configuration for this provider.
    type Config;

    /// Apply the configuration. `None` leaves the provider as constructed.
    fn initialize(&mut self, config: Option<Self::Config>);
}

/// Blanket implementation of Provider for Arc-wrapped providers.
///
/// Lets a caller keep a handle on a provider after registering it.
impl<T: Provider + ?Sized> Provider for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        (**self).query(query)
    }

    fn discover(&self, queries: &[Query]) -> Result<Vec<Record>> {
        (**self).discover(queries)
    }
}
