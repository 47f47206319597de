//! Query routing and result aggregation.
//!
//! Validation is all-or-nothing: one query naming an unknown provider
//! rejects the whole batch before any provider runs. Execution is the
//! opposite: a provider that fails is logged and skipped, and the other
//! providers' records are still returned.

use std::path::Path;

use tracing::{debug, info};

use crate::discovery::Registry;
use crate::error::{FailOpen, Result};
use crate::model::{load_query_documents, Query, Record};

/// Queries grouped by provider name, validated against a registry.
///
/// Groups are kept in order of each provider's first appearance. Callers
/// must not rely on that order for output ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    groups: Vec<(String, Vec<Query>)>,
}

impl QueryPlan {
    /// Iterate over `(provider, queries)` groups.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[Query])> {
        self.groups
            .iter()
            .map(|(name, queries)| (name.as_str(), queries.as_slice()))
    }

    /// Number of provider groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no queries at all.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of queries across all groups.
    pub fn query_count(&self) -> usize {
        self.groups.iter().map(|(_, queries)| queries.len()).sum()
    }
}

/// Routes queries to providers and concatenates their records.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'r> {
    registry: &'r Registry,
}

impl<'r> Dispatcher<'r> {
    /// Create a dispatcher over a registry.
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Group queries by provider, rejecting the batch if any provider is unknown.
    pub fn plan(&self, queries: Vec<Query>) -> Result<QueryPlan> {
        let mut plan = QueryPlan::default();
        for query in queries {
            self.registry.resolve(&query.provider)?;
            match plan
                .groups
                .iter_mut()
                .find(|(name, _)| *name == query.provider)
            {
                Some((_, group)) => group.push(query),
                None => plan.groups.push((query.provider.clone(), vec![query])),
            }
        }
        Ok(plan)
    }

    /// Load query documents from disk and plan them.
    pub fn load<P: AsRef<Path>>(&self, paths: &[P]) -> Result<QueryPlan> {
        let queries = load_query_documents(paths)?;
        self.plan(queries)
    }

    /// Run every group through its provider.
    ///
    /// A provider-level error drops that provider's contribution and is
    /// logged; it never aborts the other groups.
    pub fn dispatch(&self, plan: &QueryPlan) -> Vec<Record> {
        let mut records = Vec::new();
        for (name, queries) in plan.groups() {
            let found = self
                .registry
                .resolve(name)
                .and_then(|provider| provider.discover(queries))
                .fail_open_default(&format!("provider {} failed", name));
            debug!(provider = name, count = found.len(), "provider complete");
            records.extend(found);
        }
        info!(
            providers = plan.len(),
            queries = plan.query_count(),
            records = records.len(),
            "discovery cycle complete"
        );
        records
    }

    /// Plan and dispatch in one step.
    pub fn discover(&self, queries: Vec<Query>) -> Result<Vec<Record>> {
        let plan = self.plan(queries)?;
        Ok(self.dispatch(&plan))
    }
}
