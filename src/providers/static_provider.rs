//! The static provider.
//!
//! Performs no discovery: each query yields exactly one record built from
//! its template. Use it to list fixed hosts alongside discovered ones.
//! Filters, sort and limit are ignored.

use crate::error::Result;
use crate::model::{Query, Record};
use crate::providers::{Configure, Provider};

/// Registry name and provenance of the static provider.
pub const STATIC_PROVIDER: &str = "static";

/// Zero-stage provider: one templated record per query.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProvider;

impl Provider for StaticProvider {
    fn name(&self) -> &'static str {
        STATIC_PROVIDER
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        let record = Record::default()
            .with_provider(STATIC_PROVIDER)
            .decorate(query.template());
        Ok(vec![record])
    }
}

impl Configure for StaticProvider {
    type Config = ();

    fn initialize(&mut self, _config: Option<()>) {}
}
