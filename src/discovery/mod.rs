//! Discovery engine.
//!
//! This module holds everything between a list of queries and a list of
//! records:
//! - **registry**: provider name → initialized provider
//! - **dispatch**: validate and group queries, run each provider once per
//!   group, concatenate results
//! - **cache**: per-query memoization for correlation lookups
//! - **ordering**: stable sort and limit applied at the end of each query

pub mod cache;
pub mod dispatch;
pub mod ordering;
pub mod registry;

pub use cache::QueryCache;
pub use dispatch::{Dispatcher, QueryPlan};
pub use ordering::{apply_limit, finish_query, sort_records_by};
pub use registry::Registry;
