//! Data model: queries in, records out, manifest on disk.

pub mod manifest;
pub mod query;
pub mod record;

pub use manifest::Manifest;
pub use query::{
    load_query_documents, DocumentFormat, Query, QueryDocument, SortOrder, REGION_FILTER,
};
pub use record::{Record, KIND_CONTAINER, KIND_HOST};
