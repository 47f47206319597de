//! Discovery queries and the documents they are loaded from.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, WaypointError};
use crate::model::Record;
use crate::util::{read_to_string_with_limit, MAX_DOCUMENT_SIZE};

/// Filter key that providers treat as routing context rather than a
/// backend predicate.
pub const REGION_FILTER: &str = "region";

/// Direction of a provider-side sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// `"desc"` is descending; anything else, including absent, is ascending.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("desc") => Self::Descending,
            _ => Self::Ascending,
        }
    }
}

/// One discovery request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Name of the registered provider that runs this query.
    pub provider: String,
    /// Provider-defined filters, passed through unopened.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub filters: BTreeMap<String, String>,
    /// Maximum number of records to return; 0 means no limit.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_zero"
    )]
    pub limit: usize,
    /// Provider-defined sort key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// `desc` for descending, anything else ascending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    /// Override template applied to every record this query produces.
    #[serde(default, rename = "prompt", skip_serializing_if = "Option::is_none")]
    pub template: Option<Record>,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// An explicit null reads the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Query {
    /// Create a query for the given provider.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Add a filter.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Set the limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the sort key and order.
    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_order: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(sort_order.into());
        self
    }

    /// Set the override template.
    pub fn with_template(mut self, template: Record) -> Self {
        self.template = Some(template);
        self
    }

    /// A filter value, treating an empty string as absent.
    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// The parsed sort direction.
    pub fn order(&self) -> SortOrder {
        SortOrder::parse(self.sort_order.as_deref())
    }

    /// The template, if any, for decoration.
    pub fn template(&self) -> Option<&Record> {
        self.template.as_ref()
    }
}

/// A query document: a top-level `queries` list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries: Vec<Query>,
}

/// Document encodings recognised by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Paths containing `.json` are JSON; everything else is YAML.
    pub fn detect(path: &Path) -> Self {
        if path.to_string_lossy().contains(".json") {
            Self::Json
        } else {
            Self::Yaml
        }
    }
}

impl QueryDocument {
    /// Parse a document in the given format. Blank input is an empty document.
    pub fn parse(content: &str, format: DocumentFormat) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let document = match format {
            DocumentFormat::Json => serde_json::from_str(content)?,
            DocumentFormat::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(document)
    }

    /// Read and parse one document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = read_to_string_with_limit(path, MAX_DOCUMENT_SIZE)?;
        Self::parse(&content, DocumentFormat::detect(path))
            .map_err(|e| WaypointError::config(format!("{}: {}", path.display(), e)))
    }
}

/// Load and concatenate the queries of several documents, in path order.
pub fn load_query_documents<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Query>> {
    let mut queries = Vec::new();
    for path in paths {
        let document = QueryDocument::load_from_path(path.as_ref())?;
        queries.extend(document.queries);
    }
    Ok(queries)
}
