//! The manifest snapshot written at the end of every discovery cycle.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaypointError};
use crate::model::Record;
use crate::util::write_atomic;

/// All records from one discovery cycle.
///
/// Written wholesale each cycle; there is no incremental update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub prompts: Vec<Record>,
}

impl Manifest {
    /// Build a manifest, stable-sorting records by provider name.
    ///
    /// Records from the same provider keep the order that provider produced.
    pub fn from_records(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| a.provider.cmp(&b.provider));
        Self { prompts: records }
    }

    /// Number of records in the manifest.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Whether the manifest has no records.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Serialize as pretty JSON with a one-space indent.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        Ok(buffer)
    }

    /// Atomically replace the manifest at `path`.
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let contents = self.to_json()?;
        write_atomic(path, &contents)
    }

    /// Read a manifest back from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| WaypointError::storage(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}
