//! File helpers shared by the query loader and the manifest writer.

use std::fs;
use std::path::Path;

use crate::error::{Result, WaypointError};

/// Maximum size of a query document that will be read into memory (4 MB).
pub const MAX_DOCUMENT_SIZE: u64 = 4 * 1024 * 1024;

/// Read a file into a string, refusing files larger than `max_size` bytes.
///
/// # Errors
///
/// Returns a storage error if the file cannot be read, or a config error if
/// it exceeds `max_size`.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| WaypointError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(WaypointError::config(format!(
            "{} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read_to_string(path).map_err(|e| WaypointError::storage(path, e))
}

/// Replace `path` with `contents` atomically.
///
/// Writes a sibling temp file, syncs it, then renames it over the target so
/// readers never observe a half-written file. The temp file is removed if
/// any step fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manifest".to_string());
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let result = write_then_rename(&temp_path, path, contents);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(temp_path: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(temp_path, contents).map_err(|e| WaypointError::storage(temp_path, e))?;

    let file = fs::File::open(temp_path).map_err(|e| WaypointError::storage(temp_path, e))?;
    file.sync_all()
        .map_err(|e| WaypointError::storage(temp_path, e))?;
    drop(file);

    fs::rename(temp_path, path).map_err(|e| WaypointError::storage(path, e))
}
