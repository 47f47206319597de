//! Unified error types for waypoint.
//!
//! Discovery is a periodic snapshot, so most failures are tolerated: a
//! failing query or provider is logged and contributes nothing to the
//! cycle. A cycle is aborted only outside discovery: when the query
//! documents cannot be loaded, which happens before any backend call, or
//! when the manifest cannot be written. `cli::RunError` records which.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for waypoint operations.
#[derive(Error, Debug)]
pub enum WaypointError {
    /// I/O errors reading query documents or writing the manifest.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or YAML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Malformed query document or settings.
    #[error("config error: {message}")]
    Config { message: String },

    /// A query names a provider that is not registered.
    #[error("unknown provider {name}")]
    UnknownProvider { name: String },

    /// The routing context (region) for a query could not be resolved.
    #[error("routing error: {message}")]
    Routing { message: String },

    /// A call to an external control-plane API failed.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// A correlation lookup found no downstream resource.
    #[error("correlation error: {message}")]
    Correlation { message: String },

    /// A provider's discover operation failed as a whole.
    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },
}

/// A specialized Result type for waypoint operations.
pub type Result<T> = std::result::Result<T, WaypointError>;

impl WaypointError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown provider error.
    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Self::UnknownProvider { name: name.into() }
    }

    /// Create a routing error.
    pub fn routing(message: impl Into<String>) -> Self {
        Self::Routing {
            message: message.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a correlation error.
    pub fn correlation(message: impl Into<String>) -> Self {
        Self::Correlation {
            message: message.into(),
        }
    }

    /// Create a provider-level error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<io::Error> for WaypointError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for WaypointError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for WaypointError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Logs the error as a warning and substitutes a default, which is how a
/// failing query or provider ends up contributing zero records.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "{} (skipping)", context);
                T::default()
            }
        }
    }
}

/// Exit codes for the waypoint binary.
pub mod exit_codes {
    /// Clean exit.
    pub const SUCCESS: i32 = 0;

    /// The query documents could not be loaded or validated.
    pub const CONFIG_ERROR: i32 = 1;

    /// The manifest could not be written.
    pub const WRITE_ERROR: i32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = WaypointError::storage(
            "/tmp/manifest.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/manifest.json"));
    }

    #[test]
    fn test_unknown_provider_display() {
        let err = WaypointError::unknown_provider("gce");
        assert_eq!(err.to_string(), "unknown provider gce");
    }

    #[test]
    fn test_backend_error_display() {
        let err = WaypointError::backend("throttled");
        assert_eq!(err.to_string(), "backend error: throttled");
    }

    #[test]
    fn test_correlation_error_display() {
        let err = WaypointError::correlation("could not find any reservations");
        assert_eq!(
            err.to_string(),
            "correlation error: could not find any reservations"
        );
    }

    #[test]
    fn test_provider_error_display() {
        let err = WaypointError::provider("ecs", "boom");
        assert_eq!(err.to_string(), "provider ecs failed: boom");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: WaypointError = io_err.into();
        assert!(matches!(err, WaypointError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: WaypointError = json_err.into();
        assert!(matches!(err, WaypointError::Serde { .. }));
    }

    #[test]
    fn test_from_serde_yaml_error() {
        let yaml_err = serde_yaml::from_str::<Vec<String>>("key: [unclosed").unwrap_err();
        let err: WaypointError = yaml_err.into();
        assert!(matches!(err, WaypointError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(WaypointError::backend("test"));
        let value = result.fail_open_default("test context");
        assert!(value.is_empty());
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<i32> = Ok(100);
        let value = result.fail_open_default("test context");
        assert_eq!(value, 100);
    }
}
