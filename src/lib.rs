//! waypoint - auto-discovery of connectable hosts and containers
//!
//! waypoint runs a batch of declarative queries against pluggable
//! providers, correlates what the cloud control plane reports into
//! connectable records, decorates them with per-query templates and writes
//! the result to a manifest that a terminal client can offer as prompts.

pub mod cli;
pub mod cloud;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod providers;
pub mod util;

pub use cloud::{CloudClients, InventoryBackend};
pub use config::Config;
pub use discovery::{Dispatcher, QueryCache, QueryPlan, Registry};
pub use error::{Result, WaypointError};
pub use model::{Manifest, Query, QueryDocument, Record, SortOrder};
pub use providers::{register_builtin, Configure, Provider};

// CLI commands
pub use cli::{RunCommand, RunOptions};
