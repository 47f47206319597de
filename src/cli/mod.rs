//! CLI commands for waypoint.

pub mod run;

pub use run::{cloud_clients, RunCommand, RunError, RunOptions};
