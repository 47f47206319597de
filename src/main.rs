//! waypoint - auto-discovery of connectable hosts and containers
//!
//! CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use waypoint::cli::{cloud_clients, RunCommand, RunOptions};
use waypoint::config::Config;
use waypoint::discovery::Registry;
use waypoint::error::exit_codes;
use waypoint::providers::register_builtin;

// =============================================================================
// CLI Definition
// =============================================================================

/// Discover hosts and containers and write them to a prompt manifest.
#[derive(Parser)]
#[command(name = "waypoint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $WAYPOINT_HOME/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run one discovery cycle and exit
    #[arg(long)]
    once: bool,

    /// Seconds between discovery cycles
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Serve the cloud providers from an inventory snapshot
    #[arg(long, value_name = "PATH")]
    inventory: Option<PathBuf>,

    /// Query documents followed by the manifest to write
    #[arg(value_name = "PATH", num_args = 2.., required = true)]
    paths: Vec<PathBuf>,
}

impl Cli {
    /// Apply command-line flags over the loaded configuration.
    fn apply_to(&self, config: &mut Config) {
        if self.once {
            config.discovery.once = true;
        }
        if let Some(interval) = self.interval {
            config.discovery.interval_seconds = interval;
        }
        if let Some(inventory) = &self.inventory {
            config.cloud.inventory = Some(inventory.clone());
        }
    }

    /// Split the positional paths into query documents and the manifest.
    fn split_paths(mut self) -> (Vec<PathBuf>, PathBuf) {
        let manifest = self.paths.pop().unwrap_or_default();
        (self.paths, manifest)
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("waypoint error: {}", e);
            return ExitCode::from(exit_codes::CONFIG_ERROR as u8);
        }
    };
    cli.apply_to(&mut config);
    init_tracing(&config.logging.level);

    let clients = match cloud_clients(&config.cloud) {
        Ok(clients) => clients,
        Err(e) => {
            tracing::error!(error = %e, "could not configure cloud clients");
            return ExitCode::from(exit_codes::CONFIG_ERROR as u8);
        }
    };
    let mut registry = Registry::new();
    register_builtin(&mut registry, &clients);

    let (queries, manifest) = cli.split_paths();
    let options = RunOptions::new(queries, manifest, &config);
    tracing::debug!(
        queries = options.queries.len(),
        manifest = %options.manifest.display(),
        once = options.once,
        interval = ?Duration::from_secs(config.discovery.interval_seconds),
        "starting discovery"
    );

    match RunCommand::new(&registry).run(&options) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            tracing::error!(error = %e, "discovery stopped");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_last_path_is_manifest() {
        let cli = Cli::parse_from(["waypoint", "a.yml", "b.json", "out.json"]);
        let (queries, manifest) = cli.split_paths();
        assert_eq!(queries, vec![PathBuf::from("a.yml"), PathBuf::from("b.json")]);
        assert_eq!(manifest, PathBuf::from("out.json"));
    }

    #[test]
    fn test_manifest_path_required() {
        assert!(Cli::try_parse_from(["waypoint", "a.yml"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "waypoint",
            "--once",
            "--interval",
            "5",
            "--inventory",
            "inv.json",
            "a.yml",
            "out.json",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert!(config.discovery.once);
        assert_eq!(config.discovery.interval_seconds, 5);
        assert_eq!(config.cloud.inventory, Some(PathBuf::from("inv.json")));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Cli::try_parse_from(["waypoint", "--interval", "0", "a.yml", "out.json"]).is_err());
    }
}
