//! Run command for waypoint.
//!
//! One cycle loads and validates the query documents, runs discovery and
//! replaces the manifest. The command repeats cycles on a fixed interval
//! unless asked to run once.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cloud::{CloudClients, InventoryBackend};
use crate::config::{CloudConfig, Config};
use crate::discovery::{Dispatcher, Registry};
use crate::error::{exit_codes, WaypointError};
use crate::model::Manifest;

/// Options for the run command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Query documents, read in order.
    pub queries: Vec<PathBuf>,
    /// Manifest to replace after every cycle.
    pub manifest: PathBuf,
    /// Stop after the first cycle.
    pub once: bool,
    /// Pause between cycles.
    pub interval: Duration,
}

impl RunOptions {
    /// Build options from paths and the loaded configuration.
    pub fn new(queries: Vec<PathBuf>, manifest: PathBuf, config: &Config) -> Self {
        Self {
            queries,
            manifest,
            once: config.discovery.once,
            interval: Duration::from_secs(config.discovery.interval_seconds),
        }
    }
}

/// A cycle failure, by the phase it happened in.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("could not load queries: {0}")]
    Load(#[source] WaypointError),

    #[error("could not write manifest: {0}")]
    Write(#[source] WaypointError),
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Load(_) => exit_codes::CONFIG_ERROR,
            RunError::Write(_) => exit_codes::WRITE_ERROR,
        }
    }
}

/// Build the cloud clients described by `config`.
///
/// With an inventory path the cloud providers are served from that
/// snapshot. Without one they are disconnected and every cloud query is
/// logged and skipped.
pub fn cloud_clients(config: &CloudConfig) -> Result<CloudClients, WaypointError> {
    if let Some(endpoint) = &config.endpoint {
        debug!(endpoint = %endpoint, "control-plane endpoint configured");
    }
    match &config.inventory {
        Some(path) => {
            let backend = InventoryBackend::load_from_path(path)?;
            info!(path = %path.display(), "serving cloud providers from inventory");
            Ok(CloudClients::from_backend(
                Arc::new(backend),
                config.region.clone(),
            ))
        }
        None => {
            info!("no cloud client configured, ec2 and ecs queries will be skipped");
            Ok(CloudClients::disconnected(config.region.clone()))
        }
    }
}

/// The run command implementation.
pub struct RunCommand<'r> {
    registry: &'r Registry,
}

impl<'r> RunCommand<'r> {
    /// Create a run command over a populated registry.
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Run one discovery cycle and return the number of records written.
    pub fn run_cycle(&self, options: &RunOptions) -> Result<usize, RunError> {
        let dispatcher = Dispatcher::new(self.registry);
        let plan = dispatcher.load(&options.queries).map_err(RunError::Load)?;

        let manifest = Manifest::from_records(dispatcher.dispatch(&plan));
        manifest
            .write_to_path(&options.manifest)
            .map_err(RunError::Write)?;

        debug!(
            count = manifest.len(),
            path = %options.manifest.display(),
            "wrote manifest"
        );
        Ok(manifest.len())
    }

    /// Run cycles until one fails, or once when `options.once` is set.
    pub fn run(&self, options: &RunOptions) -> Result<(), RunError> {
        loop {
            self.run_cycle(options)?;
            if options.once {
                return Ok(());
            }
            std::thread::sleep(options.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Operation;
    use crate::providers::register_builtin;
    use std::fs;
    use tempfile::TempDir;

    const INVENTORY: &str = r#"{
        "defaultRegion": "us-east-1",
        "regions": {
            "us-east-1": {
                "identity": {"account": "123456789012"},
                "reservations": [
                    {
                        "reservationId": "r-1",
                        "instances": [
                            {
                                "instanceId": "i-1",
                                "privateDnsName": "ip-10-0-0-1.ec2.internal",
                                "state": "running",
                                "launchTime": "2021-03-01T10:00:00Z",
                                "tags": {"Role": "bastion"}
                            }
                        ]
                    }
                ],
                "clusters": {
                    "default": {
                        "containerInstances": [
                            {"containerInstanceArn": "ci-1", "ec2InstanceId": "i-1"}
                        ],
                        "tasks": [
                            {
                                "taskArn": "task/1",
                                "group": "service:api",
                                "lastStatus": "RUNNING",
                                "desiredStatus": "RUNNING",
                                "containerInstanceArn": "ci-1",
                                "containers": [{"name": "app", "taskArn": "task/1"}]
                            }
                        ]
                    }
                }
            }
        }
    }"#;

    struct Fixture {
        dir: TempDir,
        backend: Arc<InventoryBackend>,
        registry: Registry,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let backend = Arc::new(InventoryBackend::from_json(INVENTORY).unwrap());
            let clients = CloudClients::from_backend(backend.clone(), None);
            let mut registry = Registry::new();
            register_builtin(&mut registry, &clients);
            Self {
                dir,
                backend,
                registry,
            }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn options(&self, queries: Vec<PathBuf>) -> RunOptions {
            RunOptions {
                queries,
                manifest: self.dir.path().join("manifest.json"),
                once: true,
                interval: Duration::from_millis(1),
            }
        }
    }

    #[test]
    fn test_cycle_writes_sorted_manifest() {
        let fixture = Fixture::new();
        let yaml = fixture.write(
            "queries.yml",
            r#"
queries:
  - provider: static
    prompt:
      name: Jump box
      hostname: jump.example.com
  - provider: ecs
  - provider: ec2
    filters:
      tag:Role: bastion
"#,
        );
        let options = fixture.options(vec![yaml]);

        let count = RunCommand::new(&fixture.registry)
            .run_cycle(&options)
            .unwrap();
        assert_eq!(count, 3);

        let manifest = Manifest::load_from_path(&options.manifest).unwrap();
        let providers: Vec<&str> = manifest
            .prompts
            .iter()
            .map(|r| r.provider.as_str())
            .collect();
        assert_eq!(providers, vec!["ec2", "ecs", "static"]);
        assert_eq!(manifest.prompts[1].name, "service:api/app");
        assert_eq!(manifest.prompts[1].hostname, "ip-10-0-0-1.ec2.internal");
    }

    #[test]
    fn test_documents_concatenated_across_formats() {
        let fixture = Fixture::new();
        let yaml = fixture.write(
            "a.yaml",
            "queries:\n  - provider: static\n    prompt:\n      name: one\n",
        );
        let json = fixture.write(
            "b.json",
            r#"{"queries": [{"provider": "static", "prompt": {"name": "two"}}]}"#,
        );
        let options = fixture.options(vec![yaml, json]);

        RunCommand::new(&fixture.registry).run(&options).unwrap();

        let manifest = Manifest::load_from_path(&options.manifest).unwrap();
        let names: Vec<&str> = manifest.prompts.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_unknown_provider_fails_before_any_backend_call() {
        let fixture = Fixture::new();
        let yaml = fixture.write(
            "queries.yml",
            "queries:\n  - provider: ecs\n  - provider: gce\n",
        );
        let options = fixture.options(vec![yaml]);

        let err = RunCommand::new(&fixture.registry)
            .run_cycle(&options)
            .unwrap_err();

        assert!(matches!(
            err,
            RunError::Load(WaypointError::UnknownProvider { .. })
        ));
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(fixture.backend.total_calls(), 0);
        assert!(!options.manifest.exists());
    }

    #[test]
    fn test_missing_query_document_is_load_error() {
        let fixture = Fixture::new();
        let options = fixture.options(vec![fixture.dir.path().join("missing.yml")]);

        let err = RunCommand::new(&fixture.registry)
            .run_cycle(&options)
            .unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_unwritable_manifest_is_write_error() {
        let fixture = Fixture::new();
        let yaml = fixture.write("queries.yml", "queries:\n  - provider: static\n");
        let mut options = fixture.options(vec![yaml]);
        options.manifest = fixture.dir.path().join("missing-dir").join("manifest.json");

        let err = RunCommand::new(&fixture.registry)
            .run_cycle(&options)
            .unwrap_err();
        assert!(matches!(err, RunError::Write(_)));
        assert_eq!(err.exit_code(), exit_codes::WRITE_ERROR);
    }

    #[test]
    fn test_loop_ends_on_either_phase_failure() {
        let fixture = Fixture::new();
        let command = RunCommand::new(&fixture.registry);

        let mut options = fixture.options(vec![fixture.dir.path().join("missing.yml")]);
        options.once = false;
        let err = command.run(&options).unwrap_err();
        assert!(matches!(err, RunError::Load(WaypointError::Storage { .. })));
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);

        let yaml = fixture.write("queries.yml", "queries:\n  - provider: static\n");
        let mut options = fixture.options(vec![yaml]);
        options.once = false;
        options.manifest = fixture.dir.path().join("missing-dir").join("manifest.json");
        let err = command.run(&options).unwrap_err();
        assert!(matches!(err, RunError::Write(WaypointError::Storage { .. })));
        assert_eq!(err.exit_code(), exit_codes::WRITE_ERROR);
    }

    #[test]
    fn test_failing_cloud_query_still_writes_manifest() {
        let fixture = Fixture::new();
        let yaml = fixture.write(
            "queries.yml",
            r#"
queries:
  - provider: ec2
    filters:
      region: eu-central-1
  - provider: static
"#,
        );
        let options = fixture.options(vec![yaml]);

        let count = RunCommand::new(&fixture.registry)
            .run_cycle(&options)
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(fixture.backend.call_count(Operation::GetCallerIdentity), 1);
    }

    #[test]
    fn test_cycles_reuse_sessions() {
        let fixture = Fixture::new();
        let yaml = fixture.write("queries.yml", "queries:\n  - provider: ecs\n");
        let options = fixture.options(vec![yaml]);
        let command = RunCommand::new(&fixture.registry);

        command.run_cycle(&options).unwrap();
        command.run_cycle(&options).unwrap();

        assert_eq!(fixture.backend.call_count(Operation::GetCallerIdentity), 1);
        assert_eq!(fixture.backend.call_count(Operation::DescribeInstances), 2);
    }

    #[test]
    fn test_cloud_clients_from_inventory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.json");
        fs::write(&path, INVENTORY).unwrap();
        let config = CloudConfig {
            inventory: Some(path),
            ..CloudConfig::default()
        };

        let clients = cloud_clients(&config).unwrap();
        let session = clients.sessions.session(None).unwrap();
        assert_eq!(session.region, "us-east-1");
        assert_eq!(session.identity.account, "123456789012");
    }

    #[test]
    fn test_cloud_clients_without_inventory_are_disconnected() {
        let config = CloudConfig {
            region: Some("us-east-1".to_string()),
            ..CloudConfig::default()
        };

        let clients = cloud_clients(&config).unwrap();
        assert!(clients.sessions.session(None).is_err());
    }

    #[test]
    fn test_cloud_clients_bad_inventory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.json");
        fs::write(&path, "{not json").unwrap();
        let config = CloudConfig {
            inventory: Some(path),
            ..CloudConfig::default()
        };

        assert!(cloud_clients(&config).is_err());
    }
}
