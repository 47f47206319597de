//! In-memory cloud backend loaded from an inventory snapshot.
//!
//! Serves every capability trait from a JSON document describing hosts,
//! container instances and tasks per region. The binary uses it for
//! offline runs (`--inventory`); tests use it together with the call log
//! to assert exactly which lookups a provider made.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::cloud::traits::{Ec2Api, EcsApi, IdentityApi, RegionSource};
use crate::cloud::types::{
    BackendFilter, CallerIdentity, ContainerInstance, Instance, ListTasksRequest, Reservation,
    Task,
};
use crate::error::{Result, WaypointError};
use crate::util::{read_to_string_with_limit, MAX_DOCUMENT_SIZE};

/// Cluster used when a call names none.
pub const DEFAULT_CLUSTER: &str = "default";

/// Snapshot of one region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegionInventory {
    /// Identity returned by the credential check. Without one, every call
    /// into this region fails.
    pub identity: Option<CallerIdentity>,
    pub reservations: Vec<Reservation>,
    pub clusters: BTreeMap<String, ClusterInventory>,
}

/// Snapshot of one container cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterInventory {
    pub container_instances: Vec<ContainerInstance>,
    pub tasks: Vec<Task>,
}

/// The whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inventory {
    /// Answer for the ambient region lookup.
    pub default_region: Option<String>,
    pub regions: BTreeMap<String, RegionInventory>,
}

/// A control-plane operation, for the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DescribeInstances,
    ListContainerInstances,
    ListTasks,
    DescribeTasks,
    DescribeContainerInstances,
    GetCallerIdentity,
}

/// One logged call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub operation: Operation,
    pub region: String,
    /// Operation-specific arguments, rendered as strings.
    pub args: Vec<String>,
}

/// Inventory-backed implementation of every cloud capability.
#[derive(Debug, Default)]
pub struct InventoryBackend {
    inventory: Inventory,
    calls: Mutex<Vec<ApiCall>>,
}

impl InventoryBackend {
    /// Serve the given snapshot.
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Parse a JSON snapshot.
    pub fn from_json(content: &str) -> Result<Self> {
        let inventory: Inventory = serde_json::from_str(content)?;
        Ok(Self::new(inventory))
    }

    /// Load a JSON snapshot from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = read_to_string_with_limit(path, MAX_DOCUMENT_SIZE)?;
        Self::from_json(&content)
            .map_err(|e| WaypointError::config(format!("{}: {}", path.display(), e)))
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made to one operation.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Total number of calls made.
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn record(&self, operation: Operation, region: &str, args: Vec<String>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ApiCall {
                operation,
                region: region.to_string(),
                args,
            });
    }

    fn region_inventory(&self, region: &str) -> Result<&RegionInventory> {
        match self.inventory.regions.get(region) {
            Some(inventory) if inventory.identity.is_some() => Ok(inventory),
            _ => Err(WaypointError::backend(format!(
                "no credentials available for region {}",
                region
            ))),
        }
    }

    fn cluster(&self, region: &str, cluster: Option<&str>) -> Result<Option<&ClusterInventory>> {
        let name = cluster.unwrap_or(DEFAULT_CLUSTER);
        Ok(self.region_inventory(region)?.clusters.get(name))
    }
}

/// Evaluate one pushed-down filter against an instance.
fn instance_matches(instance: &Instance, filter: &BackendFilter) -> Result<bool> {
    let value = match filter.name.as_str() {
        "instance-id" => Some(instance.instance_id.as_str()),
        "private-dns-name" => Some(instance.private_dns_name.as_str()),
        "instance-state-name" => instance.state.as_deref(),
        name => match name.strip_prefix("tag:") {
            Some(key) => instance.tags.get(key).map(String::as_str),
            None => {
                return Err(WaypointError::backend(format!(
                    "the filter '{}' is invalid",
                    name
                )))
            }
        },
    };
    Ok(value.is_some_and(|v| filter.values.iter().any(|wanted| wanted == v)))
}

fn cluster_arg(cluster: Option<&str>) -> String {
    cluster.unwrap_or(DEFAULT_CLUSTER).to_string()
}

impl Ec2Api for InventoryBackend {
    fn describe_instances(
        &self,
        region: &str,
        filters: &[BackendFilter],
    ) -> Result<Vec<Reservation>> {
        self.record(
            Operation::DescribeInstances,
            region,
            filters
                .iter()
                .map(|f| format!("{}={}", f.name, f.values.join(",")))
                .collect(),
        );

        let mut reservations = Vec::new();
        for reservation in &self.region_inventory(region)?.reservations {
            let mut instances = Vec::new();
            for instance in &reservation.instances {
                let mut matched = true;
                for filter in filters {
                    if !instance_matches(instance, filter)? {
                        matched = false;
                        break;
                    }
                }
                if matched {
                    instances.push(instance.clone());
                }
            }
            if !instances.is_empty() {
                reservations.push(Reservation {
                    reservation_id: reservation.reservation_id.clone(),
                    instances,
                });
            }
        }
        Ok(reservations)
    }
}

impl EcsApi for InventoryBackend {
    fn list_container_instances(
        &self,
        region: &str,
        cluster: Option<&str>,
    ) -> Result<Vec<String>> {
        self.record(
            Operation::ListContainerInstances,
            region,
            vec![cluster_arg(cluster)],
        );
        let Some(cluster) = self.cluster(region, cluster)? else {
            return Err(WaypointError::backend("cluster not found"));
        };
        Ok(cluster
            .container_instances
            .iter()
            .map(|ci| ci.container_instance_arn.clone())
            .collect())
    }

    fn list_tasks(&self, region: &str, request: &ListTasksRequest<'_>) -> Result<Vec<String>> {
        self.record(
            Operation::ListTasks,
            region,
            vec![
                cluster_arg(request.cluster),
                request.container_instance.to_string(),
                request.desired_status.to_string(),
            ],
        );
        let Some(cluster) = self.cluster(region, request.cluster)? else {
            return Err(WaypointError::backend("cluster not found"));
        };
        Ok(cluster
            .tasks
            .iter()
            .filter(|task| task.container_instance_arn == request.container_instance)
            .filter(|task| task.desired_status == request.desired_status)
            .map(|task| task.task_arn.clone())
            .collect())
    }

    fn describe_tasks(
        &self,
        region: &str,
        cluster: Option<&str>,
        task_arns: &[String],
    ) -> Result<Vec<Task>> {
        let mut args = vec![cluster_arg(cluster)];
        args.extend(task_arns.iter().cloned());
        self.record(Operation::DescribeTasks, region, args);

        let Some(cluster) = self.cluster(region, cluster)? else {
            return Err(WaypointError::backend("cluster not found"));
        };
        Ok(task_arns
            .iter()
            .filter_map(|arn| cluster.tasks.iter().find(|task| &task.task_arn == arn))
            .cloned()
            .collect())
    }

    fn describe_container_instances(
        &self,
        region: &str,
        cluster: Option<&str>,
        container_instance_arns: &[String],
    ) -> Result<Vec<ContainerInstance>> {
        let mut args = vec![cluster_arg(cluster)];
        args.extend(container_instance_arns.iter().cloned());
        self.record(Operation::DescribeContainerInstances, region, args);

        let Some(cluster) = self.cluster(region, cluster)? else {
            return Err(WaypointError::backend("cluster not found"));
        };
        Ok(container_instance_arns
            .iter()
            .filter_map(|arn| {
                cluster
                    .container_instances
                    .iter()
                    .find(|ci| &ci.container_instance_arn == arn)
            })
            .cloned()
            .collect())
    }
}

impl IdentityApi for InventoryBackend {
    fn get_caller_identity(&self, region: &str) -> Result<CallerIdentity> {
        self.record(Operation::GetCallerIdentity, region, Vec::new());
        let region = self.region_inventory(region)?;
        Ok(region.identity.clone().unwrap_or_default())
    }
}

impl RegionSource for InventoryBackend {
    fn region(&self) -> Result<String> {
        self.inventory
            .default_region
            .clone()
            .ok_or_else(|| WaypointError::backend("inventory has no default region"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"{
        "defaultRegion": "us-east-1",
        "regions": {
            "us-east-1": {
                "identity": {"account": "123456789012", "arn": "arn:aws:sts::123456789012:assumed-role/discovery"},
                "reservations": [
                    {"reservationId": "r-1", "instances": [
                        {"instanceId": "i-1", "privateDnsName": "ip-10-0-0-1.ec2.internal", "state": "running", "tags": {"role": "web"}},
                        {"instanceId": "i-2", "privateDnsName": "ip-10-0-0-2.ec2.internal", "state": "stopped", "tags": {"role": "db"}}
                    ]}
                ],
                "clusters": {
                    "default": {
                        "containerInstances": [{"containerInstanceArn": "ci-1", "ec2InstanceId": "i-1"}],
                        "tasks": [
                            {"taskArn": "t-1", "group": "service:web", "lastStatus": "RUNNING", "desiredStatus": "RUNNING", "containerInstanceArn": "ci-1"},
                            {"taskArn": "t-2", "group": "service:web", "lastStatus": "STOPPED", "desiredStatus": "STOPPED", "containerInstanceArn": "ci-1"}
                        ]
                    }
                }
            },
            "eu-west-1": {}
        }
    }"#;

    fn backend() -> InventoryBackend {
        InventoryBackend::from_json(SNAPSHOT).unwrap()
    }

    #[test]
    fn test_describe_instances_applies_filters() {
        let backend = backend();

        let all = backend.describe_instances("us-east-1", &[]).unwrap();
        assert_eq!(all[0].instances.len(), 2);

        let web = backend
            .describe_instances("us-east-1", &[BackendFilter::equals("tag:role", "web")])
            .unwrap();
        assert_eq!(web.len(), 1);
        assert_eq!(web[0].instances[0].instance_id, "i-1");

        let none = backend
            .describe_instances("us-east-1", &[BackendFilter::equals("instance-id", "i-9")])
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_describe_instances_rejects_unknown_filter() {
        let result = backend().describe_instances("us-east-1", &[BackendFilter::equals("flavor", "x")]);
        assert!(matches!(result, Err(WaypointError::Backend { .. })));
    }

    #[test]
    fn test_region_without_identity_fails() {
        let backend = backend();
        assert!(backend.get_caller_identity("eu-west-1").is_err());
        assert!(backend.describe_instances("eu-west-1", &[]).is_err());
        assert!(backend.get_caller_identity("nowhere-1").is_err());
    }

    #[test]
    fn test_list_tasks_by_desired_status() {
        let backend = backend();
        let request = ListTasksRequest {
            cluster: None,
            container_instance: "ci-1",
            desired_status: "RUNNING",
        };
        assert_eq!(backend.list_tasks("us-east-1", &request).unwrap(), vec!["t-1"]);
    }

    #[test]
    fn test_unknown_cluster_is_backend_error() {
        let result = backend().list_container_instances("us-east-1", Some("missing"));
        assert!(matches!(result, Err(WaypointError::Backend { .. })));
    }

    #[test]
    fn test_call_log() {
        let backend = backend();
        backend.list_container_instances("us-east-1", None).unwrap();
        backend
            .describe_container_instances("us-east-1", None, &["ci-1".to_string()])
            .unwrap();

        assert_eq!(backend.total_calls(), 2);
        assert_eq!(backend.call_count(Operation::ListContainerInstances), 1);
        let calls = backend.calls();
        assert_eq!(calls[1].args, vec!["default", "ci-1"]);
    }

    #[test]
    fn test_region_source() {
        assert_eq!(RegionSource::region(&backend()).unwrap(), "us-east-1");
        assert!(RegionSource::region(&InventoryBackend::default()).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.json");
        fs::write(&path, SNAPSHOT).unwrap();

        let backend = InventoryBackend::load_from_path(&path).unwrap();
        assert!(backend.get_caller_identity("us-east-1").is_ok());

        fs::write(&path, "not json").unwrap();
        let err = InventoryBackend::load_from_path(&path).unwrap_err();
        assert!(matches!(err, WaypointError::Config { .. }));
    }
}
