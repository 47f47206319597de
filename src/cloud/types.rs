//! Shapes returned by the cloud control-plane APIs.
//!
//! These mirror only the fields discovery reads. All of them deserialize
//! from camelCase JSON so an inventory snapshot can be written by hand.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Instance state name for a host that is up.
pub const INSTANCE_STATE_RUNNING: &str = "running";

/// Task status for a task whose containers are up.
pub const TASK_STATUS_RUNNING: &str = "RUNNING";

/// An equality predicate pushed down to the host-listing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendFilter {
    pub name: String,
    pub values: Vec<String>,
}

impl BackendFilter {
    /// A filter matching exactly one value.
    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

/// A compute host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    pub instance_id: String,
    pub private_dns_name: String,
    /// Lifecycle state name, e.g. `running` or `stopped`.
    pub state: Option<String>,
    pub launch_time: Option<DateTime<Utc>>,
    pub tags: BTreeMap<String, String>,
}

impl Instance {
    /// Whether the instance is in the `running` state.
    pub fn is_running(&self) -> bool {
        self.state.as_deref() == Some(INSTANCE_STATE_RUNNING)
    }
}

/// A group of hosts launched together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reservation {
    pub reservation_id: String,
    pub instances: Vec<Instance>,
}

/// A host registered into a container cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerInstance {
    pub container_instance_arn: String,
    /// Id of the host backing this container instance.
    pub ec2_instance_id: String,
}

/// A container inside a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub name: String,
    pub task_arn: String,
    pub container_arn: String,
}

/// A placed unit of containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub task_arn: String,
    /// Task group, e.g. `service:payments-api`.
    pub group: String,
    pub last_status: String,
    pub desired_status: String,
    pub container_instance_arn: String,
    pub started_at: Option<DateTime<Utc>>,
    pub containers: Vec<Container>,
}

impl Task {
    /// Whether the task last reported `RUNNING`.
    pub fn is_running(&self) -> bool {
        self.last_status == TASK_STATUS_RUNNING
    }
}

/// Who the control plane thinks we are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}

/// Arguments for listing the tasks placed on one container instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTasksRequest<'a> {
    pub cluster: Option<&'a str>,
    pub container_instance: &'a str,
    pub desired_status: &'a str,
}
