//! Placeholder backend for when no control-plane client is configured.

use crate::cloud::traits::{Ec2Api, EcsApi, IdentityApi, RegionSource};
use crate::cloud::types::{
    BackendFilter, CallerIdentity, ContainerInstance, ListTasksRequest, Reservation, Task,
};
use crate::error::{Result, WaypointError};

const NOT_CONFIGURED: &str = "no cloud control-plane client configured";

/// Fails every call with a backend error, so queries against cloud
/// providers are logged and skipped rather than aborting the cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

impl Ec2Api for Disconnected {
    fn describe_instances(
        &self,
        _region: &str,
        _filters: &[BackendFilter],
    ) -> Result<Vec<Reservation>> {
        Err(WaypointError::backend(NOT_CONFIGURED))
    }
}

impl EcsApi for Disconnected {
    fn list_container_instances(
        &self,
        _region: &str,
        _cluster: Option<&str>,
    ) -> Result<Vec<String>> {
        Err(WaypointError::backend(NOT_CONFIGURED))
    }

    fn list_tasks(&self, _region: &str, _request: &ListTasksRequest<'_>) -> Result<Vec<String>> {
        Err(WaypointError::backend(NOT_CONFIGURED))
    }

    fn describe_tasks(
        &self,
        _region: &str,
        _cluster: Option<&str>,
        _task_arns: &[String],
    ) -> Result<Vec<Task>> {
        Err(WaypointError::backend(NOT_CONFIGURED))
    }

    fn describe_container_instances(
        &self,
        _region: &str,
        _cluster: Option<&str>,
        _container_instance_arns: &[String],
    ) -> Result<Vec<ContainerInstance>> {
        Err(WaypointError::backend(NOT_CONFIGURED))
    }
}

impl IdentityApi for Disconnected {
    fn get_caller_identity(&self, _region: &str) -> Result<CallerIdentity> {
        Err(WaypointError::backend(NOT_CONFIGURED))
    }
}

impl RegionSource for Disconnected {
    fn region(&self) -> Result<String> {
        Err(WaypointError::backend("no instance metadata endpoint configured"))
    }
}
