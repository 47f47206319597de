//! Capability traits for the cloud control plane.
//!
//! Providers depend on these rather than on a concrete SDK. Each call is a
//! blocking round-trip; pagination, if any, is handled behind the trait so
//! callers always see one complete sequence.

use crate::cloud::types::{
    BackendFilter, CallerIdentity, ContainerInstance, ListTasksRequest, Reservation, Task,
};
use crate::error::Result;

/// Host listing.
pub trait Ec2Api: Send + Sync {
    /// List reservations whose instances match every filter.
    fn describe_instances(&self, region: &str, filters: &[BackendFilter])
        -> Result<Vec<Reservation>>;
}

/// Container cluster listing.
pub trait EcsApi: Send + Sync {
    /// List container instance ARNs, in the default cluster when `cluster` is `None`.
    fn list_container_instances(&self, region: &str, cluster: Option<&str>)
        -> Result<Vec<String>>;

    /// List the ARNs of tasks placed on one container instance.
    fn list_tasks(&self, region: &str, request: &ListTasksRequest<'_>) -> Result<Vec<String>>;

    /// Describe tasks by ARN.
    fn describe_tasks(
        &self,
        region: &str,
        cluster: Option<&str>,
        task_arns: &[String],
    ) -> Result<Vec<Task>>;

    /// Describe container instances by ARN.
    fn describe_container_instances(
        &self,
        region: &str,
        cluster: Option<&str>,
        container_instance_arns: &[String],
    ) -> Result<Vec<ContainerInstance>>;
}

/// Identity check, used once per region to validate credentials.
pub trait IdentityApi: Send + Sync {
    fn get_caller_identity(&self, region: &str) -> Result<CallerIdentity>;
}

/// Ambient region lookup (e.g. instance metadata) used when neither the
/// query nor the settings name one.
pub trait RegionSource: Send + Sync {
    fn region(&self) -> Result<String>;
}
