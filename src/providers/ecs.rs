//! Container discovery.
//!
//! A query walks the cluster in four stages:
//!
//! 1. list the cluster's container instances
//! 2. list and describe the running tasks placed on each of them
//! 3. map each task's container instance to its host, then the host to
//!    its DNS name
//! 4. emit one record per container, reached by `docker exec` on that host
//!
//! Stage 3 is memoized for the duration of one query, so a host shared by
//! many tasks is looked up once. Non-running tasks are skipped silently;
//! a container instance that cannot be mapped to a host fails the query.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};

use crate::cloud::{
    BackendFilter, CloudClients, Container, ContainerInstance, Ec2Api, EcsApi, ListTasksRequest,
    SessionResolver, Task, TASK_STATUS_RUNNING,
};
use crate::discovery::{finish_query, QueryCache};
use crate::error::{Result, WaypointError};
use crate::model::{Query, Record, KIND_CONTAINER, REGION_FILTER};
use crate::providers::{Configure, Provider};

/// Registry name and provenance of the container provider.
pub const ECS_PROVIDER: &str = "ecs";

/// Annotation holding the task's start time.
pub const STARTED_AT: &str = "startedAt";

pub const CLUSTER_FILTER: &str = "cluster";
pub const TASK_GROUP_FILTER: &str = "task-group";
pub const CONTAINER_NAME_FILTER: &str = "container-name";

/// Filters copied into record labels, in label order.
const LABELED_FILTERS: [&str; 4] = [
    REGION_FILTER,
    CLUSTER_FILTER,
    TASK_GROUP_FILTER,
    CONTAINER_NAME_FILTER,
];

const SORTABLE: &[&str] = &[STARTED_AT];

/// Clients the container provider needs.
#[derive(Clone)]
pub struct EcsConfig {
    pub ecs: Arc<dyn EcsApi>,
    pub ec2: Arc<dyn Ec2Api>,
    pub sessions: Arc<SessionResolver>,
}

impl From<&CloudClients> for EcsConfig {
    fn from(clients: &CloudClients) -> Self {
        Self {
            ecs: clients.ecs.clone(),
            ec2: clients.ec2.clone(),
            sessions: clients.sessions.clone(),
        }
    }
}

/// Discovers containers of running tasks.
pub struct EcsProvider {
    ecs: Arc<dyn EcsApi>,
    ec2: Arc<dyn Ec2Api>,
    sessions: Arc<SessionResolver>,
}

/// Lookups shared by every task of one query.
#[derive(Debug, Default)]
struct Correlation {
    container_instances: QueryCache<ContainerInstance>,
    hostnames: QueryCache<String>,
}

/// Where one query runs.
#[derive(Clone, Copy)]
struct Scope<'q> {
    region: &'q str,
    cluster: Option<&'q str>,
}

impl EcsProvider {
    pub fn new(config: EcsConfig) -> Self {
        Self {
            ecs: config.ecs,
            ec2: config.ec2,
            sessions: config.sessions,
        }
    }

    fn running_tasks(&self, scope: Scope<'_>, container_instance: &str) -> Result<Vec<Task>> {
        let request = ListTasksRequest {
            cluster: scope.cluster,
            container_instance,
            desired_status: TASK_STATUS_RUNNING,
        };
        let task_arns = self.ecs.list_tasks(scope.region, &request)?;
        if task_arns.is_empty() {
            return Ok(Vec::new());
        }
        let tasks = self.ecs.describe_tasks(scope.region, scope.cluster, &task_arns)?;
        Ok(tasks.into_iter().filter(Task::is_running).collect())
    }

    /// Container instance ARN → host DNS name, memoized per query.
    fn hostname(
        &self,
        scope: Scope<'_>,
        container_instance_arn: &str,
        correlation: &mut Correlation,
    ) -> Result<String> {
        let container_instance = correlation.container_instances.get_or_try_insert_with(
            container_instance_arn,
            || {
                self.ecs
                    .describe_container_instances(
                        scope.region,
                        scope.cluster,
                        &[container_instance_arn.to_string()],
                    )?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        WaypointError::correlation(format!(
                            "could not find container instance {}",
                            container_instance_arn
                        ))
                    })
            },
        )?;

        let instance_id = container_instance.ec2_instance_id;
        correlation
            .hostnames
            .get_or_try_insert_with(&instance_id, || {
                let filters = [BackendFilter::equals("instance-id", instance_id.as_str())];
                let reservation = self
                    .ec2
                    .describe_instances(scope.region, &filters)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        WaypointError::correlation("could not find any reservations")
                    })?;
                let instance = reservation
                    .instances
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        WaypointError::correlation("could not find any instances")
                    })?;
                Ok(instance.private_dns_name)
            })
    }
}

impl Default for EcsProvider {
    /// A provider whose every query fails until it is initialized.
    fn default() -> Self {
        Self::new(EcsConfig::from(&CloudClients::disconnected(None)))
    }
}

impl std::fmt::Debug for EcsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcsProvider")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

/// Shell command that enters `container` on its host.
pub fn docker_exec_command(container: &Container) -> String {
    format!(
        "docker exec -it $(docker ps --filter \"label=com.amazonaws.ecs.container-name={}\" \
         --filter \"label=com.amazonaws.ecs.task-arn={}\" -q | head -n1)",
        container.name, container.task_arn
    )
}

/// Render a timestamp as `2015-03-26 19:54:00 +0000 UTC`.
///
/// Sub-second precision is printed only when present, with trailing
/// zeros trimmed.
pub fn format_started_at(started_at: &DateTime<Utc>) -> String {
    let seconds = started_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = started_at.nanosecond() % 1_000_000_000;
    let fraction = if nanos == 0 {
        String::new()
    } else {
        let digits = format!("{:09}", nanos);
        format!(".{}", digits.trim_end_matches('0'))
    };
    format!("{}{} +0000 UTC", seconds, fraction)
}

fn container_record(task: &Task, container: &Container, hostname: &str) -> Record {
    let record = Record::new(KIND_CONTAINER)
        .with_name(format!("{}/{}", task.group, container.name))
        .with_hostname(hostname)
        .with_jump_command(docker_exec_command(container));
    match &task.started_at {
        Some(started_at) => record.with_annotation(STARTED_AT, format_started_at(started_at)),
        None => record,
    }
}

fn labeled_filters(query: &Query) -> impl Iterator<Item = (&str, &str)> + '_ {
    LABELED_FILTERS
        .into_iter()
        .filter_map(move |key| query.filter(key).map(|value| (key, value)))
}

impl Provider for EcsProvider {
    fn name(&self) -> &'static str {
        ECS_PROVIDER
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        let session = self.sessions.session(query.filter(REGION_FILTER))?;
        let scope = Scope {
            region: &session.region,
            cluster: query.filter(CLUSTER_FILTER),
        };
        let task_group = query.filter(TASK_GROUP_FILTER);
        let container_name = query.filter(CONTAINER_NAME_FILTER);

        let mut correlation = Correlation::default();
        let mut records = Vec::new();

        for container_instance in self
            .ecs
            .list_container_instances(scope.region, scope.cluster)?
        {
            for task in self.running_tasks(scope, &container_instance)? {
                if task_group.is_some_and(|group| group != task.group) {
                    continue;
                }
                let hostname =
                    self.hostname(scope, &task.container_instance_arn, &mut correlation)?;

                for container in &task.containers {
                    if container_name.is_some_and(|name| name != container.name) {
                        continue;
                    }
                    records.push(
                        container_record(&task, container, &hostname)
                            .decorate(query.template())
                            .with_filter_labels(labeled_filters(query))
                            .with_provider(ECS_PROVIDER),
                    );
                }
            }
        }

        tracing::debug!(
            region = scope.region,
            records = records.len(),
            hosts = correlation.hostnames.len(),
            cache_hits = correlation.hostnames.hits() + correlation.container_instances.hits(),
            "container query correlated"
        );
        Ok(finish_query(records, query, SORTABLE))
    }
}

impl Configure for EcsProvider {
    type Config = EcsConfig;

    fn initialize(&mut self, config: Option<EcsConfig>) {
        if let Some(config) = config {
            *self = Self::new(config);
        }
    }
}
