//! Host discovery.
//!
//! One query is one `describe_instances` call. The `region` filter picks
//! the session; every other filter is pushed down to the backend as an
//! equality predicate. Only running hosts become records.

use std::sync::Arc;

use chrono::SecondsFormat;

use crate::cloud::{BackendFilter, CloudClients, Ec2Api, Instance, SessionResolver};
use crate::discovery::finish_query;
use crate::error::Result;
use crate::model::{Query, Record, KIND_HOST, REGION_FILTER};
use crate::providers::{Configure, Provider};

/// Registry name and provenance of the host provider.
pub const EC2_PROVIDER: &str = "ec2";

/// Annotation holding the host's launch time (RFC 3339).
pub const LAUNCH_TIME: &str = "launchTime";

const SORTABLE: &[&str] = &[LAUNCH_TIME];

/// Clients the host provider needs.
#[derive(Clone)]
pub struct Ec2Config {
    pub ec2: Arc<dyn Ec2Api>,
    pub sessions: Arc<SessionResolver>,
}

impl From<&CloudClients> for Ec2Config {
    fn from(clients: &CloudClients) -> Self {
        Self {
            ec2: clients.ec2.clone(),
            sessions: clients.sessions.clone(),
        }
    }
}

/// Discovers running hosts.
pub struct Ec2Provider {
    ec2: Arc<dyn Ec2Api>,
    sessions: Arc<SessionResolver>,
}

impl Ec2Provider {
    pub fn new(config: Ec2Config) -> Self {
        Self {
            ec2: config.ec2,
            sessions: config.sessions,
        }
    }

    fn pushed_down_filters(query: &Query) -> Vec<BackendFilter> {
        query
            .filters
            .iter()
            .filter(|(key, _)| key.as_str() != REGION_FILTER)
            .map(|(key, value)| BackendFilter::equals(key, value))
            .collect()
    }
}

impl Default for Ec2Provider {
    /// A provider whose every query fails until it is initialized.
    fn default() -> Self {
        Self::new(Ec2Config::from(&CloudClients::disconnected(None)))
    }
}

impl std::fmt::Debug for Ec2Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ec2Provider")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

fn host_record(instance: &Instance) -> Record {
    let record = Record::new(KIND_HOST)
        .with_name(instance.instance_id.as_str())
        .with_hostname(instance.private_dns_name.as_str());
    match instance.launch_time {
        Some(launched) => record.with_annotation(
            LAUNCH_TIME,
            launched.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        None => record,
    }
}

impl Provider for Ec2Provider {
    fn name(&self) -> &'static str {
        EC2_PROVIDER
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        let session = self.sessions.session(query.filter(REGION_FILTER))?;
        let filters = Self::pushed_down_filters(query);
        let reservations = self.ec2.describe_instances(&session.region, &filters)?;

        let records = reservations
            .iter()
            .flat_map(|reservation| reservation.instances.iter())
            .filter(|instance| instance.is_running())
            .map(|instance| {
                host_record(instance)
                    .decorate(query.template())
                    .with_filter_labels(
                        query
                            .filters
                            .iter()
                            .map(|(key, value)| (key.as_str(), value.as_str())),
                    )
                    .with_provider(EC2_PROVIDER)
            })
            .collect();

        Ok(finish_query(records, query, SORTABLE))
    }
}

impl Configure for Ec2Provider {
    type Config = Ec2Config;

    fn initialize(&mut self, config: Option<Ec2Config>) {
        if let Some(config) = config {
            *self = Self::new(config);
        }
    }
}
