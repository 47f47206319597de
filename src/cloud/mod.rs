//! Cloud control-plane capabilities consumed by the cloud providers.
//!
//! Nothing here talks to a real API. The traits describe what discovery
//! needs; `InventoryBackend` serves them from a snapshot and
//! `Disconnected` refuses every call.

pub mod disconnected;
pub mod inventory;
pub mod session;
pub mod traits;
pub mod types;

use std::sync::Arc;

pub use disconnected::Disconnected;
pub use inventory::{InventoryBackend, Operation};
pub use session::{Session, SessionResolver};
pub use traits::{Ec2Api, EcsApi, IdentityApi, RegionSource};
pub use types::{
    BackendFilter, CallerIdentity, Container, ContainerInstance, Instance, ListTasksRequest,
    Reservation, Task, INSTANCE_STATE_RUNNING, TASK_STATUS_RUNNING,
};

/// The client handles shared by the cloud providers.
#[derive(Clone)]
pub struct CloudClients {
    pub ec2: Arc<dyn Ec2Api>,
    pub ecs: Arc<dyn EcsApi>,
    pub sessions: Arc<SessionResolver>,
}

impl CloudClients {
    /// Serve every capability from one backend.
    ///
    /// `default_region` is consulted before the backend's own region lookup.
    pub fn from_backend<B>(backend: Arc<B>, default_region: Option<String>) -> Self
    where
        B: Ec2Api + EcsApi + IdentityApi + RegionSource + 'static,
    {
        let sessions = SessionResolver::new(backend.clone())
            .with_default_region(default_region)
            .with_region_source(backend.clone());
        Self {
            ec2: backend.clone(),
            ecs: backend,
            sessions: Arc::new(sessions),
        }
    }

    /// Clients that fail every call.
    pub fn disconnected(default_region: Option<String>) -> Self {
        Self::from_backend(Arc::new(Disconnected), default_region)
    }
}

impl std::fmt::Debug for CloudClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClients")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
