//! Discovery providers.
//!
//! - **static**: one record per query, straight from the template
//! - **ec2**: running hosts
//! - **ecs**: containers of running tasks, correlated to their hosts

pub mod ec2;
pub mod ecs;
pub mod static_provider;
pub mod traits;

pub use ec2::{Ec2Config, Ec2Provider, EC2_PROVIDER};
pub use ecs::{EcsConfig, EcsProvider, ECS_PROVIDER};
pub use static_provider::{StaticProvider, STATIC_PROVIDER};
pub use traits::{Configure, Provider};

use crate::cloud::CloudClients;
use crate::discovery::Registry;

/// Register every built-in provider, wiring the cloud ones to `clients`.
pub fn register_builtin(registry: &mut Registry, clients: &CloudClients) {
    registry.register(STATIC_PROVIDER, StaticProvider, None);
    registry.register(
        EC2_PROVIDER,
        Ec2Provider::default(),
        Some(Ec2Config::from(clients)),
    );
    registry.register(
        ECS_PROVIDER,
        EcsProvider::default(),
        Some(EcsConfig::from(clients)),
    );
}
