//! Region resolution and per-region session cache.
//!
//! A query's region comes from its `region` filter, else the configured
//! default, else the ambient `RegionSource`. The first time a region is
//! used its credentials are checked with one identity call; the resulting
//! session is kept for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::cloud::traits::{IdentityApi, RegionSource};
use crate::cloud::types::CallerIdentity;
use crate::error::{Result, WaypointError};

/// An authenticated region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub region: String,
    pub identity: CallerIdentity,
}

/// Resolves routing context and caches one session per region.
pub struct SessionResolver {
    identity: Arc<dyn IdentityApi>,
    default_region: Option<String>,
    region_source: Option<Arc<dyn RegionSource>>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionResolver {
    /// Create a resolver with no default region and no ambient source.
    pub fn new(identity: Arc<dyn IdentityApi>) -> Self {
        Self {
            identity,
            default_region: None,
            region_source: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Region used when a query does not name one.
    pub fn with_default_region(mut self, region: Option<String>) -> Self {
        self.default_region = region.filter(|r| !r.is_empty());
        self
    }

    /// Last-resort region lookup.
    pub fn with_region_source(mut self, source: Arc<dyn RegionSource>) -> Self {
        self.region_source = Some(source);
        self
    }

    /// Pick the region for a query.
    pub fn resolve_region(&self, requested: Option<&str>) -> Result<String> {
        if let Some(region) = requested.filter(|r| !r.is_empty()) {
            return Ok(region.to_string());
        }
        if let Some(region) = &self.default_region {
            return Ok(region.clone());
        }

        let ambient = match &self.region_source {
            Some(source) => source.region(),
            None => Err(WaypointError::routing("no region source configured")),
        };
        match ambient {
            Ok(region) if !region.is_empty() => Ok(region),
            Ok(_) => Err(WaypointError::routing(
                "could not load region from query, settings, or metadata: empty region",
            )),
            Err(e) => Err(WaypointError::routing(format!(
                "could not load region from query, settings, or metadata: {}",
                e
            ))),
        }
    }

    /// Resolve the region and return its session, authenticating on first use.
    pub fn session(&self, requested: Option<&str>) -> Result<Session> {
        let region = self.resolve_region(requested)?;

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(&region) {
            return Ok(session.clone());
        }

        let identity = self.identity.get_caller_identity(&region)?;
        debug!(region = %region, arn = %identity.arn, "authenticated");

        let session = Session {
            region: region.clone(),
            identity,
        };
        sessions.insert(region, session.clone());
        Ok(session)
    }

    /// Number of regions authenticated so far.
    pub fn cached_regions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver")
            .field("default_region", &self.default_region)
            .field("cached_regions", &self.cached_regions())
            .finish()
    }
}
