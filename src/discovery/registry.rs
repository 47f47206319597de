//! Provider registry.
//!
//! Maps provider names to initialized providers. A registry is built once
//! at startup and passed by reference to the dispatcher; it is not
//! mutated while a cycle is running.

use std::collections::HashMap;

use crate::error::{Result, WaypointError};
use crate::providers::{Configure, Provider};

/// Name → provider table.
#[derive(Default)]
pub struct Registry {
    providers: HashMap<String, Box<dyn Provider>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize a provider with its configuration, then register it.
    ///
    /// Re-registering a name replaces the previous entry.
    pub fn register<P>(
        &mut self,
        name: impl Into<String>,
        mut provider: P,
        config: Option<P::Config>,
    ) where
        P: Provider + Configure + 'static,
    {
        provider.initialize(config);
        self.insert(name, provider);
    }

    /// Register an already-initialized provider.
    pub fn insert<P>(&mut self, name: impl Into<String>, provider: P)
    where
        P: Provider + 'static,
    {
        let name = name.into();
        if self.providers.insert(name.clone(), Box::new(provider)).is_some() {
            tracing::debug!(provider = %name, "replaced registered provider");
        }
    }

    /// Look up a provider by name.
    pub fn resolve(&self, name: &str) -> Result<&dyn Provider> {
        self.providers
            .get(name)
            .map(|provider| &**provider)
            .ok_or_else(|| WaypointError::unknown_provider(name))
    }

    /// Whether a provider is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Query, Record, KIND_HOST};

    #[derive(Default)]
    struct Named {
        hostname: String,
    }

    impl Provider for Named {
        fn name(&self) -> &'static str {
            "named"
        }

        fn query(&self, _query: &Query) -> Result<Vec<Record>> {
            Ok(vec![Record::new(KIND_HOST)
                .with_hostname(self.hostname.clone())
                .with_provider(self.name())])
        }
    }

    impl Configure for Named {
        type Config = String;

        fn initialize(&mut self, config: Option<String>) {
            if let Some(hostname) = config {
                self.hostname = hostname;
            }
        }
    }

    #[test]
    fn test_register_initializes_with_config() {
        let mut registry = Registry::new();
        registry.register("named", Named::default(), Some("example.com".to_string()));

        let records = registry
            .resolve("named")
            .unwrap()
            .discover(&[Query::new("named")])
            .unwrap();
        assert_eq!(records[0].hostname, "example.com");
    }

    #[test]
    fn test_register_without_config_is_noop() {
        let mut registry = Registry::new();
        let provider = Named {
            hostname: "preset".to_string(),
        };
        registry.register("named", provider, None);

        let records = registry.resolve("named").unwrap().query(&Query::new("named")).unwrap();
        assert_eq!(records[0].hostname, "preset");
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = Registry::new();
        registry.register("named", Named::default(), Some("first".to_string()));
        registry.register("named", Named::default(), Some("second".to_string()));

        assert_eq!(registry.len(), 1);
        let records = registry.resolve("named").unwrap().query(&Query::new("named")).unwrap();
        assert_eq!(records[0].hostname, "second");
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        let err = registry.resolve("gce").err().unwrap();
        assert!(matches!(err, WaypointError::UnknownProvider { .. }));
    }

    #[test]
    fn test_registries_are_independent() {
        let mut first = Registry::new();
        let second = Registry::new();
        first.register("named", Named::default(), None);

        assert!(first.contains("named"));
        assert!(!second.contains("named"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = Registry::new();
        registry.register("zeta", Named::default(), None);
        registry.register("alpha", Named::default(), None);
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
