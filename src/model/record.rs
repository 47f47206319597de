//! The discoverable connection target ("prompt") and its decoration rules.
//!
//! A provider builds a fresh `Record` for every leaf it discovers, applies
//! the query's override template exactly once, labels it with the filters
//! that selected it, and stamps its own name as provenance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Conventional `kind` for an SSH-reachable host.
pub const KIND_HOST: &str = "host";

/// Conventional `kind` for a container reached through its host.
pub const KIND_CONTAINER: &str = "container";

/// One discoverable connection target.
///
/// Serialized with lowercase-camel names; empty strings, empty maps, false
/// flags and unset options are omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    /// Host to establish an SSH connection to. Display-only if `ip_address` is set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    /// SSH username.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Address to connect to instead of resolving `hostname`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    /// SSH port.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port: String,
    /// Short display name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Longer description of common use cases.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Command run immediately after connecting.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub jump_command: String,
    /// Command that starts the interactive session.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shell_command: String,
    /// Open string, conventionally `host` or `container`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Name of the provider that produced this record.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
    /// Selection metadata for downstream filtering.
    #[serde(skip_serializing_if = "is_unset_map")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Informational metadata for display.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Users and groups permitted to use this record.
    #[serde(skip_serializing_if = "is_unset_list")]
    pub principals: Option<Vec<String>>,
    /// Highlight this record in the downstream UI.
    #[serde(skip_serializing_if = "is_false")]
    pub featured: bool,
    /// Ask the user for a key when connecting.
    #[serde(skip_serializing_if = "is_false")]
    pub prompt_for_key: bool,
    /// Ask the user for a username when connecting.
    #[serde(skip_serializing_if = "is_false")]
    pub prompt_for_username: bool,
    /// Labels of another record to tunnel through, like SSH `ProxyJump`.
    #[serde(skip_serializing_if = "is_unset_map")]
    pub proxy_jump_selector: Option<BTreeMap<String, String>>,
    /// Tri-state: unset, explicitly true, or explicitly false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_terminal_on_exit: Option<bool>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_unset_map(value: &Option<BTreeMap<String, String>>) -> bool {
    value.as_ref().is_none_or(BTreeMap::is_empty)
}

fn is_unset_list(value: &Option<Vec<String>>) -> bool {
    value.as_ref().is_none_or(Vec::is_empty)
}

/// Overwrite `target` when `value` is non-empty.
fn override_string(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}

impl Record {
    /// Create a record of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the hostname.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the command run after connecting.
    pub fn with_jump_command(mut self, command: impl Into<String>) -> Self {
        self.jump_command = command.into();
        self
    }

    /// Add an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Apply an override template onto this record.
    ///
    /// - Non-empty template strings overwrite; empty ones never do.
    /// - A present `labels`, `principals` or `proxy_jump_selector` replaces
    ///   the discovered value wholesale (no merge).
    /// - `featured`, `prompt_for_key` and `prompt_for_username` are always
    ///   copied, so an empty template resets them to false.
    /// - `close_terminal_on_exit` is copied only when the template sets it.
    ///
    /// `provider` and `annotations` are never taken from the template.
    /// Without a template the record is returned unchanged.
    pub fn decorate(mut self, template: Option<&Record>) -> Self {
        let Some(template) = template else {
            return self;
        };

        override_string(&mut self.hostname, &template.hostname);
        override_string(&mut self.ip_address, &template.ip_address);
        override_string(&mut self.port, &template.port);
        override_string(&mut self.name, &template.name);
        override_string(&mut self.description, &template.description);
        override_string(&mut self.username, &template.username);
        override_string(&mut self.jump_command, &template.jump_command);
        override_string(&mut self.shell_command, &template.shell_command);
        override_string(&mut self.kind, &template.kind);

        if let Some(labels) = &template.labels {
            self.labels = Some(labels.clone());
        }
        if let Some(principals) = &template.principals {
            self.principals = Some(principals.clone());
        }

        self.featured = template.featured;
        self.prompt_for_key = template.prompt_for_key;
        self.prompt_for_username = template.prompt_for_username;

        if let Some(selector) = &template.proxy_jump_selector {
            self.proxy_jump_selector = Some(selector.clone());
        }
        if let Some(close) = template.close_terminal_on_exit {
            self.close_terminal_on_exit = Some(close);
        }

        self
    }

    /// Copy filter key/value pairs into `labels`.
    ///
    /// The label map is created on the first pair, so an empty iterator
    /// leaves an unset map unset.
    pub fn with_filter_labels<'a, I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in filters {
            self.labels
                .get_or_insert_with(BTreeMap::new)
                .insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Stamp provenance, overwriting anything a template may have set.
    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = provider.to_string();
        self
    }

    /// Look up a label value.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    /// Look up an annotation value.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}
