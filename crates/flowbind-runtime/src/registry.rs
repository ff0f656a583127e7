// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process, activity and event registries.
//!
//! Each registry maps a name to a handle. The first registration of a name
//! wins; later registrations are rejected, never overwritten. Registries are
//! owned values shared by reference, so tests can build fresh ones instead
//! of resetting process-wide state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde_json::Value as EngineValue;
use tracing::debug;

use crate::engine::ProcessContext;

/// Body of an activity: engine arguments in, engine result out.
pub type ActivityHandler =
    Arc<dyn Fn(EngineValue) -> std::result::Result<EngineValue, String> + Send + Sync>;

/// Body of a process: runs with a context for activities, events and sleep.
pub type ProcessHandler = Arc<
    dyn Fn(&ProcessContext<'_>, EngineValue) -> std::result::Result<EngineValue, String>
        + Send
        + Sync,
>;

/// A named activity function.
#[derive(Clone)]
pub struct Activity {
    /// Registration name.
    pub name: String,
    /// Function body.
    pub handler: ActivityHandler,
}

impl Activity {
    /// Wrap a function as a named activity.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(EngineValue) -> std::result::Result<EngineValue, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(f),
        }
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity").field("name", &self.name).finish()
    }
}

/// A named process function.
#[derive(Clone)]
pub struct Process {
    /// Registration name.
    pub name: String,
    /// Function body.
    pub handler: ProcessHandler,
}

impl Process {
    /// Wrap a function as a named process.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ProcessContext<'_>, EngineValue) -> std::result::Result<EngineValue, String>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(f),
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process").field("name", &self.name).finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Concurrent name-to-handle map with first-registration-wins semantics.
pub struct Registry<H> {
    kind: &'static str,
    entries: DashMap<String, H>,
}

impl<H: Clone> Registry<H> {
    /// Create an empty registry; `kind` labels log lines.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
        }
    }

    /// Register `handle` under `name`.
    ///
    /// Returns `false` when the name is taken; the existing handle is kept.
    pub fn register(&self, name: impl Into<String>, handle: H) -> bool {
        let name = name.into();
        match self.entries.entry(name) {
            Entry::Occupied(entry) => {
                debug!(kind = self.kind, name = %entry.key(), "Already registered");
                false
            }
            Entry::Vacant(entry) => {
                debug!(kind = self.kind, name = %entry.key(), "Registered");
                entry.insert(handle);
                true
            }
        }
    }

    /// Handle registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<H> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove `name`; returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl<H> fmt::Debug for Registry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("size", &self.entries.len())
            .finish()
    }
}

// ============================================================================
// Registries
// ============================================================================

/// What is known about one registered process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRegistration {
    /// Process name.
    pub name: String,
    /// Short names of activities registered as `<process>.<activity>`.
    pub activities: Vec<String>,
    /// Event names the process accepts.
    pub events: Vec<String>,
}

/// The process, activity and event registries.
#[derive(Debug)]
pub struct Registries {
    /// Processes by name.
    pub processes: Registry<ProcessHandler>,
    /// Activities by name, including `<process>.<activity>` compound keys.
    pub activities: Registry<ActivityHandler>,
    /// Event names by process name.
    pub events: Registry<Arc<[String]>>,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

impl Registries {
    /// Create empty registries.
    pub fn new() -> Self {
        Self {
            processes: Registry::new("process"),
            activities: Registry::new("activity"),
            events: Registry::new("events"),
        }
    }

    /// Per process: its activity short names and event names.
    pub fn registered_workflows(&self) -> BTreeMap<String, ProcessRegistration> {
        let activity_names = self.activities.names();
        self.processes
            .names()
            .into_iter()
            .map(|name| {
                let prefix = format!("{}.", name);
                let activities = activity_names
                    .iter()
                    .filter_map(|a| a.strip_prefix(&prefix))
                    .map(str::to_string)
                    .collect();
                let events = self
                    .events
                    .lookup(&name)
                    .map(|events| events.to_vec())
                    .unwrap_or_default();
                let registration = ProcessRegistration {
                    name: name.clone(),
                    activities,
                    events,
                };
                (name, registration)
            })
            .collect()
    }

    /// Wipe every registry.
    pub fn clear_all(&self) {
        self.processes.clear();
        self.activities.clear();
        self.events.clear();
        debug!("Cleared all registries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo(name: &str) -> Activity {
        Activity::new(name, Ok)
    }

    #[test]
    fn test_first_registration_wins() {
        let registry: Registry<ActivityHandler> = Registry::new("activity");
        let first = echo("a1");
        let second = Activity::new("a1", |_| Ok(json!("second")));

        assert!(registry.register("a1", first.handler.clone()));
        assert!(!registry.register("a1", second.handler.clone()));

        let found = registry.lookup("a1").unwrap();
        assert!(Arc::ptr_eq(&found, &first.handler));
        assert_eq!(found(json!(1)).unwrap(), json!(1));
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_unregister_and_clear() {
        let registry: Registry<ActivityHandler> = Registry::new("activity");
        registry.register("a", echo("a").handler);
        registry.register("b", echo("b").handler);

        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert!(!registry.contains("a"));
        assert!(registry.contains("b"));

        registry.clear();
        assert_eq!(registry.size(), 0);
        assert!(registry.lookup("b").is_none());
    }

    #[test]
    fn test_registered_workflows() {
        let registries = Registries::new();
        let process = Process::new("order", |_, input| Ok(input));
        registries.processes.register("order", process.handler);
        registries.activities.register("order.charge", echo("charge").handler);
        registries.activities.register("order.ship", echo("ship").handler);
        registries.activities.register("orderly.audit", echo("audit").handler);
        registries.activities.register("standalone", echo("standalone").handler);
        registries
            .events
            .register("order", Arc::from(vec!["approval".to_string()]));

        let workflows = registries.registered_workflows();
        assert_eq!(workflows.len(), 1);
        assert_eq!(
            workflows["order"],
            ProcessRegistration {
                name: "order".to_string(),
                activities: vec!["charge".to_string(), "ship".to_string()],
                events: vec!["approval".to_string()],
            }
        );

        registries.clear_all();
        assert!(registries.registered_workflows().is_empty());
        assert_eq!(registries.activities.size(), 0);
    }
}
