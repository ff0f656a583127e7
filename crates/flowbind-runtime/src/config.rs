// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime configuration for the engine connection and worker pool.

use std::env;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default engine service address.
pub const DEFAULT_SERVICE_URL: &str = "localhost:7233";
/// Default engine namespace.
pub const DEFAULT_NAMESPACE: &str = "default";
/// Default number of worker threads.
pub const DEFAULT_WORKER_THREADS: usize = 4;
/// Default capacity of the pending-job queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Engine service address (default: "localhost:7233")
    pub service_url: String,
    /// Engine namespace (default: "default")
    pub namespace: String,
    /// Worker threads executing engine calls (default: 4)
    pub worker_threads: usize,
    /// Jobs that may wait for a worker before submitters back off (default: 256)
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            worker_threads: DEFAULT_WORKER_THREADS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `FLOWBIND_SERVICE_URL` - Engine service address (default: "localhost:7233")
    /// - `FLOWBIND_NAMESPACE` - Engine namespace (default: "default")
    /// - `FLOWBIND_WORKER_THREADS` - Worker threads (default: 4)
    /// - `FLOWBIND_QUEUE_CAPACITY` - Pending-job queue capacity (default: 256)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let service_url =
            lookup("FLOWBIND_SERVICE_URL").unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
        let namespace =
            lookup("FLOWBIND_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let worker_threads = parse_var(
            &lookup,
            "FLOWBIND_WORKER_THREADS",
            DEFAULT_WORKER_THREADS,
        )?;
        let queue_capacity = parse_var(
            &lookup,
            "FLOWBIND_QUEUE_CAPACITY",
            DEFAULT_QUEUE_CAPACITY,
        )?;

        let config = Self {
            service_url,
            namespace,
            worker_threads,
            queue_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine service address.
    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    /// Set the engine namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the number of worker threads.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Set the pending-job queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_url.trim().is_empty() {
            return Err(ConfigError::Empty("service_url"));
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Empty("namespace"));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Zero("worker_threads"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}
