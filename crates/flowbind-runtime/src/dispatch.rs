// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow runtime: registration and dispatch to the engine.
//!
//! Every dispatch operation suspends the async caller, runs the blocking
//! engine call on a pool worker, and resumes the caller exactly once with the
//! converted result or a [`RuntimeError`]. Values are converted to and from
//! the engine representation on the worker.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::engine::{EmbeddedEngine, Engine};
use crate::error::{EngineError, Result, RuntimeError};
use crate::pool::WorkerPool;
use crate::registry::{Activity, Process, ProcessRegistration, Registries};
use crate::value::Value;

/// Name of the activity dispatch operation.
pub const CALL_ACTIVITY: &str = "callActivity";
/// Name of the rewritten activity dispatch operation.
pub const INVOKE_ACTIVITY: &str = "invokeActivity";
/// Name of the process start operation.
pub const START_PROCESS: &str = "startProcess";
/// Name of the event delivery operation.
pub const SEND_EVENT: &str = "sendEvent";

/// Registries, worker pool and the single engine handle.
pub struct WorkflowRuntime {
    config: RuntimeConfig,
    registries: Arc<Registries>,
    pool: WorkerPool,
    client: OnceCell<Arc<dyn Engine>>,
    closed: AtomicBool,
}

impl WorkflowRuntime {
    /// Create a runtime with fresh registries.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        Self::with_registries(config, Arc::new(Registries::new()))
    }

    /// Create a runtime from `FLOWBIND_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(RuntimeConfig::from_env()?)
    }

    /// Create a runtime sharing existing registries.
    pub fn with_registries(config: RuntimeConfig, registries: Arc<Registries>) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.worker_threads, config.queue_capacity)?;
        Ok(Self {
            config,
            registries,
            pool,
            client: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The registries this runtime dispatches from.
    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    // ========================================================================
    // Engine client lifecycle
    // ========================================================================

    /// Create the engine handle for the configured service and namespace.
    pub fn init_client(&self) -> Result<()> {
        let engine = EmbeddedEngine::new(&self.config, Arc::clone(&self.registries));
        self.init_client_with(Arc::new(engine))
    }

    /// Install an engine binding as this runtime's single handle.
    pub fn init_client_with(&self, engine: Arc<dyn Engine>) -> Result<()> {
        self.client
            .set(engine)
            .map_err(|_| RuntimeError::ClientAlreadyInitialized)?;
        info!(
            service_url = %self.config.service_url,
            namespace = %self.config.namespace,
            "Engine client initialized"
        );
        Ok(())
    }

    /// Close the engine handle.
    ///
    /// Best-effort: a failing close is logged, not returned, and the handle
    /// is never replaced. Dispatch afterwards fails with
    /// [`RuntimeError::ClientClosed`].
    pub fn close_client(&self) -> Result<()> {
        let engine = self.client.get().ok_or(RuntimeError::ClientNotInitialized)?;
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = engine.close() {
            warn!(error = %e, "Engine client did not close cleanly");
        } else {
            info!("Engine client closed");
        }
        Ok(())
    }

    fn engine(&self) -> Result<Arc<dyn Engine>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RuntimeError::ClientClosed);
        }
        self.client
            .get()
            .cloned()
            .ok_or(RuntimeError::ClientNotInitialized)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a process with its activities and accepted event names.
    ///
    /// Activities are registered as `<process>.<activity>`. This is the only
    /// registration path that reports a duplicate name.
    pub fn register_process(
        &self,
        process: &Process,
        activities: &[Activity],
        events: &[&str],
    ) -> Result<()> {
        if !self
            .registries
            .processes
            .register(&process.name, Arc::clone(&process.handler))
        {
            return Err(RuntimeError::DuplicateRegistration(process.name.clone()));
        }

        for activity in activities {
            let key = format!("{}.{}", process.name, activity.name);
            self.registries
                .activities
                .register(key, Arc::clone(&activity.handler));
        }
        if !events.is_empty() {
            let events: Vec<String> = events.iter().map(|e| e.to_string()).collect();
            self.registries
                .events
                .register(&process.name, Arc::from(events));
        }

        info!(
            process = %process.name,
            activities = activities.len(),
            events = events.len(),
            "Process registered"
        );
        Ok(())
    }

    /// Register a service's activity table, keyed by the names its rewritten
    /// calls use. Returns how many names were new.
    pub fn register_service_activities(
        &self,
        activities: impl IntoIterator<Item = Activity>,
    ) -> usize {
        let added = activities
            .into_iter()
            .filter(|a| self.registries.activities.register(&a.name, Arc::clone(&a.handler)))
            .count();
        debug!(added, "Service activities registered");
        added
    }

    /// Per process name: activity short names and event names.
    pub fn registered_workflows(&self) -> BTreeMap<String, ProcessRegistration> {
        self.registries.registered_workflows()
    }

    /// Wipe every registry.
    pub fn clear_registry(&self) {
        self.registries.clear_all();
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Execute an activity with named arguments.
    ///
    /// The activity is registered under its own name on first use.
    pub async fn call_activity(&self, activity: &Activity, args: Value) -> Result<Value> {
        self.registries
            .activities
            .register(&activity.name, Arc::clone(&activity.handler));

        let name = activity.name.clone();
        self.dispatch(CALL_ACTIVITY, move |engine| {
            let args = args.to_engine_object()?;
            let result = engine
                .execute_activity(&name, args)
                .map_err(engine_error(CALL_ACTIVITY))?;
            Ok(Value::from_engine(result))
        })
        .await
    }

    /// Execute a registered activity with positional arguments.
    ///
    /// Target of rewritten activity calls; the activity must already be
    /// registered, usually through [`Self::register_service_activities`].
    pub async fn invoke_activity(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        if !self.registries.activities.contains(name) {
            return Err(RuntimeError::ActivityNotFound(name.to_string()));
        }

        let name = name.to_string();
        self.dispatch(INVOKE_ACTIVITY, move |engine| {
            let args = Value::Array(args).to_engine()?;
            let result = engine
                .execute_activity(&name, args)
                .map_err(engine_error(INVOKE_ACTIVITY))?;
            Ok(Value::from_engine(result))
        })
        .await
    }

    /// Start a process; returns the workflow id.
    ///
    /// The id comes from the input's `id` field when present. The process is
    /// registered on first use.
    pub async fn start_process(&self, process: &Process, input: Value) -> Result<String> {
        self.registries
            .processes
            .register(&process.name, Arc::clone(&process.handler));

        let name = process.name.clone();
        self.dispatch(START_PROCESS, move |engine| {
            let input = input.to_engine_object()?;
            engine
                .start_process(&name, input)
                .map_err(engine_error(START_PROCESS))
        })
        .await
    }

    /// Send event data to a running instance of `process`.
    ///
    /// The data's `id` field names the workflow.
    pub async fn send_event(&self, process: &Process, data: Value) -> Result<bool> {
        let name = process.name.clone();
        self.dispatch(SEND_EVENT, move |engine| {
            let data = data.to_engine_object()?;
            engine
                .send_event(&name, data)
                .map_err(engine_error(SEND_EVENT))
        })
        .await
    }

    async fn dispatch<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Engine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.engine()?;
        debug!(operation, "Dispatching to worker");
        let result = self
            .pool
            .run(operation, move || f(engine.as_ref()))
            .await
            .and_then(|r| r);
        if let Err(e) = &result {
            warn!(operation, error = %e, "Dispatch failed");
        }
        result
    }

    /// Stop the worker pool; callers still waiting are interrupted.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

fn engine_error(operation: &'static str) -> impl FnOnce(EngineError) -> RuntimeError {
    move |source| RuntimeError::Engine { operation, source }
}
