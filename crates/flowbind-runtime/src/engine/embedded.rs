// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embedded engine: runs registered processes and activities in-process.
//!
//! Each started process runs on its own thread. Instance status, delivered
//! events and durable-sleep deadlines live in memory for the lifetime of the
//! engine.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value as EngineValue;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Engine, ProcessContext, WorkflowStatus};
use crate::config::RuntimeConfig;
use crate::error::EngineError;
use crate::registry::Registries;

/// In-process engine backed by the runtime's registries.
#[derive(Clone)]
pub struct EmbeddedEngine {
    inner: Arc<Inner>,
}

struct Inner {
    service_url: String,
    namespace: String,
    registries: Arc<Registries>,
    instances: DashMap<String, Arc<Instance>>,
    /// Wake-up deadline per (workflow id, sleep id).
    deadlines: DashMap<(String, String), DateTime<Utc>>,
    closed: AtomicBool,
}

struct Instance {
    process: String,
    state: Mutex<InstanceState>,
    changed: Condvar,
}

struct InstanceState {
    status: WorkflowStatus,
    events: Vec<(String, EngineValue)>,
    output: Option<Result<EngineValue, String>>,
}

impl Instance {
    fn lock(&self) -> MutexGuard<'_, InstanceState> {
        // A panicking process body never holds this lock.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EmbeddedEngine {
    /// Create an engine for the configured service and namespace.
    pub fn new(config: &RuntimeConfig, registries: Arc<Registries>) -> Self {
        info!(
            service_url = %config.service_url,
            namespace = %config.namespace,
            "Embedded engine created"
        );
        Self {
            inner: Arc::new(Inner {
                service_url: config.service_url.clone(),
                namespace: config.namespace.clone(),
                registries,
                instances: DashMap::new(),
                deadlines: DashMap::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Service address this engine was created for.
    pub fn service_url(&self) -> &str {
        &self.inner.service_url
    }

    /// Namespace this engine was created for.
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Current status of a workflow.
    pub fn status(&self, workflow_id: &str) -> Option<WorkflowStatus> {
        self.instance(workflow_id).ok().map(|i| i.lock().status)
    }

    /// Output of a finished workflow: its result or failure message.
    pub fn output(&self, workflow_id: &str) -> Option<Result<EngineValue, String>> {
        self.instance(workflow_id)
            .ok()
            .and_then(|i| i.lock().output.clone())
    }

    /// Block until the workflow leaves `Running` or `timeout` passes.
    pub fn wait_for_completion(
        &self,
        workflow_id: &str,
        timeout: Duration,
    ) -> Option<WorkflowStatus> {
        let instance = self.instance(workflow_id).ok()?;
        let guard = instance.lock();
        let (guard, _) = instance
            .changed
            .wait_timeout_while(guard, timeout, |state| {
                state.status == WorkflowStatus::Running
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(guard.status)
    }

    fn instance(&self, workflow_id: &str) -> Result<Arc<Instance>, EngineError> {
        self.inner
            .instances
            .get(workflow_id)
            .map(|i| Arc::clone(i.value()))
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))
    }

    /// Settle `instance`. Deadlines go first so a successor started under
    /// the same id never loses its own.
    fn finish(&self, workflow_id: &str, instance: &Instance, output: Result<EngineValue, String>) {
        self.inner.deadlines.retain(|(id, _), _| id != workflow_id);
        let status = if output.is_ok() {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::Failed
        };
        {
            let mut state = instance.lock();
            state.status = status;
            state.output = Some(output);
        }
        instance.changed.notify_all();
        info!(workflow_id, status = %status, "Workflow finished");
    }
}

impl Engine for EmbeddedEngine {
    fn execute_activity(&self, name: &str, args: EngineValue) -> Result<EngineValue, EngineError> {
        let handler = self
            .inner
            .registries
            .activities
            .lookup(name)
            .ok_or_else(|| EngineError::ActivityNotFound(name.to_string()))?;
        debug!(activity = name, "Executing activity");
        handler(args).map_err(EngineError::Failed)
    }

    fn start_process(&self, name: &str, input: EngineValue) -> Result<String, EngineError> {
        let handler = self
            .inner
            .registries
            .processes
            .lookup(name)
            .ok_or_else(|| EngineError::ProcessNotFound(name.to_string()))?;

        let workflow_id = workflow_id_of(&input).unwrap_or_else(|| Uuid::new_v4().to_string());
        let instance = Arc::new(Instance {
            process: name.to_string(),
            state: Mutex::new(InstanceState {
                status: WorkflowStatus::Running,
                events: Vec::new(),
                output: None,
            }),
            changed: Condvar::new(),
        });
        // Check and insert under the entry's shard lock.
        match self.inner.instances.entry(workflow_id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().lock().status == WorkflowStatus::Running {
                    return Err(EngineError::WorkflowAlreadyRunning(workflow_id));
                }
                entry.insert(Arc::clone(&instance));
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&instance));
            }
        }

        let engine = self.clone();
        let process = name.to_string();
        let id = workflow_id.clone();
        let running = Arc::clone(&instance);
        let spawned = thread::Builder::new()
            .name(format!("flowbind-process-{}", process))
            .spawn(move || {
                let context = ProcessContext::new(&id, &process, &engine);
                let output = catch_unwind(AssertUnwindSafe(|| handler(&context, input)))
                    .unwrap_or_else(|_| Err(format!("process `{}` panicked", process)));
                engine.finish(&id, &running, output);
            });
        if let Err(e) = spawned {
            self.finish(&workflow_id, &instance, Err(e.to_string()));
            return Err(EngineError::Unavailable(format!(
                "cannot start process thread: {}",
                e
            )));
        }

        info!(process = name, workflow_id = %workflow_id, "Workflow started");
        Ok(workflow_id)
    }

    fn send_event(&self, name: &str, data: EngineValue) -> Result<bool, EngineError> {
        let workflow_id = workflow_id_of(&data).ok_or(EngineError::MissingWorkflowId)?;
        let instance = self.instance(&workflow_id)?;
        if instance.process != name {
            return Err(EngineError::WorkflowNotFound(workflow_id));
        }

        let fields: Vec<(String, EngineValue)> = match data {
            EngineValue::Object(map) => map.into_iter().filter(|(k, _)| k != "id").collect(),
            _ => Vec::new(),
        };
        if let Some(accepted) = self.inner.registries.events.lookup(name)
            && let Some((event, _)) = fields.iter().find(|(k, _)| !accepted.contains(k))
        {
            return Err(EngineError::UnknownEvent {
                process: name.to_string(),
                event: event.clone(),
            });
        }

        {
            let mut state = instance.lock();
            if state.status != WorkflowStatus::Running {
                debug!(workflow_id = %workflow_id, "Event for finished workflow dropped");
                return Ok(false);
            }
            state.events.extend(fields);
        }
        instance.changed.notify_all();
        debug!(process = name, workflow_id = %workflow_id, "Event delivered");
        Ok(true)
    }

    fn durable_sleep(
        &self,
        workflow_id: &str,
        sleep_id: &str,
        duration: Duration,
    ) -> Result<(), EngineError> {
        let instance = self.instance(workflow_id)?;
        if instance.lock().status != WorkflowStatus::Running {
            debug!(workflow_id, sleep_id, "Sleep of finished workflow skipped");
            return Ok(());
        }

        let now = Utc::now();
        let wake_at = *self
            .inner
            .deadlines
            .entry((workflow_id.to_string(), sleep_id.to_string()))
            .or_insert_with(|| {
                now + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero())
            });

        let remaining = (wake_at - now).to_std().unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            debug!(workflow_id, sleep_id, "Sleep already completed");
            return Ok(());
        }
        info!(
            workflow_id,
            sleep_id,
            remaining_ms = remaining.as_millis() as u64,
            "Sleeping until wake time"
        );
        thread::sleep(remaining);
        Ok(())
    }

    fn events(&self, workflow_id: &str) -> Result<Vec<(String, EngineValue)>, EngineError> {
        Ok(self.instance(workflow_id)?.lock().events.clone())
    }

    fn close(&self) -> Result<(), EngineError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            warn!("Embedded engine already closed");
        } else {
            info!("Embedded engine closed");
        }
        Ok(())
    }
}

/// The `id` field of a map, as a string.
fn workflow_id_of(value: &EngineValue) -> Option<String> {
    match value.get("id")? {
        EngineValue::String(s) => Some(s.clone()),
        EngineValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Activity, Process};
    use serde_json::json;
    use std::time::Instant;

    fn engine() -> (EmbeddedEngine, Arc<Registries>) {
        let registries = Arc::new(Registries::new());
        let engine = EmbeddedEngine::new(&RuntimeConfig::default(), Arc::clone(&registries));
        (engine, registries)
    }

    fn register_process(registries: &Registries, process: Process) {
        registries.processes.register(process.name, process.handler);
    }

    #[test]
    fn test_process_runs_scoped_activity() {
        let (engine, registries) = engine();
        let double = Activity::new("order.double", |args| {
            let n = args["n"].as_i64().ok_or("n must be an int")?;
            Ok(json!(n * 2))
        });
        registries.activities.register(double.name, double.handler);
        register_process(
            &registries,
            Process::new("order", |ctx, input| {
                ctx.call_activity("double", json!({"n": input["n"]}))
                    .map_err(|e| e.to_string())
            }),
        );

        let id = engine.start_process("order", json!({"id": "o-1", "n": 21})).unwrap();
        assert_eq!(id, "o-1");
        assert_eq!(
            engine.wait_for_completion(&id, Duration::from_secs(5)),
            Some(WorkflowStatus::Completed)
        );
        assert_eq!(engine.output(&id), Some(Ok(json!(42))));
    }

    #[test]
    fn test_generated_id_and_failure() {
        let (engine, registries) = engine();
        register_process(
            &registries,
            Process::new("failing", |_, _| Err("boom".to_string())),
        );

        let id = engine.start_process("failing", json!({})).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(
            engine.wait_for_completion(&id, Duration::from_secs(5)),
            Some(WorkflowStatus::Failed)
        );
        assert_eq!(engine.output(&id), Some(Err("boom".to_string())));
    }

    #[test]
    fn test_unknown_process_and_activity() {
        let (engine, _) = engine();
        assert_eq!(
            engine.start_process("ghost", json!({})),
            Err(EngineError::ProcessNotFound("ghost".to_string()))
        );
        assert_eq!(
            engine.execute_activity("ghost", json!([])),
            Err(EngineError::ActivityNotFound("ghost".to_string()))
        );
    }

    #[test]
    fn test_events_reach_running_workflow() {
        let (engine, registries) = engine();
        registries
            .events
            .register("approval", Arc::from(vec!["approved".to_string()]));
        register_process(
            &registries,
            Process::new("approval", |ctx, _| {
                for _ in 0..500 {
                    if let Some(value) = ctx.event("approved").map_err(|e| e.to_string())? {
                        return Ok(value);
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Err("no approval".to_string())
            }),
        );

        let id = engine.start_process("approval", json!({"id": 7})).unwrap();
        assert_eq!(id, "7");
        assert_eq!(
            engine.send_event("approval", json!({"id": 7, "rejected": true})),
            Err(EngineError::UnknownEvent {
                process: "approval".to_string(),
                event: "rejected".to_string(),
            })
        );
        assert_eq!(
            engine.send_event("approval", json!({"id": 7, "approved": true})),
            Ok(true)
        );
        assert_eq!(
            engine.wait_for_completion(&id, Duration::from_secs(5)),
            Some(WorkflowStatus::Completed)
        );
        assert_eq!(engine.output(&id), Some(Ok(json!(true))));

        // Finished workflows no longer accept events.
        assert_eq!(
            engine.send_event("approval", json!({"id": 7, "approved": false})),
            Ok(false)
        );
        assert_eq!(
            engine.send_event("approval", json!({"approved": true})),
            Err(EngineError::MissingWorkflowId)
        );
    }

    #[test]
    fn test_running_id_cannot_be_reused() {
        let (engine, registries) = engine();
        register_process(
            &registries,
            Process::new("slow", |_, _| {
                thread::sleep(Duration::from_millis(200));
                Ok(EngineValue::Null)
            }),
        );
        engine.start_process("slow", json!({"id": "s"})).unwrap();
        assert_eq!(
            engine.start_process("slow", json!({"id": "s"})),
            Err(EngineError::WorkflowAlreadyRunning("s".to_string()))
        );
    }

    /// Starts `id` under a process that runs until it receives `done`.
    fn start_parked(engine: &EmbeddedEngine, registries: &Registries, id: &str) {
        register_process(
            registries,
            Process::new("parked", |ctx, _| {
                for _ in 0..1000 {
                    if ctx.event("done").map_err(|e| e.to_string())?.is_some() {
                        return Ok(EngineValue::Null);
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Err("never released".to_string())
            }),
        );
        engine.start_process("parked", json!({"id": id})).unwrap();
    }

    #[test]
    fn test_concurrent_starts_admit_one_instance() {
        let (engine, registries) = engine();
        start_parked(&engine, &registries, "warmup");
        engine.send_event("parked", json!({"id": "warmup", "done": true})).unwrap();

        for round in 0..20 {
            let id = format!("race-{round}");
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let starts: Vec<_> = (0..2)
                .map(|_| {
                    let engine = engine.clone();
                    let barrier = Arc::clone(&barrier);
                    let id = id.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        engine.start_process("parked", json!({"id": id}))
                    })
                })
                .collect();
            let results: Vec<_> = starts.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(results.contains(&Err(EngineError::WorkflowAlreadyRunning(id.clone()))));
            engine.send_event("parked", json!({"id": id, "done": true})).unwrap();
            assert_eq!(
                engine.wait_for_completion(&id, Duration::from_secs(10)),
                Some(WorkflowStatus::Completed)
            );
        }
    }

    #[test]
    fn test_finished_run_does_not_settle_its_successor() {
        let (engine, registries) = engine();
        start_parked(&engine, &registries, "p");
        engine.send_event("parked", json!({"id": "p", "done": true})).unwrap();
        engine.wait_for_completion("p", Duration::from_secs(10));

        engine.start_process("parked", json!({"id": "p"})).unwrap();
        assert_eq!(engine.status("p"), Some(WorkflowStatus::Running));
        assert!(engine.events("p").unwrap().is_empty());
        engine.send_event("parked", json!({"id": "p", "done": true})).unwrap();
        assert_eq!(
            engine.wait_for_completion("p", Duration::from_secs(10)),
            Some(WorkflowStatus::Completed)
        );
    }

    #[test]
    fn test_durable_sleep_waits_only_remaining_time() {
        let (engine, registries) = engine();
        start_parked(&engine, &registries, "wf");

        let start = Instant::now();
        engine
            .durable_sleep("wf", "pause", Duration::from_millis(50))
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));

        // Re-executing the same sleep after its deadline returns at once.
        let again = Instant::now();
        engine
            .durable_sleep("wf", "pause", Duration::from_secs(30))
            .unwrap();
        assert!(again.elapsed() < Duration::from_secs(5));

        // A different sleep id gets its own deadline.
        let other = Instant::now();
        engine
            .durable_sleep("wf", "other", Duration::from_millis(20))
            .unwrap();
        assert!(other.elapsed() >= Duration::from_millis(20));
        assert_eq!(engine.inner.deadlines.len(), 2);

        engine.send_event("parked", json!({"id": "wf", "done": true})).unwrap();
        engine.wait_for_completion("wf", Duration::from_secs(10));
        assert!(engine.inner.deadlines.is_empty());
    }

    #[test]
    fn test_sleep_needs_a_running_workflow() {
        let (engine, registries) = engine();
        assert_eq!(
            engine.durable_sleep("ghost", "pause", Duration::from_secs(30)),
            Err(EngineError::WorkflowNotFound("ghost".to_string()))
        );
        assert!(engine.inner.deadlines.is_empty());

        start_parked(&engine, &registries, "done");
        engine.send_event("parked", json!({"id": "done", "done": true})).unwrap();
        engine.wait_for_completion("done", Duration::from_secs(10));
        let start = Instant::now();
        engine
            .durable_sleep("done", "pause", Duration::from_secs(30))
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(engine.inner.deadlines.is_empty());
    }

    #[test]
    fn test_close_is_best_effort() {
        let (engine, _) = engine();
        assert!(engine.close().is_ok());
        assert!(engine.close().is_ok());
        assert!(engine.is_closed());
        assert_eq!(engine.service_url(), "localhost:7233");
        assert_eq!(engine.namespace(), "default");
    }
}
