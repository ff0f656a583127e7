// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Engine bindings.
//!
//! An [`Engine`] is the durable execution service the runtime hands work to.
//! Its calls block; the dispatcher runs them on pool workers.
//! - `embedded`: in-process engine running registered handlers directly

/// In-process engine.
pub mod embedded;

use std::time::Duration;

use serde::Serialize;
use serde_json::Value as EngineValue;
use strum::{Display, EnumString};

use crate::error::EngineError;

pub use embedded::EmbeddedEngine;

/// Lifecycle state of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[allow(missing_docs)]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
}

/// Binding to a durable execution engine.
pub trait Engine: Send + Sync {
    /// Run the named activity with engine arguments.
    fn execute_activity(&self, name: &str, args: EngineValue) -> Result<EngineValue, EngineError>;

    /// Start the named process; returns the workflow id.
    fn start_process(&self, name: &str, input: EngineValue) -> Result<String, EngineError>;

    /// Deliver event data to a running instance of the named process.
    ///
    /// The data's `id` field names the workflow. Returns `false` when the
    /// instance no longer accepts events.
    fn send_event(&self, name: &str, data: EngineValue) -> Result<bool, EngineError>;

    /// Block until the durable sleep `sleep_id` of `workflow_id` is over.
    ///
    /// The wake-up deadline survives re-execution: sleeping again under the
    /// same id only waits for the remaining time. The workflow must exist;
    /// sleeping on behalf of a finished one returns at once.
    fn durable_sleep(
        &self,
        workflow_id: &str,
        sleep_id: &str,
        duration: Duration,
    ) -> Result<(), EngineError>;

    /// Events delivered to `workflow_id` so far, in arrival order.
    fn events(&self, workflow_id: &str) -> Result<Vec<(String, EngineValue)>, EngineError>;

    /// Release the connection. Best-effort; bindings may have nothing to close.
    fn close(&self) -> Result<(), EngineError>;
}

/// What a running process can do through its engine.
pub struct ProcessContext<'a> {
    workflow_id: &'a str,
    process: &'a str,
    engine: &'a dyn Engine,
}

impl<'a> ProcessContext<'a> {
    /// Context for one workflow instance.
    pub fn new(workflow_id: &'a str, process: &'a str, engine: &'a dyn Engine) -> Self {
        Self {
            workflow_id,
            process,
            engine,
        }
    }

    /// Id of the running workflow.
    pub fn workflow_id(&self) -> &str {
        self.workflow_id
    }

    /// Name of the running process.
    pub fn process(&self) -> &str {
        self.process
    }

    /// Run an activity. Activities registered for this process as
    /// `<process>.<name>` take precedence over a plain `<name>`.
    pub fn call_activity(&self, name: &str, args: EngineValue) -> Result<EngineValue, EngineError> {
        let scoped = format!("{}.{}", self.process, name);
        match self.engine.execute_activity(&scoped, args.clone()) {
            Err(EngineError::ActivityNotFound(_)) => self.engine.execute_activity(name, args),
            other => other,
        }
    }

    /// Sleep durably under `sleep_id`.
    pub fn sleep(&self, sleep_id: &str, duration: Duration) -> Result<(), EngineError> {
        self.engine.durable_sleep(self.workflow_id, sleep_id, duration)
    }

    /// Events delivered to this workflow so far.
    pub fn events(&self) -> Result<Vec<(String, EngineValue)>, EngineError> {
        self.engine.events(self.workflow_id)
    }

    /// Latest value delivered for event `name`, if any.
    pub fn event(&self, name: &str) -> Result<Option<EngineValue>, EngineError> {
        Ok(self
            .events()?
            .into_iter()
            .rev()
            .find(|(event, _)| event == name)
            .map(|(_, value)| value))
    }
}
