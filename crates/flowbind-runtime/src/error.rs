// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime error types.

use thiserror::Error;

/// Errors surfaced to callers of the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Invalid runtime configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A process with this name is already registered.
    #[error("process `{0}` is already registered")]
    DuplicateRegistration(String),

    /// No activity is registered under this name.
    #[error("activity `{0}` is not registered")]
    ActivityNotFound(String),

    /// `init_client` was called on a runtime that already has an engine handle.
    #[error("engine client is already initialized")]
    ClientAlreadyInitialized,

    /// A dispatch operation ran before `init_client`.
    #[error("engine client is not initialized")]
    ClientNotInitialized,

    /// A dispatch operation ran after `close_client`.
    #[error("engine client is closed")]
    ClientClosed,

    /// A value could not cross the engine boundary.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The engine call failed.
    #[error("{operation} failed: {source}")]
    Engine {
        /// Dispatch operation, e.g. `callActivity`.
        operation: &'static str,
        /// Failure reported by the engine binding.
        source: EngineError,
    },

    /// The worker pool is shut down or its queue is closed.
    #[error("worker pool is shut down")]
    PoolClosed,

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The job panicked on its worker thread.
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    /// The waiting caller was interrupted before the job completed.
    #[error("interrupted while waiting for {0}")]
    Interrupted(&'static str),
}

/// Failures converting between host values and engine values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Engine values carry no NaN or infinities.
    #[error("float {0} has no engine representation")]
    NonFiniteFloat(f64),

    /// Decimal text is not a number.
    #[error("invalid decimal `{0}`")]
    InvalidDecimal(String),

    /// Function handles and other opaque values cannot be serialized.
    #[error("{0} values cannot be sent to the engine")]
    Unsupported(&'static str),

    /// The value has the wrong shape for the operation.
    #[error("expected {expected}, found {found}")]
    UnexpectedShape {
        /// Expected shape.
        expected: &'static str,
        /// Shape found.
        found: &'static str,
    },
}

/// Failures reported by an engine binding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No process is registered under this name.
    #[error("process `{0}` is not registered")]
    ProcessNotFound(String),

    /// No activity is registered under this name.
    #[error("activity `{0}` is not registered")]
    ActivityNotFound(String),

    /// No workflow instance has this id.
    #[error("workflow `{0}` not found")]
    WorkflowNotFound(String),

    /// A running instance already uses this id.
    #[error("workflow `{0}` is already running")]
    WorkflowAlreadyRunning(String),

    /// Event data lacks the `id` field naming the target workflow.
    #[error("event data must contain an `id` field")]
    MissingWorkflowId,

    /// The event name is not declared by the target process.
    #[error("process `{process}` does not accept event `{event}`")]
    UnknownEvent {
        /// Target process.
        process: String,
        /// Event name.
        event: String,
    },

    /// The activity or process body returned an error.
    #[error("{0}")]
    Failed(String),

    /// The engine could not reach or use its backing service.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable holds an unparsable value.
    #[error("invalid {var}: {value}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// A setting must be greater than zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// A setting must not be empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Type alias for runtime results.
pub type Result<T> = std::result::Result<T, RuntimeError>;
