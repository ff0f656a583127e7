// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Flowbind Runtime - Registries and Dispatch for Durable Workflows
//!
//! This crate holds the process, activity and event registries and hands
//! activity calls, process starts and events to a durable execution engine
//! without blocking async callers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │  async caller    │     │   WorkerPool     │     │  Engine binding  │
//! │ (call_activity,  │────▶│  (bounded queue, │────▶│ (EmbeddedEngine  │
//! │  start_process)  │◀────│   OS threads)    │◀────│  or custom)      │
//! └──────────────────┘     └──────────────────┘     └────────┬─────────┘
//!          │ oneshot reply                                   │
//!          ▼                                                 ▼
//! ┌──────────────────┐                              ┌──────────────────┐
//! │    Registries    │◀─────────────────────────────│  ProcessContext  │
//! │ (DashMap, first  │                              │ (activities,     │
//! │  write wins)     │                              │  events, sleep)  │
//! └──────────────────┘                              └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use flowbind_runtime::{Activity, RuntimeConfig, Value, WorkflowRuntime};
//!
//! let runtime = WorkflowRuntime::new(RuntimeConfig::from_env()?)?;
//! runtime.init_client()?;
//!
//! let fetch = Activity::new("fetch", |args| Ok(args["id"].clone()));
//! let result = runtime
//!     .call_activity(&fetch, Value::map([("id", Value::from("order-1"))]))
//!     .await?;
//! ```
//!
//! # Configuration
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FLOWBIND_SERVICE_URL` | `localhost:7233` | Engine service address |
//! | `FLOWBIND_NAMESPACE` | `default` | Engine namespace |
//! | `FLOWBIND_WORKER_THREADS` | `4` | Worker threads for engine calls |
//! | `FLOWBIND_QUEUE_CAPACITY` | `256` | Pending jobs before submitters wait |

#![deny(missing_docs)]

/// Runtime configuration.
pub mod config;

/// Registration and dispatch.
pub mod dispatch;

/// Engine bindings and the embedded engine.
pub mod engine;

/// Error types.
pub mod error;

/// Worker pool for blocking engine calls.
pub mod pool;

/// Process, activity and event registries.
pub mod registry;

/// Host values and engine conversion.
pub mod value;

// Re-export main types
pub use config::RuntimeConfig;
pub use dispatch::WorkflowRuntime;
pub use engine::{EmbeddedEngine, Engine, ProcessContext, WorkflowStatus};
pub use error::{ConfigError, ConversionError, EngineError, Result, RuntimeError};
pub use registry::{Activity, Process, ProcessRegistration, Registries, Registry};
pub use value::Value;
