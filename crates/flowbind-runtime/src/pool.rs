// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker pool for blocking engine calls.
//!
//! Async callers submit a closure and await a oneshot reply; a fixed set of
//! named OS threads drain a bounded queue. A panicking job is reported to its
//! caller and the worker keeps serving.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn `threads` workers sharing a queue of `capacity` pending jobs.
    pub fn new(threads: usize, capacity: usize) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>(capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads.max(1) {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("flowbind-worker-{}", index))
                .spawn(move || {
                    debug!(worker = index, "Worker started");
                    loop {
                        let job = receiver.blocking_lock().blocking_recv();
                        match job {
                            Some(job) => job(),
                            None => break,
                        }
                    }
                    debug!(worker = index, "Worker stopped");
                })
                .map_err(RuntimeError::WorkerSpawn)?;
            workers.push(handle);
        }

        info!(threads = workers.len(), capacity, "Worker pool started");
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            cancel: CancellationToken::new(),
        })
    }

    /// Token cancelled when the pool shuts down; waiting callers are interrupted.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run `f` on a worker and wait for its result.
    ///
    /// `operation` names the call in errors and logs.
    pub async fn run<F, T>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let sender = self
            .sender
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(RuntimeError::PoolClosed)?;

        let (reply, response) = oneshot::channel();
        let job: Job = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(f));
            if reply.send(result).is_err() {
                debug!(operation, "Caller stopped waiting before the job completed");
            }
        });

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(RuntimeError::Interrupted(operation)),
            sent = sender.send(job) => sent.map_err(|_| RuntimeError::PoolClosed)?,
        }

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(RuntimeError::Interrupted(operation)),
            outcome = response => outcome.map_err(|_| RuntimeError::PoolClosed)?,
        };

        outcome.map_err(|panic| {
            let message = panic_message(panic.as_ref());
            warn!(operation, panic = %message, "Job panicked on worker");
            RuntimeError::WorkerPanicked(message)
        })
    }

    /// Stop accepting jobs, interrupt waiting callers and join the workers.
    ///
    /// Jobs already running finish first. Calling this twice is a no-op.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return,
        };
        let count = workers.len();
        for worker in workers {
            if worker.join().is_err() {
                warn!("Worker thread exited abnormally");
            }
        }
        if count > 0 {
            info!(threads = count, "Worker pool stopped");
        }
    }

    /// Number of running worker threads.
    pub fn size(&self) -> usize {
        self.workers.lock().map(|w| w.len()).unwrap_or(0)
    }
}

impl Drop for WorkerPool {
    /// Interrupts callers and closes the queue without joining; workers exit
    /// on their own once running and queued jobs are done.
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
