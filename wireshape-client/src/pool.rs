/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! A bounded task pool: the asynchronous facade over synchronous-shaped
//! invocations.
//!
//! Concurrency is capped by a semaphore rather than a dedicated thread
//! pool; tasks run on the ambient tokio runtime. Completion is observable
//! twice by design: through the optional callbacks and through
//! [`TaskHandle::join`], so a failure can never be observed once and lost.
//! Cancellation is cooperative: it suppresses callback delivery but does
//! not interrupt in-flight work.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinHandle;

pub struct TaskPool {
    semaphore: Arc<Semaphore>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskPool {
    /// A pool running at most `max_concurrency` tasks at a time. Submitted
    /// work beyond the cap queues on the semaphore.
    pub fn new(max_concurrency: usize) -> Self {
        TaskPool {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Submits a task with completion callbacks. Exactly one of
    /// `on_success`/`on_error` fires when the task completes, unless the
    /// handle was cancelled first or the pool was shut down.
    pub fn submit<F, T, E>(
        &self,
        future: F,
        on_success: impl FnOnce(&T) + Send + 'static,
        on_error: impl FnOnce(&E) + Send + 'static,
    ) -> TaskHandle<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let callbacks_suppressed = cancelled.clone();
        let (tx, rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                // the pool was shut down before this task started
                Err(_) => return,
            };
            let result = future.await;
            if !callbacks_suppressed.load(Ordering::SeqCst) {
                match &result {
                    Ok(value) => on_success(value),
                    Err(err) => on_error(err),
                }
            }
            // the handle may have been dropped; that's fine
            let _ = tx.send(result);
        });
        self.tasks.lock().unwrap().push(join);
        TaskHandle { cancelled, rx }
    }

    /// Submits a task without callbacks; completion is observed via the
    /// returned handle only.
    pub fn spawn<F, T, E>(&self, future: F) -> TaskHandle<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit(future, |_| {}, |_| {})
    }

    /// Waits for every submitted task to finish.
    pub async fn drain(&self) {
        let tasks = {
            let mut tasks = self.tasks.lock().unwrap();
            std::mem::take(&mut *tasks)
        };
        for task in tasks {
            // a task that was aborted or panicked has nothing left to wait for
            let _ = task.await;
        }
    }

    /// Forcibly terminates the pool: queued tasks never start and running
    /// tasks are abandoned, not drained. Call [`drain`](TaskPool::drain)
    /// first to let outstanding work finish.
    pub fn shutdown(&self) {
        self.semaphore.close();
        let tasks = {
            let mut tasks = self.tasks.lock().unwrap();
            std::mem::take(&mut *tasks)
        };
        for task in &tasks {
            task.abort();
        }
    }
}

/// How a joined task can fail.
#[derive(Debug)]
pub enum TaskError<E> {
    /// The task ran and returned this error. It was also delivered to
    /// `on_error` unless the handle was cancelled.
    Failed(E),
    /// The task was abandoned before producing a result (pool shutdown, or
    /// the task panicked).
    Abandoned,
}

impl<E: std::fmt::Display> std::fmt::Display for TaskError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::Failed(err) => write!(f, "{}", err),
            TaskError::Abandoned => write!(f, "task was abandoned before completion"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TaskError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Failed(err) => Some(err),
            TaskError::Abandoned => None,
        }
    }
}

/// Completion handle for one submitted task.
pub struct TaskHandle<T, E> {
    cancelled: Arc<AtomicBool>,
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    /// Cooperative cancellation: in-flight work is not interrupted, but the
    /// completion callbacks will not fire. Joining still returns whatever
    /// the task produced.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Waits for the task and returns its result. Errors surface here as
    /// well as through `on_error`.
    pub async fn join(self) -> Result<T, TaskError<E>> {
        match self.rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(TaskError::Failed(err)),
            Err(_) => Err(TaskError::Abandoned),
        }
    }
}
