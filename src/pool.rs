//! Worker pool split across focused submodules:
//! - `queue`: closable FIFO the submission side fans tasks out through
//! - `group`: live-worker counter the completion watcher waits on
//! - `worker`: per-worker pull/process/emit loop

mod group;
mod queue;
mod worker;

use crate::processor::TaskProcessor;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::config::PoolConfig;
use crate::runtime::telemetry::Telemetry;
use crate::task::{Task, TaskId, TaskResult};
use anyhow::{bail, Context, Result};
use core::fmt;
use futures::future::join_all;
use group::WorkerGroup;
use queue::TaskQueue;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use worker::{Worker, WorkerShared};

/// Batch-level faults. Per-task failures never surface here; they live in each `TaskResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A non-empty batch was submitted to a pool with zero workers.
    NoWorkers { pending: usize },
    /// Two tasks in one batch share an identity.
    DuplicateTaskId(TaskId),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWorkers { pending } => {
                write!(f, "worker pool has no workers to process {pending} tasks")
            }
            Self::DuplicateTaskId(id) => write!(f, "task id {id} appears more than once in batch"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Fixed-size pool that fans a batch of tasks out to concurrent workers and returns the
/// results ordered by task id.
///
/// The pool keeps no per-batch state: every call to [`WorkerPool::process_tasks`] builds
/// its own queue, result channel, and workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    worker_count: usize,
    telemetry: Arc<Telemetry>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            telemetry: Arc::new(Telemetry::default()),
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.worker_count())
    }

    /// Shares a telemetry handle with other pools or a metrics reporter.
    pub fn with_telemetry(mut self, telemetry: Arc<Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Processes every task exactly once and returns one result per task, sorted ascending
    /// by task id.
    ///
    /// Task failures, cancellations, and processor panics are reported inside the matching
    /// `TaskResult`. The error return is reserved for batch-level faults ([`PoolError`], or a
    /// worker task that could not be joined).
    pub async fn process_tasks<P: TaskProcessor>(
        &self,
        cancel: &CancelSignal,
        tasks: Vec<Task>,
        processor: P,
    ) -> Result<Vec<TaskResult>> {
        let batch_len = tasks.len();
        if batch_len == 0 {
            tracing::debug!("empty batch; no workers launched");
            return Ok(Vec::new());
        }
        if self.worker_count == 0 {
            return Err(PoolError::NoWorkers { pending: batch_len }.into());
        }
        ensure_unique_ids(&tasks)?;

        self.telemetry.record_batch();
        tracing::info!(
            tasks = batch_len,
            workers = self.worker_count,
            "processing batch"
        );

        let queue = Arc::new(TaskQueue::with_capacity(batch_len));
        let (results_tx, mut results_rx) = mpsc::channel(batch_len);
        let group = Arc::new(WorkerGroup::new());
        let shared = WorkerShared {
            queue: queue.clone(),
            results: results_tx.clone(),
            processor: Arc::new(processor),
            cancel: cancel.clone(),
            telemetry: self.telemetry.clone(),
        };

        let workers: Vec<_> = (0..self.worker_count)
            .map(|worker_id| {
                let worker = Worker::new(worker_id, shared.clone(), group.enter());
                tokio::spawn(worker.run())
            })
            .collect();
        drop(shared);

        for task in tasks {
            if let Err(task) = queue.push(task).await {
                bail!("task queue closed before task {} was submitted", task.id);
            }
        }
        queue.close().await;

        // The watcher owns the last sender outside the workers; the result stream ends once
        // it has seen every worker exit.
        let watcher = {
            let group = group.clone();
            tokio::spawn(async move {
                group.wait_until_idle().await;
                tracing::debug!("all workers finished; closing result stream");
                drop(results_tx);
            })
        };

        let mut results = Vec::with_capacity(batch_len);
        while let Some(result) = results_rx.recv().await {
            results.push(result);
        }

        watcher.await.context("failed to join completion watcher")?;
        for (worker_id, joined) in join_all(workers).await.into_iter().enumerate() {
            let handled =
                joined.with_context(|| format!("worker {worker_id} terminated unexpectedly"))?;
            tracing::debug!(worker = worker_id, handled, "worker joined");
        }

        if results.len() != batch_len {
            bail!(
                "collected {} results for a batch of {batch_len} tasks",
                results.len()
            );
        }

        sort_results(&mut results);
        Ok(results)
    }
}

fn ensure_unique_ids(tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(PoolError::DuplicateTaskId(task.id).into());
        }
    }
    Ok(())
}

/// Restores submission identity order. Ids are unique, so the unstable sort is total.
pub fn sort_results(results: &mut [TaskResult]) {
    results.sort_unstable_by_key(TaskResult::task_id);
}
