use super::group::WorkerGuard;
use super::queue::TaskQueue;
use crate::processor::TaskProcessor;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::telemetry::Telemetry;
use crate::task::{Task, TaskError, TaskResult, WorkerId};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// State every worker of one batch shares.
pub(super) struct WorkerShared<P: TaskProcessor> {
    pub(super) queue: Arc<TaskQueue<Task>>,
    pub(super) results: mpsc::Sender<TaskResult>,
    pub(super) processor: Arc<P>,
    pub(super) cancel: CancelSignal,
    pub(super) telemetry: Arc<Telemetry>,
}

impl<P: TaskProcessor> Clone for WorkerShared<P> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            results: self.results.clone(),
            processor: Arc::clone(&self.processor),
            cancel: self.cancel.clone(),
            telemetry: Arc::clone(&self.telemetry),
        }
    }
}

pub(super) struct Worker<P: TaskProcessor> {
    id: WorkerId,
    shared: WorkerShared<P>,
    _guard: WorkerGuard,
}

impl<P: TaskProcessor> Worker<P> {
    pub(super) fn new(id: WorkerId, shared: WorkerShared<P>, guard: WorkerGuard) -> Self {
        Self {
            id,
            shared,
            _guard: guard,
        }
    }

    /// Pulls tasks until the queue is closed and drained. Returns how many tasks it handled.
    ///
    /// Cancellation does not stop the loop: queued tasks are still handed to the processor,
    /// which fails them fast.
    #[tracing::instrument(name = "worker", skip_all, fields(worker = self.id))]
    pub(super) async fn run(self) -> usize {
        tracing::debug!(worker = self.id, "worker task started");
        let mut handled = 0usize;

        while let Some(task) = self.shared.queue.pop().await {
            let task_id = task.id;
            let outcome = self.process(task).await;
            self.shared.telemetry.record_task_outcome(&outcome);

            let result = TaskResult::new(task_id, outcome, self.id);
            if self.shared.results.send(result).await.is_err() {
                tracing::warn!(
                    worker = self.id,
                    task_id,
                    "result receiver dropped; exiting worker loop"
                );
                break;
            }
            handled += 1;
        }

        tracing::debug!(worker = self.id, handled, "worker task exited");
        handled
    }

    async fn process(&self, task: Task) -> Result<String, TaskError> {
        let task_id = task.id;
        tracing::info!(worker = self.id, task_id, "starting task");
        self.shared.telemetry.record_task_started();

        let processor = Arc::clone(&self.shared.processor);
        let cancel = self.shared.cancel.clone();
        let attempt = AssertUnwindSafe(async move { processor.process(cancel, task).await })
            .catch_unwind()
            .await;

        match attempt {
            Ok(Ok(output)) => {
                tracing::debug!(worker = self.id, task_id, "task succeeded");
                Ok(output)
            }
            Ok(Err(error)) => {
                tracing::debug!(worker = self.id, task_id, error = %error, "task failed");
                Err(error)
            }
            Err(panic_payload) => {
                let message = panic_message(panic_payload.as_ref());
                tracing::error!(
                    worker = self.id,
                    task_id,
                    panic = %message,
                    "task processor panicked"
                );
                Err(TaskError::Panicked { task_id, message })
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
