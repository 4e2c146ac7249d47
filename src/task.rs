//! Task and result model shared by the pool, processors, and callers.

use crate::runtime::cancel::CancelReason;
use core::fmt;

/// Caller-assigned identity of a task. Unique within a batch and used as the ordering key.
pub type TaskId = u64;
/// Index of the worker (`0..worker_count`) that produced a result.
pub type WorkerId = usize;

/// Unit of work submitted to the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub data: String,
}

impl Task {
    pub fn new(id: TaskId, data: impl Into<String>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }
}

/// Reason a processor could not produce an output for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The processor ran and reported a domain failure.
    Failed { task_id: TaskId, reason: String },
    /// The batch cancellation signal fired before or during processing.
    Cancelled {
        task_id: TaskId,
        reason: CancelReason,
    },
    /// The processor panicked; the worker recovered and recorded the panic message.
    Panicked { task_id: TaskId, message: String },
}

impl TaskError {
    pub fn failed(task_id: TaskId, reason: impl Into<String>) -> Self {
        Self::Failed {
            task_id,
            reason: reason.into(),
        }
    }

    pub fn cancelled(task_id: TaskId, reason: CancelReason) -> Self {
        Self::Cancelled { task_id, reason }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            Self::Failed { task_id, .. }
            | Self::Cancelled { task_id, .. }
            | Self::Panicked { task_id, .. } => *task_id,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { task_id, reason } => {
                write!(f, "processing failed for task {task_id}: {reason}")
            }
            Self::Cancelled { task_id, reason } => {
                write!(f, "task {task_id} was cancelled: {reason}")
            }
            Self::Panicked { task_id, message } => {
                write!(f, "task {task_id} panicked: {message}")
            }
        }
    }
}

impl std::error::Error for TaskError {}

/// Outcome of exactly one submitted task.
///
/// The outcome is a `Result`, so a result always carries either an output or a failure
/// and never both. Output contents are not inspected: `Ok(String::new())` is a success
/// whose output is `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    task_id: TaskId,
    outcome: Result<String, TaskError>,
    worker_id: WorkerId,
}

impl TaskResult {
    pub fn new(task_id: TaskId, outcome: Result<String, TaskError>, worker_id: WorkerId) -> Self {
        Self {
            task_id,
            outcome,
            worker_id,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn outcome(&self) -> &Result<String, TaskError> {
        &self.outcome
    }

    pub fn into_outcome(self) -> Result<String, TaskError> {
        self.outcome
    }

    /// Output payload; `None` when the task failed. May be empty for a successful task.
    pub fn output(&self) -> Option<&str> {
        self.outcome.as_ref().ok().map(String::as_str)
    }

    /// Failure reason; `None` when the task succeeded.
    pub fn error(&self) -> Option<&TaskError> {
        self.outcome.as_ref().err()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
