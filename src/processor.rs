//! Task processor contract consumed by the worker pool, plus the simulated workload.

pub mod simulated;

use crate::runtime::cancel::CancelSignal;
use crate::task::{Task, TaskError};
use core::future::Future;
use core::pin::Pin;

pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<String, TaskError>> + Send + 'static>>;

/// Computes the output of a single task.
///
/// Implementations must watch `cancel` and return `TaskError::Cancelled` promptly once it
/// fires, including in the middle of a computation. Ordinary failures are reported as
/// `TaskError::Failed`, never by panicking.
pub trait TaskProcessor: Send + Sync + 'static {
    fn process(&self, cancel: CancelSignal, task: Task) -> ProcessFuture;
}

impl<F, Fut> TaskProcessor for F
where
    F: Fn(CancelSignal, Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, TaskError>> + Send + 'static,
{
    fn process(&self, cancel: CancelSignal, task: Task) -> ProcessFuture {
        Box::pin(self(cancel, task))
    }
}
