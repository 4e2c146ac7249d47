use crate::task::TaskResult;
use std::time::Duration;

/// Aggregate view of a finished batch, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Subset of `failed` caused by the cancellation signal.
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn from_results(results: &[TaskResult], elapsed: Duration) -> Self {
        let successful = results.iter().filter(|result| result.is_success()).count();
        let cancelled = results
            .iter()
            .filter_map(TaskResult::error)
            .filter(|error| error.is_cancellation())
            .count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            cancelled,
            elapsed,
        }
    }

    /// Percentage of successful tasks; `0.0` for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }
}
