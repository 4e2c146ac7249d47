pub mod pool;
pub mod processor;
pub mod runtime;
pub mod summary;
pub mod task;

pub use pool::{sort_results, PoolError, WorkerPool};
pub use processor::simulated::{simulated_output, SimulatedProcessor, SimulationParams};
pub use processor::{ProcessFuture, TaskProcessor};
pub use runtime::cancel::{CancelReason, CancelSignal};
pub use runtime::config::{PoolConfig, PoolConfigBuilder, PoolConfigParams};
pub use runtime::telemetry::{init_tracing, spawn_metrics_reporter, Telemetry, TelemetrySnapshot};
pub use summary::BatchSummary;
pub use task::{Task, TaskError, TaskId, TaskResult, WorkerId};
