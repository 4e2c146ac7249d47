use std::time::Duration;

use crate::support::helpers::{assert_batch_contract, init_tracing, shuffled_tasks};
use anyhow::Result;
use batchpool::{
    simulated_output, BatchSummary, CancelSignal, PoolConfig, SimulatedProcessor,
    SimulationParams, WorkerPool,
};
use tokio::time::Instant;

fn quick_params(failure_rate: f64) -> SimulationParams {
    SimulationParams {
        min_duration: Duration::from_millis(1),
        max_duration: Duration::from_millis(10),
        failure_rate,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simulated_batch_honours_contract() -> Result<()> {
    init_tracing();
    let config = PoolConfig::builder()
        .worker_count(3)
        .batch_timeout(Duration::from_secs(10))
        .build()?;
    let tasks = shuffled_tasks(20, 9);
    let processor = SimulatedProcessor::with_seed(quick_params(0.1), 2024)?;

    let started = Instant::now();
    let results = WorkerPool::from_config(&config)
        .process_tasks(&config.cancel_signal(), tasks.clone(), processor)
        .await?;
    let summary = BatchSummary::from_results(&results, started.elapsed());

    assert_batch_contract(&tasks, &results, 3)?;
    assert_eq!(summary.total, 20);
    assert_eq!(summary.successful + summary.failed, 20);
    assert_eq!(summary.cancelled, 0);

    for result in &results {
        if let Some(output) = result.output() {
            let task = tasks
                .iter()
                .find(|task| task.id == result.task_id())
                .expect("result maps to a submitted task");
            assert_eq!(output, simulated_output(task));
        }
    }
    Ok(())
}

#[tokio::test]
async fn simulated_batch_without_failures_succeeds_fully() -> Result<()> {
    init_tracing();
    let tasks = shuffled_tasks(10, 8);
    let results = WorkerPool::new(4)
        .process_tasks(
            &CancelSignal::new(),
            tasks.clone(),
            SimulatedProcessor::with_seed(quick_params(0.0), 1)?,
        )
        .await?;

    let summary = BatchSummary::from_results(&results, Duration::ZERO);
    assert_eq!(summary.successful, 10);
    assert!((summary.success_rate() - 100.0).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn simulated_batch_with_tight_deadline_is_cancelled() -> Result<()> {
    init_tracing();
    let params = SimulationParams {
        min_duration: Duration::from_secs(5),
        max_duration: Duration::from_secs(6),
        failure_rate: 0.0,
    };
    let tasks = shuffled_tasks(6, 7);
    let results = WorkerPool::new(2)
        .process_tasks(
            &CancelSignal::with_timeout(Duration::from_millis(20)),
            tasks.clone(),
            SimulatedProcessor::with_seed(params, 5)?,
        )
        .await?;

    assert_batch_contract(&tasks, &results, 2)?;
    let summary = BatchSummary::from_results(&results, Duration::ZERO);
    assert_eq!(summary.cancelled, 6);
    assert_eq!(summary.success_rate(), 0.0);
    Ok(())
}
