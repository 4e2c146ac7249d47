use std::time::Duration;

use crate::support::helpers::{
    assert_batch_contract, expected_output, init_tracing, shuffled_tasks, RecordingProcessor,
};
use anyhow::{Context, Result};
use batchpool::{CancelReason, CancelSignal, Task, TaskError, WorkerPool};
use tokio::time::{sleep, timeout, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pre_fired_signal_fails_every_task_without_draining_queue() -> Result<()> {
    init_tracing();
    let cancel = CancelSignal::new();
    cancel.cancel();
    let processor = RecordingProcessor::new(Duration::from_secs(30));
    let tasks = shuffled_tasks(10, 1);

    let results = timeout(
        Duration::from_secs(2),
        WorkerPool::new(3).process_tasks(&cancel, tasks.clone(), processor.clone()),
    )
    .await
    .context("cancelled batch should finish promptly")??;

    assert_batch_contract(&tasks, &results, 3)?;
    assert_eq!(
        processor.calls().len(),
        10,
        "queued tasks are still handed to the processor"
    );
    for result in &results {
        assert_eq!(
            result.error(),
            Some(&TaskError::cancelled(result.task_id(), CancelReason::Cancelled))
        );
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deadline_fails_remaining_tasks_mid_batch() -> Result<()> {
    init_tracing();
    // One worker, 40ms per task, 100ms deadline: the first couple finish, the rest do not.
    let cancel = CancelSignal::with_timeout(Duration::from_millis(100));
    let processor = RecordingProcessor::new(Duration::from_millis(40));
    let tasks = shuffled_tasks(8, 2);
    let started = Instant::now();

    let results = WorkerPool::new(1)
        .process_tasks(&cancel, tasks.clone(), processor)
        .await?;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_batch_contract(&tasks, &results, 1)?;

    let succeeded: Vec<_> = results.iter().filter(|r| r.is_success()).collect();
    let expired: Vec<_> = results
        .iter()
        .filter(|r| {
            r.error() == Some(&TaskError::cancelled(r.task_id(), CancelReason::DeadlineExceeded))
        })
        .collect();
    assert!(!succeeded.is_empty(), "tasks before the deadline complete");
    assert!(!expired.is_empty(), "tasks after the deadline fail");
    assert_eq!(succeeded.len() + expired.len(), results.len());
    for result in succeeded {
        assert_eq!(result.output(), Some(expected_output(result.task_id()).as_str()));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn explicit_cancel_interrupts_in_flight_tasks() -> Result<()> {
    init_tracing();
    let cancel = CancelSignal::new();
    let processor = RecordingProcessor::new(Duration::from_secs(30));
    let tasks = shuffled_tasks(6, 4);

    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        })
    };

    let results = timeout(
        Duration::from_secs(2),
        WorkerPool::new(2).process_tasks(&cancel, tasks.clone(), processor),
    )
    .await
    .context("in-flight tasks should observe cancellation")??;
    trigger.await?;

    assert_batch_contract(&tasks, &results, 2)?;
    assert!(results
        .iter()
        .all(|result| result.error().map(TaskError::is_cancellation) == Some(true)));
    Ok(())
}

#[tokio::test]
async fn ordinary_failures_are_data_not_errors() -> Result<()> {
    init_tracing();
    let tasks = shuffled_tasks(9, 6);
    let results = WorkerPool::new(3)
        .process_tasks(
            &CancelSignal::new(),
            tasks.clone(),
            RecordingProcessor::with_failures(Duration::from_millis(1), |id| id % 2 == 1),
        )
        .await?;

    assert_batch_contract(&tasks, &results, 3)?;
    for result in &results {
        if result.task_id() % 2 == 1 {
            assert_eq!(
                result.error(),
                Some(&TaskError::failed(result.task_id(), "recorded failure"))
            );
        } else {
            assert!(result.is_success());
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_processor_still_yields_one_result_per_task() -> Result<()> {
    init_tracing();
    let tasks = shuffled_tasks(7, 10);
    let processor = |_cancel: CancelSignal, task: Task| async move {
        if task.id == 4 {
            panic!("task {} is poisoned", task.id);
        }
        Ok::<_, TaskError>(expected_output(task.id))
    };

    let results = WorkerPool::new(2)
        .process_tasks(&CancelSignal::new(), tasks.clone(), processor)
        .await?;

    assert_batch_contract(&tasks, &results, 2)?;
    for result in &results {
        if result.task_id() == 4 {
            assert!(result.error().is_some_and(TaskError::is_panic));
        } else {
            assert_eq!(result.output(), Some(expected_output(result.task_id()).as_str()));
        }
    }
    Ok(())
}
