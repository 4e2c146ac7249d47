use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use batchpool::runtime::config::parse_env;
use batchpool::{
    spawn_metrics_reporter, BatchSummary, CancelSignal, PoolConfig, SimulatedProcessor,
    SimulationParams, Task, TaskProcessor, TaskResult, WorkerPool,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio_util::sync::CancellationToken;

const DEFAULT_TASK_COUNT: usize = 20;
const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_LOG_DIRECTIVE: &str = "warn";

#[tokio::main]
async fn main() -> Result<()> {
    init_demo_tracing();

    let args = DemoArgs::from_env()?;
    let config = PoolConfig::from_env()?;
    let cancel = match config.batch_timeout() {
        Some(_) => config.cancel_signal(),
        None => CancelSignal::with_timeout(DEFAULT_BATCH_TIMEOUT),
    };

    let simulated = match args.seed {
        Some(seed) => SimulatedProcessor::with_seed(SimulationParams::default(), seed)?,
        None => SimulatedProcessor::new(SimulationParams::default())?,
    };
    let simulated = Arc::new(simulated);

    let bar = build_progress_bar(args.task_count as u64);
    let processor = {
        let bar = bar.clone();
        move |cancel: CancelSignal, task: Task| {
            let simulated = simulated.clone();
            let bar = bar.clone();
            async move {
                let outcome = simulated.process(cancel, task).await;
                bar.inc(1);
                outcome
            }
        }
    };

    let tasks: Vec<Task> = (0..args.task_count as u64)
        .map(|id| Task::new(id, format!("data-{id}")))
        .collect();

    let pool = WorkerPool::from_config(&config);
    let reporter_shutdown = CancellationToken::new();
    let reporter = spawn_metrics_reporter(
        pool.telemetry(),
        reporter_shutdown.clone(),
        config.metrics_interval(),
    );

    bar.println(format!(
        "Processing {} tasks with {} workers...",
        tasks.len(),
        pool.worker_count()
    ));
    let started = Instant::now();
    let results = pool
        .process_tasks(&cancel, tasks, processor)
        .await
        .context("batch processing failed")?;
    let elapsed = started.elapsed();
    bar.finish_and_clear();

    reporter_shutdown.cancel();
    let _ = reporter.await;

    print_results(&results);
    print_summary(&BatchSummary::from_results(&results, elapsed));
    Ok(())
}

fn init_demo_tracing() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", DEFAULT_LOG_DIRECTIVE);
    }
    batchpool::init_tracing();
}

fn build_progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::stdout_with_hz(12));
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tasks ({per_sec:.2} tasks/s)",
    )
    .expect("valid progress bar template")
    .progress_chars("=>-");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn print_results(results: &[TaskResult]) {
    println!("\n=== Results ===");
    for result in results {
        match result.outcome() {
            Ok(output) => println!(
                "Task {}: SUCCESS (Worker {}) -> {}",
                result.task_id(),
                result.worker_id(),
                output
            ),
            Err(error) => println!(
                "Task {}: FAILED (Worker {}) -> {}",
                result.task_id(),
                result.worker_id(),
                error
            ),
        }
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("\n=== Summary ===");
    println!("Total tasks: {}", summary.total);
    println!("Successful: {}", summary.successful);
    println!("Failed: {} ({} cancelled)", summary.failed, summary.cancelled);
    println!("Processing time: {:?}", summary.elapsed);
    println!("Success rate: {:.1}%", summary.success_rate());
}

struct DemoArgs {
    task_count: usize,
    seed: Option<u64>,
}

impl DemoArgs {
    fn from_env() -> Result<Self> {
        let task_count = parse_env::<usize>("BATCHPOOL_TASKS")?.unwrap_or(DEFAULT_TASK_COUNT);
        let seed = parse_env::<u64>("BATCHPOOL_SEED")?;

        ensure!(task_count > 0, "BATCHPOOL_TASKS must be greater than 0");

        Ok(Self { task_count, seed })
    }
}
