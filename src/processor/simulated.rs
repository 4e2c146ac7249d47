use super::{ProcessFuture, TaskProcessor};
use crate::runtime::cancel::CancelSignal;
use crate::task::{Task, TaskError};
use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT_MIN_DURATION_MS: u64 = 50;
const DEFAULT_MAX_DURATION_MS: u64 = 200;
const DEFAULT_FAILURE_RATE: f64 = 0.1;

/// Knobs for the simulated workload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Inclusive lower bound of the simulated processing time.
    pub min_duration: Duration,
    /// Exclusive upper bound of the simulated processing time.
    pub max_duration: Duration,
    /// Probability in `[0.0, 1.0]` that a task fails after its processing time elapses.
    pub failure_rate: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            min_duration: Duration::from_millis(DEFAULT_MIN_DURATION_MS),
            max_duration: Duration::from_millis(DEFAULT_MAX_DURATION_MS),
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_duration > self.max_duration {
            bail!("min_duration must not exceed max_duration");
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            bail!("failure_rate must be within 0.0..=1.0");
        }
        Ok(())
    }
}

/// Processor that sleeps for a random duration and fails a fraction of tasks.
///
/// Randomness comes from an owned [`StdRng`], so seeded instances are reproducible and
/// independent of each other.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    params: SimulationParams,
    rng: Arc<Mutex<StdRng>>,
}

impl SimulatedProcessor {
    pub fn new(params: SimulationParams) -> Result<Self> {
        Self::with_rng(params, StdRng::from_entropy())
    }

    pub fn with_seed(params: SimulationParams, seed: u64) -> Result<Self> {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: SimulationParams, rng: StdRng) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            rng: Arc::new(Mutex::new(rng)),
        })
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    fn draw(&self) -> (Duration, bool) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let min = self.params.min_duration;
        let max = self.params.max_duration;
        let delay = if min < max {
            rng.gen_range(min..max)
        } else {
            min
        };
        let fails = rng.gen_bool(self.params.failure_rate);
        (delay, fails)
    }
}

/// Output produced for a successfully simulated task.
pub fn simulated_output(task: &Task) -> String {
    format!(
        "processed-{}-result-{}",
        task.data,
        task.id.saturating_mul(2)
    )
}

impl TaskProcessor for SimulatedProcessor {
    fn process(&self, cancel: CancelSignal, task: Task) -> ProcessFuture {
        let (delay, fails) = self.draw();
        Box::pin(async move {
            tokio::select! {
                biased;
                reason = cancel.cancelled() => Err(TaskError::cancelled(task.id, reason)),
                _ = sleep(delay) => {
                    if fails {
                        Err(TaskError::failed(task.id, "simulated failure"))
                    } else {
                        Ok(simulated_output(&task))
                    }
                }
            }
        })
    }
}
