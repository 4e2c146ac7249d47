use crate::runtime::cancel::CancelSignal;
use crate::runtime::telemetry;
use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_WORKER_COUNT: usize = 3;

pub const WORKERS_ENV: &str = "BATCHPOOL_WORKERS";
pub const TIMEOUT_MS_ENV: &str = "BATCHPOOL_TIMEOUT_MS";
pub const METRICS_INTERVAL_MS_ENV: &str = "BATCHPOOL_METRICS_INTERVAL_MS";

/// Runtime configuration for a worker pool.
///
/// All instances must be constructed via [`PoolConfig::builder`], [`PoolConfig::new`], or
/// [`PoolConfig::from_env`] so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    worker_count: usize,
    batch_timeout: Option<Duration>,
    metrics_interval: Duration,
}

pub struct PoolConfigParams {
    pub worker_count: usize,
    pub batch_timeout: Option<Duration>,
    pub metrics_interval: Duration,
}

impl PoolConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: PoolConfigParams) -> Result<Self> {
        let PoolConfigParams {
            worker_count,
            batch_timeout,
            metrics_interval,
        } = params;

        let config = Self {
            worker_count,
            batch_timeout,
            metrics_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reads `BATCHPOOL_WORKERS`, `BATCHPOOL_TIMEOUT_MS`, and `BATCHPOOL_METRICS_INTERVAL_MS`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder().worker_count(
            parse_env::<usize>(WORKERS_ENV)?.unwrap_or(DEFAULT_WORKER_COUNT),
        );
        if let Some(ms) = parse_env::<u64>(TIMEOUT_MS_ENV)? {
            builder = builder.batch_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_env::<u64>(METRICS_INTERVAL_MS_ENV)? {
            builder = builder.metrics_interval(Duration::from_millis(ms));
        }
        builder.build()
    }

    /// Number of concurrent workers launched per batch.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Deadline applied to each batch, if any.
    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Builds a fresh cancellation signal for one batch, carrying the configured deadline.
    pub fn cancel_signal(&self) -> CancelSignal {
        match self.batch_timeout {
            Some(timeout) => CancelSignal::with_timeout(timeout),
            None => CancelSignal::new(),
        }
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            bail!("worker_count must be greater than 0");
        }

        if matches!(self.batch_timeout, Some(timeout) if timeout.is_zero()) {
            bail!("batch_timeout must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct PoolConfigBuilder {
    worker_count: Option<usize>,
    batch_timeout: Option<Duration>,
    metrics_interval: Option<Duration>,
}

impl PoolConfigBuilder {
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<PoolConfig> {
        let params = PoolConfigParams {
            worker_count: self.worker_count.context("worker_count is required")?,
            batch_timeout: self.batch_timeout,
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        PoolConfig::new(params)
    }
}

/// Reads and parses `key` from the environment. Surrounding whitespace is ignored and an
/// unset or blank variable yields `None`.
pub fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {key}")),
    }
}
