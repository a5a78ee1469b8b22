use std::time::Duration;

use crate::error::AppError;

/// Connect/read timeout pair bounding every individual fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeout {
    pub connect: Duration,
    pub read: Duration,
}

impl FetchTimeout {
    pub fn new(connect: Duration, read: Duration) -> Self {
        Self { connect, read }
    }

    /// Upper bound on one whole exchange.
    pub fn total(&self) -> Duration {
        self.connect + self.read
    }
}

impl Default for FetchTimeout {
    /// 3.05 s to connect, 27 s to read.
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(3050),
            read: Duration::from_secs(27),
        }
    }
}

/// Constructor-time scheduler settings, fixed for the run.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Ceiling on the inter-round delay, in seconds. Reaching it trips the breaker.
    pub max_wait_secs: f64,

    /// Ceiling on parallel fetches per round.
    pub max_concurrency: usize,

    pub fetch_timeout: FetchTimeout,

    /// Concurrency of the first round (clamped to `[1, max_concurrency]`).
    pub initial_concurrency: usize,

    /// Delay before the first round (clamped to `[0, max_wait_secs]`).
    pub initial_delay_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: 90.0,
            max_concurrency: 10,
            fetch_timeout: FetchTimeout::default(),
            initial_concurrency: 1,
            initial_delay_secs: 0.0,
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_wait(mut self, secs: f64) -> Self {
        self.max_wait_secs = secs;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: FetchTimeout) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Seed the controller instead of starting at concurrency 1, delay 0.
    pub fn with_initial_state(mut self, concurrency: usize, delay_secs: f64) -> Self {
        self.initial_concurrency = concurrency;
        self.initial_delay_secs = delay_secs;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_concurrency == 0 {
            return Err(AppError::ConfigError(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if !self.max_wait_secs.is_finite()
            || self.max_wait_secs <= 0.0
            || Duration::try_from_secs_f64(self.max_wait_secs).is_err()
        {
            return Err(AppError::ConfigError(format!(
                "max_wait must be a positive number of seconds, got {}",
                self.max_wait_secs
            )));
        }
        if !self.initial_delay_secs.is_finite() {
            return Err(AppError::ConfigError(format!(
                "initial delay must be finite, got {}",
                self.initial_delay_secs
            )));
        }
        if self.fetch_timeout.connect.is_zero() || self.fetch_timeout.read.is_zero() {
            return Err(AppError::ConfigError(
                "connect and read timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
