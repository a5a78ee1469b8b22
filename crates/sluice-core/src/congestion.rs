//! AIMD congestion control over scheduling rounds.
//!
//! The controller owns the only mutable scheduling state of a run: how many
//! fetches the next round may dispatch and how long to wait before it.
//! It is updated once per round with the round's net verdict.
//!
//! # Update rule
//!
//! ```text
//! success-only round:  concurrency += 1 (<= max)   delay = (delay - 1) / 2, or 0 below 1s
//! any transport error: concurrency -= 1 (>= 1)     delay = (delay + 1) * 2 once concurrency is 1,
//!                                                   delay + 1 while still retracting parallelism
//! neither:             unchanged
//!
//! delay reaches max_wait ──> next delay_before_round() returns Saturated (breaker trip)
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::SchedulerConfig;

/// Net verdict of one round, as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundSignal {
    /// Only successes: speed up.
    Improving,
    /// At least one transport error: back off. Failure dominates mixed rounds.
    Backoff,
    /// Nothing that says anything about the server (e.g. only not-found pages).
    Neutral,
}

impl RoundSignal {
    pub fn from_counts(successes: usize, failures: usize) -> Self {
        if failures > 0 {
            RoundSignal::Backoff
        } else if successes > 0 {
            RoundSignal::Improving
        } else {
            RoundSignal::Neutral
        }
    }
}

impl fmt::Display for RoundSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundSignal::Improving => write!(f, "improving"),
            RoundSignal::Backoff => write!(f, "backoff"),
            RoundSignal::Neutral => write!(f, "neutral"),
        }
    }
}

/// Snapshot of the controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchedulerState {
    /// Always within `[1, max_concurrency]`.
    pub concurrency: usize,
    /// Always within `[0, max_wait]`.
    pub delay_secs: f64,
    /// Transport errors seen so far. Diagnostic only.
    pub error_count: u64,
}

/// The breaker tripped: backoff reached its ceiling without helping.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error(
    "delay saturated at {delay_secs:.2}s (max wait {max_wait_secs:.2}s) after {error_count} transport errors"
)]
pub struct Saturated {
    pub delay_secs: f64,
    pub max_wait_secs: f64,
    pub error_count: u64,
}

/// Round-level AIMD rate controller with a saturation breaker.
#[derive(Debug, Clone)]
pub struct CongestionController {
    max_wait_secs: f64,
    max_concurrency: usize,
    state: SchedulerState,
}

impl CongestionController {
    pub fn new(config: &SchedulerConfig) -> Self {
        let max_concurrency = config.max_concurrency.max(1);
        let max_wait_secs = config.max_wait_secs.max(0.0);
        Self {
            max_wait_secs,
            max_concurrency,
            state: SchedulerState {
                concurrency: config.initial_concurrency.clamp(1, max_concurrency),
                delay_secs: config.initial_delay_secs.clamp(0.0, max_wait_secs),
                error_count: 0,
            },
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn max_wait_secs(&self) -> f64 {
        self.max_wait_secs
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn is_saturated(&self) -> bool {
        self.state.delay_secs >= self.max_wait_secs
    }

    /// How long to sleep before the next round, or the breaker trip.
    pub fn delay_before_round(&self) -> Result<Duration, Saturated> {
        if self.is_saturated() {
            return Err(Saturated {
                delay_secs: self.state.delay_secs,
                max_wait_secs: self.max_wait_secs,
                error_count: self.state.error_count,
            });
        }
        // Unvalidated configs can hold delays no `Duration` can represent.
        Ok(Duration::try_from_secs_f64(self.state.delay_secs).unwrap_or(Duration::MAX))
    }

    pub fn concurrency_for_round(&self) -> usize {
        self.state.concurrency
    }

    /// Apply one update step for a finished round.
    ///
    /// `failures` counts transport errors only; not-found outcomes are neutral
    /// and must not be passed in either count.
    pub fn on_round_complete(&mut self, successes: usize, failures: usize) -> RoundSignal {
        let signal = RoundSignal::from_counts(successes, failures);
        self.state.error_count += failures as u64;

        match signal {
            RoundSignal::Improving => self.speed_up(),
            RoundSignal::Backoff => self.back_off(),
            RoundSignal::Neutral => {}
        }

        tracing::debug!(
            %signal,
            successes,
            failures,
            concurrency = self.state.concurrency,
            delay_secs = self.state.delay_secs,
            "Controller updated"
        );

        if signal == RoundSignal::Backoff && self.is_saturated() {
            tracing::warn!(
                delay_secs = self.state.delay_secs,
                max_wait_secs = self.max_wait_secs,
                "Backoff delay reached its ceiling"
            );
        }

        signal
    }

    fn speed_up(&mut self) {
        self.state.concurrency = (self.state.concurrency + 1).min(self.max_concurrency);
        self.state.delay_secs = if self.state.delay_secs >= 1.0 {
            (self.state.delay_secs - 1.0) / 2.0
        } else {
            0.0
        };
    }

    fn back_off(&mut self) {
        self.state.concurrency = self.state.concurrency.saturating_sub(1).max(1);

        let delay = self.state.delay_secs;
        // Exponential only once parallelism is fully retracted.
        let next = if self.state.concurrency == 1 && delay < self.max_wait_secs {
            (delay + 1.0) * 2.0
        } else {
            delay + 1.0
        };
        self.state.delay_secs = next.min(self.max_wait_secs);
    }
}
