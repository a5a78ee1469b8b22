use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::congestion::{Saturated, SchedulerState};
use crate::error::AppError;
use crate::round::{RoundExecutor, RoundOutcome, RoundReport};
use crate::sink::{PersistedBatch, ResultSink};
use crate::traits::{BatchStore, ItemExtractor, Transport, ValidityPredicate};

/// Lifecycle of a run.
///
/// ```text
/// Running ──round ok──> Running | Draining (empty batch, work left)
///    │  ──no work────> Done
///    │  ──saturated──> Tripped
///    └──cancelled───> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverState {
    Running,
    Draining,
    Tripped,
    Done,
    Cancelled,
}

impl DriverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverState::Running => "running",
            DriverState::Draining => "draining",
            DriverState::Tripped => "tripped",
            DriverState::Done => "done",
            DriverState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DriverState::Tripped | DriverState::Done | DriverState::Cancelled
        )
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub state: DriverState,
    pub rounds: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub not_found: u64,
    pub transport_errors: u64,
    pub extraction_misses: u64,
    pub items_extracted: u64,
    pub batches_written: u64,
    pub batches_failed: u64,
    pub remaining: usize,
    pub controller: SchedulerState,
    pub elapsed: Duration,
}

impl RunSummary {
    fn record(&mut self, report: &RoundReport) {
        self.rounds += 1;
        self.dispatched += report.dispatched as u64;
        self.succeeded += report.succeeded as u64;
        self.not_found += report.not_found as u64;
        self.transport_errors += report.failed as u64;
        self.extraction_misses += report.extraction_misses as u64;
        self.items_extracted += report.batch.len() as u64;
        self.controller = report.state;
    }
}

/// Events emitted by the driver for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    Started {
        targets: usize,
        max_concurrency: usize,
        max_wait_secs: f64,
    },
    StateChanged {
        from: DriverState,
        to: DriverState,
    },
    RoundCompleted {
        report: &'a RoundReport,
        queued: usize,
    },
    BatchPersisted {
        round: u64,
        batch: &'a PersistedBatch,
    },
    BatchFailed {
        round: u64,
        error: &'a AppError,
    },
    Tripped {
        saturated: &'a Saturated,
    },
    Finished {
        summary: &'a RunSummary,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::Started {
                targets,
                max_concurrency,
                max_wait_secs,
            } => {
                tracing::info!(%targets, %max_concurrency, %max_wait_secs, "Run started");
            }
            RunEvent::StateChanged { from, to } => {
                tracing::debug!(%from, %to, "Driver state changed");
            }
            RunEvent::RoundCompleted { report, queued } => {
                if report.failed > 0 {
                    tracing::warn!(
                        round = report.round,
                        failed = report.failed,
                        concurrency = report.state.concurrency,
                        delay_secs = report.state.delay_secs,
                        %queued,
                        "Round had transport errors, backing off"
                    );
                } else {
                    tracing::info!(
                        round = report.round,
                        dispatched = report.dispatched,
                        extracted = report.batch.len(),
                        not_found = report.not_found,
                        concurrency = report.state.concurrency,
                        delay_secs = report.state.delay_secs,
                        %queued,
                        "Round completed"
                    );
                }
            }
            RunEvent::BatchPersisted { round, batch } => {
                tracing::debug!(%round, name = %batch.name, items = batch.items, "Batch stored");
            }
            RunEvent::BatchFailed { round, error } => {
                tracing::error!(%round, %error, "Failed to persist batch");
            }
            RunEvent::Tripped { saturated } => {
                tracing::error!(error = %saturated, "Circuit breaker tripped, halting run");
            }
            RunEvent::Finished { summary } => {
                tracing::info!(
                    state = %summary.state,
                    rounds = summary.rounds,
                    extracted = summary.items_extracted,
                    not_found = summary.not_found,
                    transport_errors = summary.transport_errors,
                    batches = summary.batches_written,
                    remaining = summary.remaining,
                    elapsed_secs = summary.elapsed.as_secs_f64(),
                    "Run finished"
                );
            }
        }
    }
}

/// Repeats rounds until the queue drains, the breaker trips, or the run is cancelled.
pub struct Driver<T, P, X, S>
where
    T: Transport,
    P: ValidityPredicate,
    X: ItemExtractor,
    S: BatchStore,
{
    executor: RoundExecutor<T, P, X>,
    sink: ResultSink<S>,
    state: DriverState,
}

impl<T, P, X, S> Driver<T, P, X, S>
where
    T: Transport,
    P: ValidityPredicate,
    X: ItemExtractor,
    S: BatchStore,
{
    pub fn new(executor: RoundExecutor<T, P, X>, sink: ResultSink<S>) -> Self {
        Self {
            executor,
            sink,
            state: DriverState::Running,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn executor(&self) -> &RoundExecutor<T, P, X> {
        &self.executor
    }

    /// Drive rounds to a terminal state.
    ///
    /// Never fails: saturation ends in [`DriverState::Tripped`], and a batch
    /// that cannot be written is reported and counted without stopping the run.
    pub async fn run<R: RunReporter>(
        &mut self,
        cancel: CancellationToken,
        reporter: &R,
    ) -> RunSummary {
        let started = Instant::now();
        let controller = self.executor.controller();
        reporter.report(RunEvent::Started {
            targets: self.executor.queue().len(),
            max_concurrency: controller.max_concurrency(),
            max_wait_secs: controller.max_wait_secs(),
        });

        let mut summary = RunSummary {
            state: self.state,
            rounds: 0,
            dispatched: 0,
            succeeded: 0,
            not_found: 0,
            transport_errors: 0,
            extraction_misses: 0,
            items_extracted: 0,
            batches_written: 0,
            batches_failed: 0,
            remaining: 0,
            controller: controller.state(),
            elapsed: Duration::ZERO,
        };

        while !self.state.is_terminal() {
            let next = match self.executor.run_round(&cancel).await {
                Err(saturated) => {
                    reporter.report(RunEvent::Tripped {
                        saturated: &saturated,
                    });
                    DriverState::Tripped
                }
                Ok(RoundOutcome::NoWork) if self.executor.queue().is_empty() => DriverState::Done,
                Ok(RoundOutcome::NoWork) => DriverState::Running,
                Ok(RoundOutcome::Cancelled { .. }) => DriverState::Cancelled,
                Ok(RoundOutcome::Completed(report)) => {
                    self.finish_round(report, &mut summary, reporter).await
                }
            };
            self.transition(next, reporter);
        }

        summary.state = self.state;
        summary.remaining = self.executor.queue().len();
        summary.controller = self.executor.controller().state();
        summary.elapsed = started.elapsed();
        reporter.report(RunEvent::Finished { summary: &summary });
        summary
    }

    async fn finish_round<R: RunReporter>(
        &self,
        report: RoundReport,
        summary: &mut RunSummary,
        reporter: &R,
    ) -> DriverState {
        summary.record(&report);
        reporter.report(RunEvent::RoundCompleted {
            report: &report,
            queued: self.executor.queue().len(),
        });

        let round = report.round;
        let empty_batch = report.batch.is_empty();
        match self.sink.persist(report.batch).await {
            Ok(Some(batch)) => {
                summary.batches_written += 1;
                reporter.report(RunEvent::BatchPersisted {
                    round,
                    batch: &batch,
                });
            }
            Ok(None) => {}
            Err(error) => {
                summary.batches_failed += 1;
                reporter.report(RunEvent::BatchFailed {
                    round,
                    error: &error,
                });
            }
        }

        if empty_batch && !self.executor.queue().is_empty() {
            DriverState::Draining
        } else {
            DriverState::Running
        }
    }

    fn transition<R: RunReporter>(&mut self, to: DriverState, reporter: &R) {
        if self.state != to {
            reporter.report(RunEvent::StateChanged {
                from: self.state,
                to,
            });
            self.state = to;
        }
    }
}
