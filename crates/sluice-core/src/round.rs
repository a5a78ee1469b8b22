use std::collections::HashMap;

use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::congestion::{CongestionController, RoundSignal, Saturated, SchedulerState};
use crate::fetch::FetchWorker;
use crate::models::{FetchOutcome, RoundBatch, Target, TransportErrorKind, TransportResponse};
use crate::queue::TargetQueue;
use crate::traits::{ItemExtractor, Transport, ValidityPredicate};

/// Tally and product of one completed round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub round: u64,
    pub dispatched: usize,
    pub succeeded: usize,
    pub not_found: usize,
    /// Transport errors; each of these targets went back on the queue.
    pub failed: usize,
    /// Successes the extractor found nothing in.
    pub extraction_misses: usize,
    pub signal: RoundSignal,
    /// Controller state after this round's update.
    pub state: SchedulerState,
    pub batch: RoundBatch,
}

/// What a call to [`RoundExecutor::run_round`] ended with.
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    Completed(RoundReport),
    /// The queue was empty; nothing was dispatched.
    NoWork,
    /// Cancelled at a suspension point. Any dispatched targets were requeued.
    Cancelled { requeued: usize },
}

/// Runs bulk-synchronous rounds: wait, dequeue, fan out, join all, classify, update.
///
/// Owns the queue and the controller; nothing else mutates either.
pub struct RoundExecutor<T, P, X>
where
    T: Transport,
    P: ValidityPredicate,
    X: ItemExtractor,
{
    queue: TargetQueue,
    controller: CongestionController,
    worker: FetchWorker<T, P>,
    extractor: X,
    rounds_started: u64,
}

impl<T, P, X> RoundExecutor<T, P, X>
where
    T: Transport,
    P: ValidityPredicate,
    X: ItemExtractor,
{
    pub fn new(
        queue: TargetQueue,
        controller: CongestionController,
        worker: FetchWorker<T, P>,
        extractor: X,
    ) -> Self {
        Self {
            queue,
            controller,
            worker,
            extractor,
            rounds_started: 0,
        }
    }

    pub fn queue(&self) -> &TargetQueue {
        &self.queue
    }

    pub fn controller(&self) -> &CongestionController {
        &self.controller
    }

    pub fn rounds_started(&self) -> u64 {
        self.rounds_started
    }

    /// Run one round.
    ///
    /// Returns `Err(Saturated)` before touching the queue when the breaker has tripped.
    pub async fn run_round(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<RoundOutcome, Saturated> {
        let delay = self.controller.delay_before_round()?;
        if self.queue.is_empty() {
            return Ok(RoundOutcome::NoWork);
        }
        if !delay.is_zero() {
            tracing::debug!(delay_secs = delay.as_secs_f64(), "Waiting before next round");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return Ok(RoundOutcome::Cancelled { requeued: 0 }),
            }
        }
        if cancel.is_cancelled() {
            return Ok(RoundOutcome::Cancelled { requeued: 0 });
        }

        let concurrency = self.controller.concurrency_for_round();
        let targets = self.queue.dequeue_up_to(concurrency);
        if targets.is_empty() {
            return Ok(RoundOutcome::NoWork);
        }

        self.rounds_started += 1;
        let round = self.rounds_started;
        let dispatched = targets.len();
        tracing::debug!(round, dispatched, concurrency, "Dispatching round");

        let outcomes = match self.fan_out(targets.clone(), cancel).await {
            Some(outcomes) => outcomes,
            None => {
                for target in targets {
                    self.queue.requeue(target);
                }
                tracing::info!(round, requeued = dispatched, "Round cancelled in flight");
                return Ok(RoundOutcome::Cancelled {
                    requeued: dispatched,
                });
            }
        };

        let mut succeeded = 0;
        let mut not_found = 0;
        let mut failed = 0;
        let mut payloads: Vec<(Target, TransportResponse)> = Vec::with_capacity(dispatched);

        for outcome in outcomes {
            match outcome {
                FetchOutcome::Success { payload, target } => {
                    succeeded += 1;
                    payloads.push((target, payload));
                }
                FetchOutcome::NotFound { .. } => {
                    not_found += 1;
                }
                FetchOutcome::TransportError { target, .. } => {
                    failed += 1;
                    self.queue.requeue(target);
                }
            }
        }

        let signal = self.controller.on_round_complete(succeeded, failed);

        let mut batch = RoundBatch::new(round);
        let mut extraction_misses = 0;
        for (target, payload) in payloads {
            match self.extractor.extract(&payload.body, &payload.final_url) {
                Some(item) => batch.items.push(item),
                None => {
                    extraction_misses += 1;
                    tracing::debug!(url = %target, final_url = %payload.final_url, "Nothing extracted");
                }
            }
        }

        Ok(RoundOutcome::Completed(RoundReport {
            round,
            dispatched,
            succeeded,
            not_found,
            failed,
            extraction_misses,
            signal,
            state: self.controller.state(),
            batch,
        }))
    }

    /// Spawn one task per target and wait for all of them.
    ///
    /// Outcomes come back in completion order. `None` means the wait was
    /// cancelled and every task aborted.
    async fn fan_out(
        &self,
        targets: Vec<Target>,
        cancel: &CancellationToken,
    ) -> Option<Vec<FetchOutcome>> {
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<task::Id, Target> = HashMap::with_capacity(targets.len());

        for target in targets {
            let worker = self.worker.clone();
            let handle = tasks.spawn({
                let target = target.clone();
                async move { worker.fetch(target).await }
            });
            in_flight.insert(handle.id(), target);
        }

        let mut outcomes = Vec::with_capacity(in_flight.len());
        loop {
            let joined = tokio::select! {
                joined = tasks.join_next_with_id() => joined,
                () = cancel.cancelled() => {
                    tasks.abort_all();
                    return None;
                }
            };

            match joined {
                None => break,
                Some(Ok((id, outcome))) => {
                    in_flight.remove(&id);
                    outcomes.push(outcome);
                }
                Some(Err(e)) => {
                    // A panicked fetch still owes us its target.
                    if let Some(target) = in_flight.remove(&e.id()) {
                        tracing::error!(url = %target, error = %e, "Fetch task failed");
                        outcomes.push(FetchOutcome::TransportError {
                            kind: TransportErrorKind::Unknown,
                            message: e.to_string(),
                            target,
                        });
                    }
                }
            }
        }

        Some(outcomes)
    }
}
