pub mod config;
pub mod congestion;
pub mod driver;
pub mod error;
pub mod fetch;
pub mod models;
pub mod queue;
pub mod round;
pub mod sink;
pub mod traits;

#[cfg(test)]
mod testutil;

pub use config::{FetchTimeout, SchedulerConfig};
pub use congestion::{CongestionController, RoundSignal, Saturated, SchedulerState};
pub use driver::{Driver, DriverState, RunEvent, RunReporter, RunSummary, TracingRunReporter};
pub use error::AppError;
pub use fetch::FetchWorker;
pub use models::{
    ExtractedItem, FetchOutcome, RoundBatch, Target, TransportErrorKind, TransportResponse,
};
pub use queue::TargetQueue;
pub use round::{RoundExecutor, RoundOutcome, RoundReport};
pub use sink::{PersistedBatch, ResultSink};
pub use traits::{BatchStore, ItemExtractor, Transport, ValidityPredicate};
