use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ExtractedItem, RoundBatch};
use crate::traits::BatchStore;

/// On-disk shape of one persisted round.
#[derive(Debug, Serialize)]
struct BatchDocument<'a> {
    batch_id: Uuid,
    round: u64,
    created_at: DateTime<Utc>,
    items: &'a [ExtractedItem],
}

/// Where a batch ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBatch {
    pub id: Uuid,
    pub name: String,
    pub items: usize,
}

/// Serialises each round's batch as one self-contained JSON unit.
///
/// Every unit gets a fresh UUID name, so nothing is ever overwritten and a
/// failure on one batch leaves the others untouched.
#[derive(Clone)]
pub struct ResultSink<S: BatchStore> {
    store: S,
}

impl<S: BatchStore> ResultSink<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist a batch. Empty batches are skipped and yield `None`.
    pub async fn persist(&self, batch: RoundBatch) -> Result<Option<PersistedBatch>, AppError> {
        if batch.is_empty() {
            tracing::debug!(round = batch.round, "Empty batch, nothing to persist");
            return Ok(None);
        }

        let id = Uuid::new_v4();
        let name = format!("{id}.json");
        let document = BatchDocument {
            batch_id: id,
            round: batch.round,
            created_at: Utc::now(),
            items: &batch.items,
        };
        let contents = serde_json::to_vec_pretty(&document)?;

        self.store.write(&name, &contents).await?;
        tracing::info!(round = batch.round, items = batch.len(), %name, "Batch persisted");

        Ok(Some(PersistedBatch {
            id,
            name,
            items: batch.len(),
        }))
    }
}
