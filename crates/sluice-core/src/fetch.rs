use crate::config::FetchTimeout;
use crate::models::{FetchOutcome, Target, TransportErrorKind};
use crate::traits::{Transport, ValidityPredicate};

/// Runs exactly one attempt against one target and classifies the result.
///
/// No retry logic lives here; retry decisions belong to the round executor.
#[derive(Clone)]
pub struct FetchWorker<T, P>
where
    T: Transport,
    P: ValidityPredicate,
{
    transport: T,
    predicate: P,
    timeout: FetchTimeout,
}

impl<T, P> FetchWorker<T, P>
where
    T: Transport,
    P: ValidityPredicate,
{
    pub fn new(transport: T, predicate: P, timeout: FetchTimeout) -> Self {
        Self {
            transport,
            predicate,
            timeout,
        }
    }

    pub fn timeout(&self) -> FetchTimeout {
        self.timeout
    }

    pub async fn fetch(&self, target: Target) -> FetchOutcome {
        let response = match self
            .transport
            .perform_request(target.url(), self.timeout)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let kind = e.transport_kind();
                tracing::warn!(url = %target, %kind, error = %e, "Fetch failed");
                return FetchOutcome::TransportError {
                    kind,
                    message: e.to_string(),
                    target,
                };
            }
        };

        tracing::debug!(
            url = %target,
            final_url = %response.final_url,
            status = response.status,
            bytes = response.body.len(),
            "Response received"
        );

        if response.is_overloaded() {
            tracing::warn!(url = %target, status = response.status, "Server pushed back");
            return FetchOutcome::TransportError {
                kind: TransportErrorKind::ProtocolError,
                message: format!("HTTP {} for {}", response.status, target),
                target,
            };
        }

        if !self.predicate.is_valid_result(&response) {
            tracing::debug!(url = %target, "Item not found");
            return FetchOutcome::NotFound { target };
        }

        FetchOutcome::Success {
            payload: response,
            target,
        }
    }
}
