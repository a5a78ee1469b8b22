use std::future::Future;

use crate::config::FetchTimeout;
use crate::error::AppError;
use crate::models::{ExtractedItem, TransportResponse};

/// Performs one GET request-response exchange.
///
/// `timeout.total()` is a hard deadline for the whole exchange. Per-phase
/// connect and read limits may be fixed when the transport is built, so the
/// per-call phase values are only guaranteed to hold through that total.
/// Expiry is reported as [`AppError::Timeout`]; refused or reset connections
/// stay distinct as [`AppError::NetworkError`].
pub trait Transport: Send + Sync + Clone + 'static {
    fn perform_request(
        &self,
        url: &str,
        timeout: FetchTimeout,
    ) -> impl Future<Output = Result<TransportResponse, AppError>> + Send;
}

/// Decides whether a response carries a real item or a "not found" page.
pub trait ValidityPredicate: Send + Sync + Clone + 'static {
    fn is_valid_result(&self, response: &TransportResponse) -> bool;
}

/// Pulls the interesting fragment out of a response body.
pub trait ItemExtractor: Send + Sync {
    /// Returns `None` when the page holds nothing to extract.
    fn extract(&self, body: &str, final_url: &str) -> Option<ExtractedItem>;
}

/// Append-only sink for named, immutable blobs.
pub trait BatchStore: Send + Sync + Clone {
    /// Write `contents` under `name`. Must fail rather than overwrite.
    fn write(&self, name: &str, contents: &[u8])
    -> impl Future<Output = Result<(), AppError>> + Send;
}
