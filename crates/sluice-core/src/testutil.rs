//! Test utilities: mock implementations of the collaborator traits.
//!
//! Handwritten mocks for dependency injection in unit tests. Shared state
//! lives behind `Arc<Mutex<_>>` so tests can assert on recorded calls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::FetchTimeout;
use crate::driver::{RunEvent, RunReporter};
use crate::error::AppError;
use crate::models::{ExtractedItem, TransportResponse};
use crate::traits::{BatchStore, ItemExtractor, Transport, ValidityPredicate};

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Scripted reply. `AppError` is not `Clone`, so errors are kept by shape.
#[derive(Debug, Clone)]
enum Reply {
    Page { status: u16, body: String },
    Timeout(f64),
    Network(String),
    Http(String),
    Other(String),
}

impl Reply {
    fn from_error(error: AppError) -> Self {
        match error {
            AppError::Timeout(secs) => Reply::Timeout(secs),
            AppError::NetworkError(msg) => Reply::Network(msg),
            AppError::HttpError(msg) => Reply::Http(msg),
            other => Reply::Other(other.to_string()),
        }
    }

    fn into_result(self, url: &str) -> Result<TransportResponse, AppError> {
        match self {
            Reply::Page { status, body } => Ok(TransportResponse {
                status,
                final_url: url.to_string(),
                body,
            }),
            Reply::Timeout(secs) => Err(AppError::Timeout(secs)),
            Reply::Network(msg) => Err(AppError::NetworkError(msg)),
            Reply::Http(msg) => Err(AppError::HttpError(msg)),
            Reply::Other(msg) => Err(AppError::Generic(msg)),
        }
    }
}

/// Mock transport with per-URL scripted replies.
///
/// Replies registered for the same URL are served in order; the last one
/// sticks for any further calls. Unscripted URLs fail with a network error.
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    latency: Arc<Mutex<HashMap<String, Duration>>>,
    panics: Arc<Mutex<HashSet<String>>>,
    requested: Arc<Mutex<Vec<String>>>,
    timeouts: Arc<Mutex<Vec<FetchTimeout>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, url: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.with_status(url, 200, body)
    }

    pub fn with_status(self, url: &str, status: u16, body: &str) -> Self {
        self.push(
            url,
            Reply::Page {
                status,
                body: body.to_string(),
            },
        )
    }

    pub fn with_error(self, url: &str, error: AppError) -> Self {
        self.push(url, Reply::from_error(error))
    }

    /// Delay every reply for `url` by `latency`.
    pub fn with_latency(self, url: &str, latency: Duration) -> Self {
        self.latency
            .lock()
            .unwrap()
            .insert(url.to_string(), latency);
        self
    }

    /// Panic inside the request for `url`.
    pub fn with_panic(self, url: &str) -> Self {
        self.panics.lock().unwrap().insert(url.to_string());
        self
    }

    /// URLs requested so far, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn timeouts_seen(&self) -> Vec<FetchTimeout> {
        self.timeouts.lock().unwrap().clone()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Transport for MockTransport {
    async fn perform_request(
        &self,
        url: &str,
        timeout: FetchTimeout,
    ) -> Result<TransportResponse, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.timeouts.lock().unwrap().push(timeout);

        let should_panic = self.panics.lock().unwrap().contains(url);
        if should_panic {
            panic!("mock transport exploded for {url}");
        }

        let latency = self.latency.lock().unwrap().get(url).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.next_reply(url) {
            Some(reply) => reply.into_result(url),
            None => Err(AppError::NetworkError(format!("no route to {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockPredicate
// ---------------------------------------------------------------------------

/// Predicate that rejects bodies containing a marker.
#[derive(Clone)]
pub struct MockPredicate {
    marker: Option<String>,
}

impl MockPredicate {
    pub fn marker(marker: &str) -> Self {
        Self {
            marker: Some(marker.to_string()),
        }
    }

    pub fn always_valid() -> Self {
        Self { marker: None }
    }
}

impl ValidityPredicate for MockPredicate {
    fn is_valid_result(&self, response: &TransportResponse) -> bool {
        match &self.marker {
            Some(marker) => !response.body.contains(marker.as_str()),
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Extractor that either echoes the body as the item or finds nothing.
#[derive(Clone)]
pub struct MockExtractor {
    yields: bool,
}

impl MockExtractor {
    /// One item per page: id and url are the final URL, html is the body.
    pub fn from_body() -> Self {
        Self { yields: true }
    }

    pub fn never() -> Self {
        Self { yields: false }
    }
}

impl ItemExtractor for MockExtractor {
    fn extract(&self, body: &str, final_url: &str) -> Option<ExtractedItem> {
        self.yields.then(|| ExtractedItem {
            id: final_url.to_string(),
            url: final_url.to_string(),
            html: body.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// Written blob: (name, contents).
pub type WrittenBlob = (String, Vec<u8>);

/// Store that records writes; queued errors are returned by the next writes.
#[derive(Clone, Default)]
pub struct MockStore {
    written: Arc<Mutex<Vec<WrittenBlob>>>,
    errors: Arc<Mutex<VecDeque<AppError>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first write fails with `error`, later writes succeed.
    pub fn with_write_error(error: AppError) -> Self {
        let store = Self::default();
        store.errors.lock().unwrap().push_back(error);
        store
    }

    pub fn written(&self) -> Vec<WrittenBlob> {
        self.written.lock().unwrap().clone()
    }
}

impl BatchStore for MockStore {
    async fn write(&self, name: &str, contents: &[u8]) -> Result<(), AppError> {
        if let Some(e) = self.errors.lock().unwrap().pop_front() {
            return Err(e);
        }
        self.written
            .lock()
            .unwrap()
            .push((name.to_string(), contents.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RunReporter for MockReporter {
    fn report(&self, event: RunEvent<'_>) {
        let label = match &event {
            RunEvent::Started { .. } => "Started".to_string(),
            RunEvent::StateChanged { to, .. } => format!("State:{to}"),
            RunEvent::RoundCompleted { .. } => "RoundCompleted".to_string(),
            RunEvent::BatchPersisted { .. } => "BatchPersisted".to_string(),
            RunEvent::BatchFailed { .. } => "BatchFailed".to_string(),
            RunEvent::Tripped { .. } => "Tripped".to_string(),
            RunEvent::Finished { .. } => "Finished".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

pub fn make_test_item(id: &str) -> ExtractedItem {
    ExtractedItem {
        id: id.to_string(),
        url: format!("https://example.com/?item={id}"),
        html: format!("<div id=\"tooltip{id}-generic\">Item {id}</div>"),
    }
}
