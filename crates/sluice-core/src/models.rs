use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of pending work: an opaque request descriptor.
///
/// Immutable once enqueued; requeued verbatim after a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Target {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// What the transport hands back for a completed request-response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// URL after redirects.
    pub final_url: String,
    pub body: String,
}

impl TransportResponse {
    /// 429 and 5xx mean the server is pushing back, not that the item is absent.
    pub fn is_overloaded(&self) -> bool {
        self.status == 429 || (500..600).contains(&self.status)
    }
}

/// Why a single attempt failed below the application level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    ConnectionFailed,
    ProtocolError,
    Unknown,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::ConnectionFailed => "connection_failed",
            TransportErrorKind::ProtocolError => "protocol_error",
            TransportErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one fetch attempt. Consumed exactly once by the round executor.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success {
        payload: TransportResponse,
        target: Target,
    },
    NotFound {
        target: Target,
    },
    TransportError {
        kind: TransportErrorKind,
        message: String,
        target: Target,
    },
}

impl FetchOutcome {
    pub fn target(&self) -> &Target {
        match self {
            FetchOutcome::Success { target, .. }
            | FetchOutcome::NotFound { target }
            | FetchOutcome::TransportError { target, .. } => target,
        }
    }
}

/// A fragment pulled out of a successful payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedItem {
    /// Identifier derived from the response URL (e.g. `"1234"`).
    pub id: String,
    pub url: String,
    /// Outer HTML of the matched element.
    pub html: String,
}

/// Extracted items of one round, in outcome-collection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoundBatch {
    pub round: u64,
    pub items: Vec<ExtractedItem>,
}

impl RoundBatch {
    pub fn new(round: u64) -> Self {
        Self {
            round,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
