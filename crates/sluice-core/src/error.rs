use thiserror::Error;

use crate::models::TransportErrorKind;

/// Application-wide error types for sluice.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP exchange failed at the protocol level (bad response, body read, redirect loop).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out in the connect or read phase.
    #[error("Request timed out after {0:.2} seconds")]
    Timeout(f64),

    /// Network/connection error (refused, reset, DNS).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Writing a batch to durable storage failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Classify a failed request attempt for the fetch worker.
    pub fn transport_kind(&self) -> TransportErrorKind {
        match self {
            AppError::Timeout(_) => TransportErrorKind::Timeout,
            AppError::NetworkError(_) => TransportErrorKind::ConnectionFailed,
            AppError::HttpError(_) => TransportErrorKind::ProtocolError,
            _ => TransportErrorKind::Unknown,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}
