//! Error types for the transport crate.

use std::time::Duration;

use netes_core::{ERROR_CONFIG, ERROR_DIAL, ERROR_IO, ERROR_PROTOCOL, ERROR_TIMEOUT};
use thiserror::Error;

/// Errors that can occur while dialing.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("handoff request failed: {0}")]
    Http(String),

    #[error("invalid handoff response: HTTP {0}")]
    Status(u16),

    #[error("invalid handoff response: {0}")]
    InvalidResponse(String),

    #[error("invalid tunnel url: {0}")]
    InvalidUrl(String),

    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("config: {0}")]
    Config(String),

    #[error("dial timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Create a handoff request error from any error type.
    #[inline]
    pub fn http<E: std::fmt::Display>(err: E) -> Self {
        Self::Http(err.to_string())
    }

    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            TransportError::Io(_) => ERROR_IO,
            TransportError::Http(_) | TransportError::Status(_) | TransportError::WebSocket(_) => {
                ERROR_DIAL
            }
            TransportError::InvalidResponse(_) | TransportError::InvalidUrl(_) => ERROR_PROTOCOL,
            TransportError::UnsupportedNetwork(_) | TransportError::Config(_) => ERROR_CONFIG,
            TransportError::Timeout(_) => ERROR_TIMEOUT,
        }
    }
}
