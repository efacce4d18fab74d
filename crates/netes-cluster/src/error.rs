//! Directory lookup errors.

use netes_core::ERROR_LOOKUP;

/// Errors from the cluster directory.
///
/// A cluster the directory does not know is not an error; it is `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Transport-level failure talking to the directory.
    #[error("directory request failed: {0}")]
    Http(String),

    /// The directory answered but the body is not a cluster.
    #[error("parsing clusters response: {0}")]
    Decode(String),

    #[error("directory config: {0}")]
    Config(String),
}

impl LookupError {
    /// Create a transport error from any error type.
    #[inline]
    pub fn http<E: std::fmt::Display>(err: E) -> Self {
        Self::Http(err.to_string())
    }

    /// Get the error type string for metrics.
    #[inline]
    pub fn error_type(&self) -> &'static str {
        ERROR_LOOKUP
    }
}
