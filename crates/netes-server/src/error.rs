//! Server error types.

use netes_cluster::LookupError;
use netes_metrics::{ERROR_BACKEND, ERROR_CONFIG, ERROR_IO, ERROR_LOOKUP};

/// Failure to build a cluster backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid service net cidr {cidr:?}: {reason}")]
    InvalidServiceNet { cidr: String, reason: String },
    #[error("build: {0}")]
    Build(String),
}

impl BackendError {
    /// Create a build error from any error type.
    #[inline]
    pub fn build<E: std::fmt::Display>(err: E) -> Self {
        Self::Build(err.to_string())
    }

    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            BackendError::InvalidServiceNet { .. } => ERROR_CONFIG,
            BackendError::Build(_) => ERROR_BACKEND,
        }
    }
}

/// Failure to resolve a request to a cluster backend.
///
/// "No such cluster" is not an error; the factory returns `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// The directory answered for `requested` with another cluster's descriptor.
    #[error("directory resolved cluster {requested:?} to {resolved:?}")]
    ClusterMismatch { requested: String, resolved: String },
    #[error("cluster {cluster_id}: {source}")]
    Backend {
        cluster_id: String,
        #[source]
        source: BackendError,
    },
}

impl FactoryError {
    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            FactoryError::Lookup(e) => e.error_type(),
            FactoryError::ClusterMismatch { .. } => ERROR_LOOKUP,
            FactoryError::Backend { source, .. } => source.error_type(),
        }
    }
}

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("lookup: {0}")]
    Lookup(#[from] LookupError),
}

impl ServerError {
    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Io(_) => ERROR_IO,
            ServerError::Config(_) => ERROR_CONFIG,
            ServerError::Lookup(e) => e.error_type(),
        }
    }
}
