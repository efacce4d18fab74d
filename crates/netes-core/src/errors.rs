//! Error type constants for metrics and logging.
//!
//! These constants provide consistent error classification across all crates.

/// Cluster directory lookup error.
pub const ERROR_LOOKUP: &str = "lookup";
/// Backend construction error.
pub const ERROR_BACKEND: &str = "backend";
/// Tunnel handoff / dial error.
pub const ERROR_DIAL: &str = "dial";
/// I/O error.
pub const ERROR_IO: &str = "io";
/// Timeout error.
pub const ERROR_TIMEOUT: &str = "timeout";
/// Protocol (framing, decoding) error.
pub const ERROR_PROTOCOL: &str = "protocol";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
