//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Server Defaults
// ============================================================================

/// Default HTTP listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8089";
/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
/// Default service network CIDR handed to embedded backends.
pub const DEFAULT_SERVICE_NET_CIDR: &str = "10.43.0.0/24";
/// Default admission controllers handed to embedded backends.
pub const DEFAULT_ADMISSION_CONTROLLERS: &[&str] = &[
    "NamespaceLifecycle",
    "LimitRanger",
    "ServiceAccount",
    "PersistentVolumeLabel",
    "DefaultStorageClass",
    "ResourceQuota",
    "DefaultTolerationSeconds",
];

// ============================================================================
// Cluster Directory Defaults
// ============================================================================

/// Default cluster directory endpoint (cluster id is appended).
pub const DEFAULT_DIRECTORY_URL: &str = "http://localhost:8081/v3/clusters";
/// Default directory request timeout in seconds.
pub const DEFAULT_DIRECTORY_TIMEOUT_SECS: u64 = 5;
/// Request header carrying an explicit cluster id.
pub const CLUSTER_ID_HEADER: &str = "X-API-Cluster-Id";
/// Cookie forwarded to the directory for authentication.
pub const TOKEN_COOKIE: &str = "token";

// ============================================================================
// Tunnel Defaults
// ============================================================================

/// Default relay endpoint that issues tunnel handoffs.
pub const DEFAULT_RELAY_DIAL_URL: &str = "http://localhost:8081/v3/dial";
/// Default local callback host the tunnel WebSocket is opened against.
pub const DEFAULT_CALLBACK_HOST: &str = "localhost:8080";
/// Default bound on a whole tunnel dial (handoff + upgrade), in seconds.
///
/// `0` disables the bound and a dial may block until the underlying
/// connections time out on their own.
pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 30;
/// Environment variable holding the relay access key.
pub const ACCESS_KEY_ENV: &str = "CATTLE_ACCESS_KEY";
/// Environment variable holding the relay secret key.
pub const SECRET_KEY_ENV: &str = "CATTLE_SECRET_KEY";
/// Query parameter carrying the one-time handoff token.
pub const HANDOFF_TOKEN_PARAM: &str = "token";

// ============================================================================
// Embedded Backend Defaults
// ============================================================================

/// Path prefix stripped from requests before they reach an embedded backend.
pub const EMBEDDED_PATH_PREFIX: &str = "/k8s/clusters/";
