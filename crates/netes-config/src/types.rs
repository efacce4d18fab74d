//! Configuration types.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub tunnel: TunnelConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address. A bare `:port` binds all interfaces.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Service CIDR for clusters that do not set their own.
    #[serde(default = "default_service_net_cidr")]
    pub service_net_cidr: String,
    /// Admission controllers for clusters that do not set their own.
    #[serde(default = "default_admission_controllers")]
    pub admission_controllers: Vec<String>,
    /// Grace period for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            service_net_cidr: default_service_net_cidr(),
            admission_controllers: default_admission_controllers(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Listen address in `host:port` form.
    pub fn listen_addr(&self) -> String {
        let listen = self.listen.trim();
        if listen.starts_with(':') {
            format!("0.0.0.0{listen}")
        } else {
            listen.to_string()
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Cluster directory client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL; the cluster id is appended as a path segment.
    #[serde(default = "default_directory_url")]
    pub url: String,
    #[serde(default = "default_directory_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: default_directory_url(),
            timeout_secs: default_directory_timeout_secs(),
        }
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Relay tunnel settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Relay endpoint that issues handoffs.
    #[serde(default = "default_dial_url")]
    pub dial_url: String,
    /// `host[:port]` tunnel WebSockets are opened against.
    #[serde(default = "default_callback_host")]
    pub callback_host: String,
    /// Bound on a whole dial in seconds. 0 = unbounded.
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,
    /// Falls back to `CATTLE_ACCESS_KEY`.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Falls back to `CATTLE_SECRET_KEY`.
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            dial_url: default_dial_url(),
            callback_host: default_callback_host(),
            dial_timeout_secs: default_dial_timeout_secs(),
            access_key: None,
            secret_key: None,
        }
    }
}

impl std::fmt::Debug for TunnelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelConfig")
            .field("dial_url", &self.dial_url)
            .field("callback_host", &self.callback_host)
            .field("dial_timeout_secs", &self.dial_timeout_secs)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TunnelConfig {
    /// Dial bound, `None` when disabled.
    pub fn dial_timeout(&self) -> Option<Duration> {
        (self.dial_timeout_secs > 0).then(|| Duration::from_secs(self.dial_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// Prometheus exporter listen address. Disabled when unset.
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"netes_server": "debug", "hyper": "warn"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
