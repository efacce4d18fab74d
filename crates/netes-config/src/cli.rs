//! CLI override and environment application logic.

use clap::Parser;
use netes_core::{ACCESS_KEY_ENV, SECRET_KEY_ENV};

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override HTTP listen address, e.g. 0.0.0.0:8089 or :8089
    #[arg(long)]
    pub listen: Option<String>,
    /// Override default service network CIDR
    #[arg(long)]
    pub service_net_cidr: Option<String>,
    /// Override default admission controllers (repeatable or comma-separated)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub admission_controllers: Option<Vec<String>>,
    /// Override cluster directory URL
    #[arg(long)]
    pub directory_url: Option<String>,
    /// Override cluster directory request timeout (seconds)
    #[arg(long)]
    pub directory_timeout_secs: Option<u64>,
    /// Override relay dial URL
    #[arg(long)]
    pub dial_url: Option<String>,
    /// Override tunnel callback host
    #[arg(long)]
    pub callback_host: Option<String>,
    /// Override tunnel dial timeout (seconds, 0 = unbounded)
    #[arg(long)]
    pub dial_timeout_secs: Option<u64>,
    /// Override metrics listen address
    #[arg(long)]
    pub metrics_listen: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.listen {
        config.server.listen = v.clone();
    }
    if let Some(v) = &overrides.service_net_cidr {
        config.server.service_net_cidr = v.clone();
    }
    if let Some(v) = &overrides.admission_controllers {
        config.server.admission_controllers = v.clone();
    }
    if let Some(v) = &overrides.directory_url {
        config.directory.url = v.clone();
    }
    if let Some(v) = overrides.directory_timeout_secs {
        config.directory.timeout_secs = v;
    }
    if let Some(v) = &overrides.dial_url {
        config.tunnel.dial_url = v.clone();
    }
    if let Some(v) = &overrides.callback_host {
        config.tunnel.callback_host = v.clone();
    }
    if let Some(v) = overrides.dial_timeout_secs {
        config.tunnel.dial_timeout_secs = v;
    }
    if let Some(v) = &overrides.metrics_listen {
        config.metrics.listen = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}

/// Fill relay credentials missing from the file from the process environment.
pub fn apply_env(config: &mut Config) {
    apply_env_with(config, |key| std::env::var(key).ok());
}

/// Like [`apply_env`], reading variables through `var`.
pub fn apply_env_with(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if config.tunnel.access_key.is_none() {
        config.tunnel.access_key = var(ACCESS_KEY_ENV);
    }
    if config.tunnel.secret_key.is_none() {
        config.tunnel.secret_key = var(SECRET_KEY_ENV);
    }
}
