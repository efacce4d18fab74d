//! # netes-rs
//!
//! A multi-tenant control-plane proxy. Requests are mapped to a cluster,
//! routed to a lazily built per-cluster backend, and embedded backends reach
//! node services through relay-tunneled WebSocket connections.
//!
//! ## Crates
//!
//! - [`netes_core`] - Defaults, error classes and the tunnel stream adapter
//! - [`netes_transport`] - Direct and relay-tunneled dialers
//! - [`netes_cluster`] - Cluster descriptors and the directory client
//! - [`netes_config`] - Configuration loading and validation
//! - [`netes_metrics`] - Prometheus-compatible metrics
//! - [`netes_server`] - Backend factory, router and server loop

pub use netes_cluster as cluster;
pub use netes_config as config;
pub use netes_core as core;
pub use netes_metrics as metrics;
pub use netes_server as server;
pub use netes_transport as transport;

use netes_config::{Config, apply_env, apply_overrides, load_or_default, validate_config};
use netes_server::cli::ServerArgs;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use netes_cluster::{Cluster, ClusterContext, ClusterLookup, HttpLookup, MemoryLookup};
    pub use netes_config::{Config, load_config, validate_config};
    pub use netes_server::{
        BackendFactory, CancellationToken, EmbeddedBuilder, NodeProxyBuilder, ServerError, run,
        run_with_shutdown,
    };
    pub use netes_transport::{Dialer, DirectDialer, TunnelDialer};
}

/// Resolve the configuration the server would run with.
pub fn effective_config(args: &ServerArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = load_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, &args.overrides);
    apply_env(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration and print it as JSON with secrets redacted.
pub fn check_config(args: &ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = effective_config(args)?;
    if config.tunnel.secret_key.is_some() {
        config.tunnel.secret_key = Some("<redacted>".to_string());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
