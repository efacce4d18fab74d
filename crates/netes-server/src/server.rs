//! HTTP server loop.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use netes_cluster::ClusterLookup;
use netes_config::Config;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::EmbeddedBuilder;
use crate::error::ServerError;
use crate::factory::{BackendFactory, FactorySettings};
use crate::router::router;

/// Run the server with a cancellation token for graceful shutdown.
pub async fn run_with_shutdown(
    config: Config,
    lookup: impl ClusterLookup + 'static,
    builder: impl EmbeddedBuilder + 'static,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listen: SocketAddr = config
        .server
        .listen_addr()
        .parse()
        .map_err(|_| ServerError::Config("invalid listen address".into()))?;

    let factory = Arc::new(BackendFactory::new(
        lookup,
        builder,
        FactorySettings::from_config(&config),
    ));
    let listener = TcpListener::bind(listen).await?;
    serve(listener, factory, shutdown, config.server.shutdown_timeout()).await
}

/// Run the server (blocking until error, no graceful shutdown).
pub async fn run(
    config: Config,
    lookup: impl ClusterLookup + 'static,
    builder: impl EmbeddedBuilder + 'static,
) -> Result<(), ServerError> {
    run_with_shutdown(config, lookup, builder, CancellationToken::new()).await
}

/// Serve requests on `listener` until `shutdown` fires.
///
/// In-flight requests get `grace` to finish; afterwards remaining
/// connections are dropped. Every cached backend is closed on the way out.
pub async fn serve(
    listener: TcpListener,
    factory: Arc<BackendFactory>,
    shutdown: CancellationToken,
    grace: Duration,
) -> Result<(), ServerError> {
    info!(listen = %listener.local_addr()?, "netes server started");

    let signal = shutdown.clone();
    let server = axum::serve(listener, router(factory.clone()))
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .into_future();

    let grace_expired = async {
        shutdown.cancelled().await;
        info!("shutdown signal received, draining connections");
        tokio::time::sleep(grace).await;
    };

    let result = tokio::select! {
        res = server => res.map_err(ServerError::from),
        _ = grace_expired => {
            warn!(grace_secs = grace.as_secs(), "shutdown timeout, dropping remaining connections");
            Ok(())
        }
    };

    factory.close_all();
    info!("server stopped");
    result
}
