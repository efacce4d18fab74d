//! Cluster backends.
//!
//! A [`BackendHandle`] is the cached unit: the cluster descriptor plus the
//! backend serving it. Only embedded backends exist; how one is assembled
//! is up to the injected [`EmbeddedBuilder`].

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::extract::Request;
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use ipnet::IpNet;
use netes_cluster::{BackendKind, Cluster, ClusterContext};
use netes_core::EMBEDDED_PATH_PREFIX;
use netes_transport::TunnelDialer;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::info;

use crate::error::BackendError;

// ── Service network ───────────────────────────────────────────────

/// Service IP range of a cluster and the address of its API service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceNetwork {
    range: IpNet,
    api_service_ip: IpAddr,
}

impl ServiceNetwork {
    /// Parse a CIDR; the API service takes the first host address.
    pub fn parse(cidr: &str) -> Result<Self, BackendError> {
        let invalid = |reason: String| BackendError::InvalidServiceNet {
            cidr: cidr.to_string(),
            reason,
        };
        let range = cidr
            .trim()
            .parse::<IpNet>()
            .map_err(|e| invalid(e.to_string()))?
            .trunc();
        let api_service_ip = range
            .hosts()
            .next()
            .ok_or_else(|| invalid("no usable host address".into()))?;
        Ok(Self {
            range,
            api_service_ip,
        })
    }

    pub fn range(&self) -> IpNet {
        self.range
    }

    pub fn api_service_ip(&self) -> IpAddr {
        self.api_service_ip
    }
}

// ── Embedded backends ─────────────────────────────────────────────

/// Everything an embedded backend is built from.
#[derive(Debug, Clone)]
pub struct EmbeddedContext {
    pub cluster: Arc<Cluster>,
    pub service_network: ServiceNetwork,
    pub admission_controllers: Vec<String>,
    /// Dialer reaching into this cluster's network through the relay.
    pub dialer: TunnelDialer,
}

/// Builds the request handler for an embedded cluster.
#[async_trait]
pub trait EmbeddedBuilder: Send + Sync {
    async fn build(&self, ctx: EmbeddedContext) -> Result<EmbeddedServer, BackendError>;
}

#[async_trait]
impl<B: EmbeddedBuilder + ?Sized> EmbeddedBuilder for Arc<B> {
    #[inline]
    async fn build(&self, ctx: EmbeddedContext) -> Result<EmbeddedServer, BackendError> {
        (**self).build(ctx).await
    }
}

#[async_trait]
impl<B: EmbeddedBuilder + ?Sized> EmbeddedBuilder for Box<B> {
    #[inline]
    async fn build(&self, ctx: EmbeddedContext) -> Result<EmbeddedServer, BackendError> {
        (**self).build(ctx).await
    }
}

/// A built embedded backend: a request handler and its shutdown signal.
///
/// The handler sees paths with the `/k8s/clusters/{name}` prefix removed.
pub struct EmbeddedServer {
    handler: Router,
    shutdown: CancellationToken,
}

impl EmbeddedServer {
    /// Wrap `router`; `shutdown` is cancelled when the backend is closed.
    pub fn new(router: Router, shutdown: CancellationToken) -> Self {
        let handler = Router::new().fallback_service(router.map_request(strip_cluster_prefix));
        Self { handler, shutdown }
    }

    pub fn handler(&self) -> &Router {
        &self.handler
    }

    fn close(&self) {
        self.shutdown.cancel();
    }
}

impl fmt::Debug for EmbeddedServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedServer")
            .field("closed", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Drop `/k8s/clusters/{name}` (or `/{id}`) from the request path.
fn strip_cluster_prefix(mut req: Request) -> Request {
    let Some(cluster) = ClusterContext::get(&req).cloned() else {
        return req;
    };

    let path = req.uri().path();
    let rest = [cluster.name.as_str(), cluster.id.as_str()]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .find_map(|segment| {
            path.strip_prefix(EMBEDDED_PATH_PREFIX)?
                .strip_prefix(segment)
                .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        });
    let Some(rest) = rest else {
        return req;
    };

    let rest = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match req.uri().query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest.to_string(),
    };
    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query = PathAndQuery::try_from(path_and_query).ok();
    if let Ok(uri) = Uri::from_parts(parts) {
        *req.uri_mut() = uri;
    }
    req
}

// ── Backend handle ────────────────────────────────────────────────

/// Backend variants. A cluster of any other kind has no backend.
#[derive(Debug)]
pub enum Backend {
    Embedded(EmbeddedServer),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Embedded(_) => BackendKind::Embedded,
        }
    }

    pub fn handler(&self) -> &Router {
        match self {
            Backend::Embedded(server) => server.handler(),
        }
    }

    fn close(&self) {
        match self {
            Backend::Embedded(server) => server.close(),
        }
    }
}

/// The cached unit for one cluster id.
#[derive(Debug)]
pub struct BackendHandle {
    cluster: Arc<Cluster>,
    backend: Backend,
    closed: AtomicBool,
}

impl BackendHandle {
    pub fn new(cluster: Arc<Cluster>, backend: Backend) -> Self {
        Self {
            cluster,
            backend,
            closed: AtomicBool::new(false),
        }
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Request handler; expects a [`ClusterContext`] on the request.
    pub fn handler(&self) -> &Router {
        self.backend.handler()
    }

    /// Release the backend. Only the first call has an effect.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(cluster_id = %self.cluster.id, "closing cluster backend");
            self.backend.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
