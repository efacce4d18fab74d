//! Default embedded backend: a node proxy.
//!
//! Serves `/nodes/{address}/proxy/{*path}` by opening a connection to
//! `address` through the cluster's dialer and forwarding the request over
//! HTTP/1.1. This is how node-level services (kubelet, metrics) inside a
//! cluster's private network are reached.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::header::HOST;
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use hyper_util::rt::TokioIo;
use netes_transport::Dialer;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{EmbeddedBuilder, EmbeddedContext, EmbeddedServer};
use crate::error::BackendError;

/// Builds a node proxy per embedded cluster, dialing through the relay.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeProxyBuilder;

#[async_trait]
impl EmbeddedBuilder for NodeProxyBuilder {
    async fn build(&self, ctx: EmbeddedContext) -> Result<EmbeddedServer, BackendError> {
        info!(
            cluster_id = %ctx.cluster.id,
            service_range = %ctx.service_network.range(),
            api_service_ip = %ctx.service_network.api_service_ip(),
            admission_controllers = ctx.admission_controllers.len(),
            "starting node proxy backend"
        );
        let shutdown = CancellationToken::new();
        let router = node_proxy_router(ctx.dialer, shutdown.clone());
        Ok(EmbeddedServer::new(router, shutdown))
    }
}

#[derive(Clone)]
struct NodeProxy<D> {
    dialer: D,
    shutdown: CancellationToken,
}

/// Node proxy routes over any dialer.
///
/// Cancelling `shutdown` refuses new proxy requests and tears down the node
/// connections of in-flight ones.
pub fn node_proxy_router<D: Dialer>(dialer: D, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/nodes/{address}/proxy", any(proxy::<D>))
        .route("/nodes/{address}/proxy/{*path}", any(proxy::<D>))
        .with_state(NodeProxy { dialer, shutdown })
}

async fn proxy<D: Dialer>(
    State(NodeProxy { dialer, shutdown }): State<NodeProxy<D>>,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
) -> Response {
    if shutdown.is_cancelled() {
        return closed();
    }
    let Some(address) = params.get("address") else {
        return (StatusCode::BAD_REQUEST, "missing node address").into_response();
    };
    let path = format!("/{}", params.get("path").map(String::as_str).unwrap_or(""));

    let (mut parts, body) = req.into_parts();
    let target = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };
    let (Ok(uri), Ok(host)) = (target.parse::<Uri>(), HeaderValue::from_str(address)) else {
        return (StatusCode::BAD_REQUEST, "invalid node proxy target").into_response();
    };
    parts.uri = uri;
    parts.headers.insert(HOST, host);

    let stream = match dialer.dial("tcp", address).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(address = %address, error = %e, "node dial failed");
            return bad_gateway(&e);
        }
    };

    let (mut sender, conn) = match hyper::client::conn::http1::handshake(TokioIo::new(stream)).await
    {
        Ok(pair) => pair,
        Err(e) => return bad_gateway(&e),
    };
    let peer = address.clone();
    let conn_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            res = conn => {
                if let Err(e) = res {
                    debug!(address = %peer, error = %e, "node connection closed with error");
                }
            }
            _ = conn_shutdown.cancelled() => {
                debug!(address = %peer, "node connection dropped on backend close");
            }
        }
    });

    tokio::select! {
        res = sender.send_request(Request::from_parts(parts, body)) => match res {
            Ok(resp) => resp.map(Body::new).into_response(),
            Err(e) => bad_gateway(&e),
        },
        _ = shutdown.cancelled() => closed(),
    }
}

fn closed() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "node proxy: backend closed").into_response()
}

fn bad_gateway(err: &dyn std::fmt::Display) -> Response {
    (StatusCode::BAD_GATEWAY, format!("node proxy: {err}")).into_response()
}
