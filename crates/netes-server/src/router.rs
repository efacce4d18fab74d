//! Inbound request router.
//!
//! Every request, whatever its path or method, is mapped to a cluster and
//! handed to that cluster's backend with a [`ClusterContext`] attached.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use netes_cluster::{ClusterContext, ClusterRequest};
use serde::Serialize;
use tower::ServiceExt;
use tracing::{debug, warn};

use crate::factory::BackendFactory;

/// Body of every error the router answers itself.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    status: u16,
    message: &'a str,
}

/// Build the top-level router over a backend factory.
pub fn router(factory: Arc<BackendFactory>) -> Router {
    Router::new().fallback(route).with_state(factory)
}

async fn route(State(factory): State<Arc<BackendFactory>>, mut req: Request) -> Response {
    let cluster_req = ClusterRequest::from_parts(req.headers(), req.uri());

    let handle = match factory.get(&cluster_req).await {
        Ok(Some(handle)) => handle,
        Ok(None) => {
            netes_metrics::record_request("not_found");
            debug!(cluster_id = ?cluster_req.cluster_id(), path = %req.uri().path(), "no cluster available");
            return error_response(StatusCode::NOT_FOUND, "no cluster available");
        }
        Err(e) => {
            netes_metrics::record_request("error");
            netes_metrics::record_error(e.error_type());
            warn!(cluster_id = ?cluster_req.cluster_id(), error = %e, "failed to resolve cluster backend");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };

    netes_metrics::record_request("dispatched");
    ClusterContext::store(&mut req, handle.cluster().clone());
    handle
        .handler()
        .clone()
        .oneshot(req)
        .await
        .unwrap_or_else(|never: Infallible| match never {})
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        status: status.as_u16(),
        message,
    };
    (status, Json(body)).into_response()
}
