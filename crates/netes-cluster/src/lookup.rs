//! Cluster directory client.
//!
//! [`ClusterLookup`] resolves a [`ClusterRequest`] to a [`Cluster`]:
//! - [`HttpLookup`]: the remote directory (`GET {url}/{id}`)
//! - [`MemoryLookup`]: a fixed set of clusters

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{AUTHORIZATION, COOKIE};
use netes_core::TOKEN_COOKIE;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::LookupError;
use crate::model::Cluster;
use crate::request::ClusterRequest;

/// Resolves requests to cluster descriptors.
///
/// `Ok(None)` means "no such cluster" and is distinct from a failed lookup.
#[async_trait]
pub trait ClusterLookup: Send + Sync {
    async fn lookup(&self, req: &ClusterRequest) -> Result<Option<Cluster>, LookupError>;
}

#[async_trait]
impl<L: ClusterLookup + ?Sized> ClusterLookup for Arc<L> {
    #[inline]
    async fn lookup(&self, req: &ClusterRequest) -> Result<Option<Cluster>, LookupError> {
        (**self).lookup(req).await
    }
}

#[async_trait]
impl<L: ClusterLookup + ?Sized> ClusterLookup for Box<L> {
    #[inline]
    async fn lookup(&self, req: &ClusterRequest) -> Result<Option<Cluster>, LookupError> {
        (**self).lookup(req).await
    }
}

// ── HttpLookup ────────────────────────────────────────────────────

/// Directory client over HTTP.
///
/// The caller's `Authorization` header and `token` cookie are forwarded so
/// the directory only returns clusters the caller may see.
#[derive(Debug, Clone)]
pub struct HttpLookup {
    client: Client,
    base_url: Url,
}

impl HttpLookup {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Config(e.to_string()))?;
        Self::with_client(client, base_url)
    }

    /// Create with a custom reqwest [`Client`].
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, LookupError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| LookupError::Config(format!("invalid directory url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(LookupError::Config(format!(
                "directory url {base_url} cannot take a path"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// URL of one cluster; the id always lands in a single path segment.
    ///
    /// `None` for ids that would resolve to another path (`.` and `..`).
    fn cluster_url(&self, id: &str) -> Option<Url> {
        if matches!(id, "." | "..") {
            return None;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push(id);
        Some(url)
    }
}

#[async_trait]
impl ClusterLookup for HttpLookup {
    async fn lookup(&self, req: &ClusterRequest) -> Result<Option<Cluster>, LookupError> {
        let Some(id) = req.cluster_id() else {
            return Ok(None);
        };

        let Some(url) = self.cluster_url(id) else {
            debug!(cluster_id = id, "cluster id is not a valid path segment");
            return Ok(None);
        };

        let mut request = self.client.get(url);
        if let Some(auth) = req.authorization() {
            request = request.header(AUTHORIZATION, auth.clone());
        }
        if let Some(token) = req.token_cookie() {
            request = request.header(COOKIE, format!("{TOKEN_COOKIE}={token}"));
        }

        let resp = request.send().await.map_err(LookupError::http)?;
        let status = resp.status();
        if !status.is_success() {
            debug!(cluster_id = id, status = status.as_u16(), "directory has no cluster");
            return Ok(None);
        }

        let cluster = resp
            .json::<Cluster>()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;
        Ok(Some(cluster))
    }
}

// ── MemoryLookup ──────────────────────────────────────────────────

/// Fixed in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLookup {
    clusters: HashMap<String, Cluster>,
}

impl MemoryLookup {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from descriptors, keyed by their id.
    pub fn from_clusters<I>(clusters: I) -> Self
    where
        I: IntoIterator<Item = Cluster>,
    {
        let clusters = clusters.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self { clusters }
    }

    pub fn insert(&mut self, cluster: Cluster) {
        self.clusters.insert(cluster.id.clone(), cluster);
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[async_trait]
impl ClusterLookup for MemoryLookup {
    async fn lookup(&self, req: &ClusterRequest) -> Result<Option<Cluster>, LookupError> {
        Ok(req.cluster_id().and_then(|id| self.clusters.get(id).cloned()))
    }
}
