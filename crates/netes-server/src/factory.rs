//! Per-cluster backend cache.
//!
//! Lookups on the hot path are lock-free reads of an `ArcSwap` snapshot.
//! On a miss the caller takes the keyed lock for that cluster id, checks
//! again, resolves the cluster through the directory and builds its backend.
//! Callers for other cluster ids are never blocked by a slow build.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use netes_cluster::{BackendKind, Cluster, ClusterLookup, ClusterRequest};
use netes_config::Config;
use netes_transport::{TunnelDialer, TunnelSettings};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendHandle, EmbeddedBuilder, EmbeddedContext, ServiceNetwork};
use crate::error::{BackendError, FactoryError};
use crate::keyed_lock::KeyedLock;

type BackendMap = HashMap<String, Arc<BackendHandle>>;

/// Process-wide defaults applied to every cluster.
#[derive(Debug, Clone)]
pub struct FactorySettings {
    /// Service CIDR for clusters that do not set one.
    pub service_net_cidr: String,
    /// Admission controllers for clusters that do not set any.
    pub admission_controllers: Vec<String>,
    pub tunnel: Arc<TunnelSettings>,
}

impl FactorySettings {
    pub fn from_config(config: &Config) -> Self {
        let tunnel = &config.tunnel;
        Self {
            service_net_cidr: config.server.service_net_cidr.clone(),
            admission_controllers: config.server.admission_controllers.clone(),
            tunnel: Arc::new(TunnelSettings {
                dial_url: tunnel.dial_url.clone(),
                callback_host: tunnel.callback_host.clone(),
                access_key: tunnel.access_key.clone().unwrap_or_default(),
                secret_key: tunnel.secret_key.clone().unwrap_or_default(),
                dial_timeout: tunnel.dial_timeout(),
            }),
        }
    }
}

/// Resolves requests to cached per-cluster backends.
pub struct BackendFactory {
    lookup: Arc<dyn ClusterLookup>,
    builder: Arc<dyn EmbeddedBuilder>,
    settings: FactorySettings,
    http: reqwest::Client,
    backends: ArcSwap<BackendMap>,
    locks: KeyedLock,
}

impl BackendFactory {
    pub fn new(
        lookup: impl ClusterLookup + 'static,
        builder: impl EmbeddedBuilder + 'static,
        settings: FactorySettings,
    ) -> Self {
        Self {
            lookup: Arc::new(lookup),
            builder: Arc::new(builder),
            settings,
            http: reqwest::Client::new(),
            backends: ArcSwap::from_pointee(HashMap::new()),
            locks: KeyedLock::new(),
        }
    }

    /// Backend for the cluster `req` addresses.
    ///
    /// `Ok(None)` when the directory does not know the cluster or no backend
    /// kind can serve it. A descriptor whose id differs from the requested
    /// one is rejected. Failures are returned as-is and never cached, so
    /// the next request for the same cluster tries again.
    pub async fn get(&self, req: &ClusterRequest) -> Result<Option<Arc<BackendHandle>>, FactoryError> {
        let id = req.cluster_id().unwrap_or_default();
        if let Some(handle) = self.cached(id) {
            netes_metrics::record_cache_hit();
            return Ok(Some(handle));
        }
        netes_metrics::record_cache_miss();

        let _guard = self.locks.lock(id).await;
        if let Some(handle) = self.cached(id) {
            return Ok(Some(handle));
        }

        let mut cluster = match self.lookup.lookup(req).await {
            Ok(Some(cluster)) => cluster,
            Ok(None) => {
                debug!(cluster_id = id, "cluster not found");
                return Ok(None);
            }
            Err(e) => {
                netes_metrics::record_lookup_failure();
                return Err(e.into());
            }
        };
        // Backends are cached under the requested id.
        if cluster.id != id {
            warn!(cluster_id = id, resolved_id = %cluster.id, "directory returned a different cluster id");
            netes_metrics::record_lookup_failure();
            return Err(FactoryError::ClusterMismatch {
                requested: id.to_string(),
                resolved: cluster.id,
            });
        }

        cluster.ensure_server_config();
        let cluster = Arc::new(cluster);

        let start = Instant::now();
        let backend = match self.construct(&cluster).await {
            Ok(Some(backend)) => backend,
            Ok(None) => {
                debug!(cluster_id = %cluster.id, "no backend for cluster kind");
                return Ok(None);
            }
            Err(source) => {
                netes_metrics::record_backend_failed();
                return Err(FactoryError::Backend {
                    cluster_id: cluster.id.clone(),
                    source,
                });
            }
        };
        let elapsed = start.elapsed();
        netes_metrics::record_backend_constructed(elapsed.as_secs_f64());
        info!(cluster_id = %cluster.id, name = %cluster.name, elapsed_ms = elapsed.as_millis() as u64, "cluster backend built");

        let handle = Arc::new(BackendHandle::new(cluster, backend));
        let stored = self.store_or_load(handle.clone());
        if !Arc::ptr_eq(&stored, &handle) {
            handle.close();
        }
        Ok(Some(stored))
    }

    async fn construct(&self, cluster: &Arc<Cluster>) -> Result<Option<Backend>, BackendError> {
        match cluster.kind() {
            BackendKind::Embedded => {
                let cidr = cluster
                    .service_net_cidr()
                    .unwrap_or(self.settings.service_net_cidr.as_str());
                let service_network = ServiceNetwork::parse(cidr)?;
                let admission_controllers = cluster
                    .admission_controllers()
                    .map(<[String]>::to_vec)
                    .unwrap_or_else(|| self.settings.admission_controllers.clone());
                let dialer = TunnelDialer::with_client(
                    self.http.clone(),
                    cluster.id.as_str(),
                    self.settings.tunnel.clone(),
                );

                let ctx = EmbeddedContext {
                    cluster: cluster.clone(),
                    service_network,
                    admission_controllers,
                    dialer,
                };
                let server = self.builder.build(ctx).await?;
                Ok(Some(Backend::Embedded(server)))
            }
            BackendKind::Unsupported => Ok(None),
        }
    }

    /// Cached backend for `id`, without resolving or building it.
    pub fn cached(&self, id: &str) -> Option<Arc<BackendHandle>> {
        self.backends.load().get(id).cloned()
    }

    /// Insert `handle` unless its cluster already has one; returns the winner.
    fn store_or_load(&self, handle: Arc<BackendHandle>) -> Arc<BackendHandle> {
        let id = handle.cluster().id.clone();
        let mut existing = None;
        self.backends.rcu(|current| {
            if let Some(stored) = current.get(&id) {
                existing = Some(stored.clone());
                return current.clone();
            }
            existing = None;
            let mut next = BackendMap::clone(current);
            next.insert(id.clone(), handle.clone());
            Arc::new(next)
        });
        netes_metrics::set_backends_active(self.len());
        existing.unwrap_or(handle)
    }

    /// Number of cached backends.
    pub fn len(&self) -> usize {
        self.backends.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.load().is_empty()
    }

    /// Empty the cache and close every backend in it.
    pub fn close_all(&self) {
        let previous = self.backends.swap(Arc::new(HashMap::new()));
        for handle in previous.values() {
            handle.close();
        }
        netes_metrics::set_backends_active(0);
        if !previous.is_empty() {
            info!(count = previous.len(), "closed all cluster backends");
        }
    }
}
