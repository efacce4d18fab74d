//! Shared fakes for netes-server integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::Request;
use netes_cluster::{
    Cluster, ClusterContext, ClusterLookup, ClusterRequest, EmbeddedConfig, K8sServerConfig,
    LookupError,
};
use netes_config::Config;
use netes_server::{
    BackendError, BackendFactory, EmbeddedBuilder, EmbeddedContext, EmbeddedServer,
    FactorySettings,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub fn embedded(id: &str) -> Cluster {
    Cluster {
        id: id.to_string(),
        name: format!("{id}-name"),
        embedded: true,
        ..Default::default()
    }
}

pub fn embedded_with_network(id: &str, cidr: &str, admission: &[&str]) -> Cluster {
    Cluster {
        k8s_server_config: Some(K8sServerConfig {
            admission_controllers: admission.iter().map(|s| (*s).to_string()).collect(),
            service_net_cidr: String::new(),
        }),
        embedded_config: Some(EmbeddedConfig {
            service_net_cidr: cidr.to_string(),
        }),
        ..embedded(id)
    }
}

/// Directory fake with call counting, per-id latency and injected failures.
#[derive(Default)]
pub struct TestLookup {
    clusters: Mutex<HashMap<String, Cluster>>,
    delays: Mutex<HashMap<String, Duration>>,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl TestLookup {
    pub fn with(clusters: impl IntoIterator<Item = Cluster>) -> Arc<Self> {
        let lookup = Self::default();
        for cluster in clusters {
            lookup.insert(cluster);
        }
        Arc::new(lookup)
    }

    pub fn insert(&self, cluster: Cluster) {
        self.clusters.lock().insert(cluster.id.clone(), cluster);
    }

    /// Answer requests for `id` with `cluster`, whatever its own id is.
    pub fn insert_as(&self, id: &str, cluster: Cluster) {
        self.clusters.lock().insert(id.to_string(), cluster);
    }

    pub fn delay(&self, id: &str, delay: Duration) {
        self.delays.lock().insert(id.to_string(), delay);
    }

    /// Fail the next `n` lookups.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterLookup for TestLookup {
    async fn lookup(&self, req: &ClusterRequest) -> Result<Option<Cluster>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(id) = req.cluster_id() else {
            return Ok(None);
        };
        let delay = self.delays.lock().get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(LookupError::Http("directory down".into()));
        }
        Ok(self.clusters.lock().get(id).cloned())
    }
}

/// Embedded builder fake answering `"{built for}|{context id}|{path}"`.
#[derive(Default)]
pub struct TestBuilder {
    delay: Mutex<Duration>,
    delays: Mutex<HashMap<String, Duration>>,
    failures: AtomicUsize,
    builds: AtomicUsize,
    contexts: Mutex<Vec<EmbeddedContext>>,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl TestBuilder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        let builder = Self::default();
        *builder.delay.lock() = delay;
        Arc::new(builder)
    }

    /// Delay builds for one cluster only.
    pub fn delay(&self, id: &str, delay: Duration) {
        self.delays.lock().insert(id.to_string(), delay);
    }

    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<EmbeddedContext> {
        self.contexts.lock().clone()
    }

    pub fn closed(&self) -> usize {
        self.tokens.lock().iter().filter(|t| t.is_cancelled()).count()
    }
}

#[async_trait]
impl EmbeddedBuilder for TestBuilder {
    async fn build(&self, ctx: EmbeddedContext) -> Result<EmbeddedServer, BackendError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .delays
            .lock()
            .get(&ctx.cluster.id)
            .copied()
            .unwrap_or(*self.delay.lock());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BackendError::build("boom"));
        }

        let built_for = ctx.cluster.id.clone();
        self.contexts.lock().push(ctx);
        let router = Router::new().fallback(move |req: Request| {
            let built_for = built_for.clone();
            async move {
                let context_id = ClusterContext::get(&req)
                    .map(|c| c.id.clone())
                    .unwrap_or_default();
                format!("{built_for}|{context_id}|{}", req.uri().path())
            }
        });

        let token = CancellationToken::new();
        self.tokens.lock().push(token.clone());
        Ok(EmbeddedServer::new(router, token))
    }
}

pub fn factory(lookup: Arc<TestLookup>, builder: Arc<TestBuilder>) -> Arc<BackendFactory> {
    Arc::new(BackendFactory::new(
        lookup,
        builder,
        FactorySettings::from_config(&Config::default()),
    ))
}
