//! Request-scoped cluster context.

use std::ops::Deref;
use std::sync::Arc;

use http::Request;

use crate::model::Cluster;

/// The resolved cluster, attached to a request's extensions before it is
/// handed to the cluster's backend.
#[derive(Debug, Clone)]
pub struct ClusterContext(pub Arc<Cluster>);

impl ClusterContext {
    /// Attach `cluster` to `req`, replacing any earlier context.
    pub fn store<B>(req: &mut Request<B>, cluster: Arc<Cluster>) {
        req.extensions_mut().insert(ClusterContext(cluster));
    }

    /// The cluster attached to `req`, if any.
    pub fn get<B>(req: &Request<B>) -> Option<&Arc<Cluster>> {
        req.extensions().get::<ClusterContext>().map(|c| &c.0)
    }
}

impl Deref for ClusterContext {
    type Target = Cluster;

    fn deref(&self) -> &Cluster {
        &self.0
    }
}
