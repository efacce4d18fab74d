//! Cluster descriptors and the cluster directory client.
//!
//! This crate answers two questions for the proxy:
//! - which cluster does an inbound request address ([`ClusterRequest`])
//! - what does the directory know about that cluster ([`ClusterLookup`])
//!
//! Resolved descriptors travel with the request as a [`ClusterContext`]
//! extension.

pub mod context;
pub mod error;
pub mod lookup;
pub mod model;
pub mod request;

pub use context::ClusterContext;
pub use error::LookupError;
pub use lookup::{ClusterLookup, HttpLookup, MemoryLookup};
pub use model::{BackendKind, Cluster, EmbeddedConfig, Identity, K8sServerConfig};
pub use request::{ClusterRequest, cluster_id};
