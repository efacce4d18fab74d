//! netes server library.
//!
//! Routes inbound API requests to a lazily built, per-cluster backend:
//! - [`router`] maps a request to its cluster and dispatches it
//! - [`BackendFactory`] resolves, builds and caches one backend per cluster
//! - [`NodeProxyBuilder`] is the default embedded backend, reaching node
//!   services through the relay tunnel

mod backend;
pub mod cli;
mod error;
mod factory;
mod keyed_lock;
mod node_proxy;
mod router;
mod server;

pub use backend::{
    Backend, BackendHandle, EmbeddedBuilder, EmbeddedContext, EmbeddedServer, ServiceNetwork,
};
pub use error::{BackendError, FactoryError, ServerError};
pub use factory::{BackendFactory, FactorySettings};
pub use keyed_lock::{KeyedGuard, KeyedLock};
pub use node_proxy::{NodeProxyBuilder, node_proxy_router};
pub use router::router;
pub use server::{run, run_with_shutdown, serve};
pub use tokio_util::sync::CancellationToken;
