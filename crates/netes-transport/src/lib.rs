//! Pluggable outbound dialers for netes-rs.
//!
//! Backend code that needs to reach node-level services is written against
//! the [`Dialer`] trait, so the same code runs over a direct TCP connection
//! or over a relay tunnel into the cluster's private network.
//!
//! # Dialers
//!
//! - [`plain`]: Direct TCP (`tcp`, `tcp4`, `tcp6` networks).
//! - [`tunnel`]: Relay handoff + WebSocket upgrade, wrapped in
//!   `netes_core::transport::TunnelIo`.

pub mod error;
pub mod plain;
pub mod tunnel;

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

pub use error::TransportError;
pub use plain::DirectDialer;
pub use tunnel::{HostAccess, TunnelDialer, TunnelSettings, TunnelStream, WsChannel, callback_url};

/// Marker trait for streams produced by a dialer.
pub trait TransportStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> TransportStream for T {}

/// Opens outbound connections, with the semantics of a plain network dial.
pub trait Dialer: Clone + Send + Sync + 'static {
    /// The stream type produced by this dialer.
    type Stream: TransportStream;

    /// Connect to `addr` (`host:port`) over `network` (e.g. `tcp`).
    fn dial(
        &self,
        network: &str,
        addr: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream, TransportError>> + Send + '_>>;
}
