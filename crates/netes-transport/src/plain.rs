//! Direct TCP dialer.
//!
//! Used where the target is routable from the control plane (local
//! development, tests, or clusters on a shared network).

use std::future::Future;
use std::pin::Pin;

use tokio::net::TcpStream;

use crate::Dialer;
use crate::error::TransportError;

/// Plain TCP dialer: connects directly, without a relay.
#[derive(Debug, Clone, Default)]
pub struct DirectDialer;

impl DirectDialer {
    /// Create a direct dialer.
    pub fn new() -> Self {
        Self
    }
}

impl Dialer for DirectDialer {
    type Stream = TcpStream;

    fn dial(
        &self,
        network: &str,
        addr: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream, TransportError>> + Send + '_>> {
        let network = network.to_owned();
        let addr = addr.to_owned();
        Box::pin(async move {
            if !matches!(network.as_str(), "tcp" | "tcp4" | "tcp6") {
                return Err(TransportError::UnsupportedNetwork(network));
            }
            let tcp = TcpStream::connect(&addr).await?;
            tcp.set_nodelay(true)?;
            Ok(tcp)
        })
    }
}
