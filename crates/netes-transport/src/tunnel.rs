//! Relay-tunneled dialer.
//!
//! A dial is a two-step exchange with the relay:
//!
//! 1. POST `{"clusterId", "protocol", "address"}` to the relay dial URL with
//!    Basic credentials; the relay answers with a [`HostAccess`] handoff.
//! 2. Open a WebSocket to the handoff URL, re-targeted at the local callback
//!    host and carrying the one-time token as a query parameter.
//!
//! The resulting channel is wrapped in [`TunnelIo`] so callers get a plain
//! byte stream.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use netes_core::HANDOFF_TOKEN_PARAM;
use netes_core::transport::TunnelIo;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::Dialer;
use crate::error::TransportError;

/// The WebSocket channel underneath a relay tunnel.
pub type WsChannel = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A dialed relay tunnel, readable and writable as bytes.
pub type TunnelStream = TunnelIo<WsChannel>;

/// Handoff returned by the relay: where to connect and the one-time token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAccess {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DialRequest<'a> {
    cluster_id: &'a str,
    protocol: &'a str,
    address: &'a str,
}

/// Process-wide relay settings shared by every tunnel dialer.
#[derive(Clone)]
pub struct TunnelSettings {
    /// Relay endpoint that issues handoffs.
    pub dial_url: String,
    /// `host[:port]` the handoff URL is re-targeted at.
    pub callback_host: String,
    pub access_key: String,
    pub secret_key: String,
    /// Bound on a whole dial. `None` leaves it unbounded.
    pub dial_timeout: Option<Duration>,
}

impl fmt::Debug for TunnelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelSettings")
            .field("dial_url", &self.dial_url)
            .field("callback_host", &self.callback_host)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("dial_timeout", &self.dial_timeout)
            .finish()
    }
}

impl TunnelSettings {
    fn basic_auth(&self) -> Result<HeaderValue, TransportError> {
        let credentials = STANDARD.encode(format!("{}:{}", self.access_key, self.secret_key));
        HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| TransportError::Config(format!("invalid relay credentials: {e}")))
    }
}

/// Dialer bound to one cluster, opening connections through the relay.
///
/// Cheap to clone; clones share the HTTP client and settings.
#[derive(Debug, Clone)]
pub struct TunnelDialer {
    cluster_id: Arc<str>,
    settings: Arc<TunnelSettings>,
    client: reqwest::Client,
}

impl TunnelDialer {
    /// Create a dialer for `cluster_id` with a fresh HTTP client.
    pub fn new(cluster_id: impl Into<Arc<str>>, settings: Arc<TunnelSettings>) -> Self {
        Self::with_client(reqwest::Client::new(), cluster_id, settings)
    }

    /// Create a dialer sharing an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        cluster_id: impl Into<Arc<str>>,
        settings: Arc<TunnelSettings>,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            settings,
            client,
        }
    }

    /// The cluster this dialer reaches into.
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Open a tunnel to `address` inside the cluster's network.
    pub async fn dial_tunnel(
        &self,
        network: &str,
        address: &str,
    ) -> Result<TunnelStream, TransportError> {
        let start = Instant::now();
        let result = match self.settings.dial_timeout {
            Some(limit) => tokio::time::timeout(limit, self.open(network, address))
                .await
                .unwrap_or(Err(TransportError::Timeout(limit))),
            None => self.open(network, address).await,
        };
        netes_metrics::record_tunnel_dial(start.elapsed().as_secs_f64(), result.is_ok());

        match &result {
            Ok(_) => debug!(cluster_id = %self.cluster_id, network, address, "tunnel established"),
            Err(e) => {
                warn!(cluster_id = %self.cluster_id, network, address, error = %e, "tunnel dial failed")
            }
        }
        result
    }

    async fn open(&self, network: &str, address: &str) -> Result<TunnelStream, TransportError> {
        let access = self.handoff(network, address).await?;
        let url = callback_url(&access, &self.settings.callback_host)?;

        let mut request = url.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.settings.basic_auth()?);

        let (channel, _response) = connect_async(request).await?;
        Ok(TunnelIo::new(channel))
    }

    async fn handoff(&self, network: &str, address: &str) -> Result<HostAccess, TransportError> {
        let body = DialRequest {
            cluster_id: &self.cluster_id,
            protocol: network,
            address,
        };

        let response = self
            .client
            .post(&self.settings.dial_url)
            .basic_auth(&self.settings.access_key, Some(&self.settings.secret_key))
            .json(&body)
            .send()
            .await
            .map_err(TransportError::http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<HostAccess>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

impl Dialer for TunnelDialer {
    type Stream = TunnelStream;

    fn dial(
        &self,
        network: &str,
        addr: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream, TransportError>> + Send + '_>> {
        let network = network.to_owned();
        let addr = addr.to_owned();
        Box::pin(async move { self.dial_tunnel(&network, &addr).await })
    }
}

/// Re-target a relay handoff at the local callback host.
///
/// Host and port are replaced by `callback_host`, `http`/`https` become
/// `ws`/`wss`, and the handoff token is appended as a query parameter.
pub fn callback_url(access: &HostAccess, callback_host: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(&access.url)
        .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", access.url)))?;

    let (host, port) = split_host_port(callback_host)?;
    url.set_host(Some(host))
        .map_err(|e| TransportError::InvalidUrl(format!("callback host {callback_host}: {e}")))?;
    url.set_port(port)
        .map_err(|()| TransportError::InvalidUrl(format!("cannot set port on {}", access.url)))?;

    let scheme = match url.scheme() {
        "http" => Some("ws"),
        "https" => Some("wss"),
        _ => None,
    };
    if let Some(scheme) = scheme {
        url.set_scheme(scheme)
            .map_err(|()| TransportError::InvalidUrl(format!("cannot switch {} to {scheme}", access.url)))?;
    }

    url.query_pairs_mut()
        .append_pair(HANDOFF_TOKEN_PARAM, &access.token);
    Ok(url)
}

fn split_host_port(hostport: &str) -> Result<(&str, Option<u16>), TransportError> {
    match hostport.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !hostport.ends_with(']') => {
            let port = port.parse().map_err(|_| {
                TransportError::InvalidUrl(format!("invalid callback port in {hostport}"))
            })?;
            Ok((host, Some(port)))
        }
        _ => Ok((hostport, None)),
    }
}
