use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use multiaddr::{Multiaddr, Protocol};

use rst_common::standard::async_trait::async_trait;
use rst_common::with_http_tokio::axum::body::Bytes;
use rst_common::with_http_tokio::axum::extract::State;
use rst_common::with_http_tokio::axum::http::StatusCode;
use rst_common::with_http_tokio::axum::routing::post;
use rst_common::with_http_tokio::axum::{self, Router};
use rst_common::with_http_tokio::tower_http::timeout::TimeoutLayer;
use rst_common::with_http_tokio::tower_http::trace::TraceLayer;
use rst_common::with_logging::log::{debug, error, info, warn};
use rst_common::with_tokio::tokio::{
    self,
    net::TcpListener,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use prople_courier_core::message::Envelope;
use prople_courier_core::transport::{TransportBuilder, TransportError};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// `Inbound` is a bound HTTP listener feeding decoded envelopes into a channel
pub struct Inbound {
    pub endpoint: Multiaddr,
    pub receiver: UnboundedReceiver<Envelope>,
    pub server: JoinHandle<()>,
}

/// `HttpTransport` POSTs the wire encoding of an envelope to the peer endpoint.
/// Endpoints are `/ip4|ip6|dns/<host>/tcp/<port>` addresses
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `endpoint_url` maps a multiaddr to the URL the peer listens on
    pub fn endpoint_url(endpoint: &Multiaddr) -> Result<String, TransportError> {
        let mut host: Option<String> = None;
        let mut port: Option<u16> = None;

        for protocol in endpoint.iter() {
            match protocol {
                Protocol::Ip4(addr) => host = Some(addr.to_string()),
                Protocol::Ip6(addr) => host = Some(format!("[{}]", addr)),
                Protocol::Dns(name) | Protocol::Dns4(name) | Protocol::Dns6(name) => {
                    host = Some(name.to_string())
                }
                Protocol::Tcp(value) => port = Some(value),
                _ => return Err(TransportError::UnknownEndpoint(endpoint.to_string())),
            }
        }

        match (host, port) {
            (Some(host), Some(port)) => Ok(format!("http://{}:{}/", host, port)),
            _ => Err(TransportError::UnknownEndpoint(endpoint.to_string())),
        }
    }

    fn socket_addr(endpoint: &Multiaddr) -> Result<SocketAddr, TransportError> {
        let mut ip: Option<IpAddr> = None;
        let mut port: Option<u16> = None;

        for protocol in endpoint.iter() {
            match protocol {
                Protocol::Ip4(addr) => ip = Some(IpAddr::V4(addr)),
                Protocol::Ip6(addr) => ip = Some(IpAddr::V6(addr)),
                Protocol::Tcp(value) => port = Some(value),
                _ => return Err(TransportError::UnknownEndpoint(endpoint.to_string())),
            }
        }

        match (ip, port) {
            (Some(ip), Some(port)) => Ok(SocketAddr::new(ip, port)),
            _ => Err(TransportError::UnknownEndpoint(endpoint.to_string())),
        }
    }

    fn to_multiaddr(addr: SocketAddr) -> Multiaddr {
        let mut endpoint = Multiaddr::empty();
        match addr.ip() {
            IpAddr::V4(ip) => endpoint.push(Protocol::Ip4(ip)),
            IpAddr::V6(ip) => endpoint.push(Protocol::Ip6(ip)),
        }
        endpoint.push(Protocol::Tcp(addr.port()));
        endpoint
    }

    /// `listen` binds `endpoint` and serves the inbound route on it. A zero tcp
    /// port picks a free one, the returned endpoint carries the bound port
    pub async fn listen(&self, endpoint: Multiaddr) -> Result<Inbound, TransportError> {
        let addr = HttpTransport::socket_addr(&endpoint)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| TransportError::SendError(err.to_string()))?;

        let bound = listener
            .local_addr()
            .map_err(|err| TransportError::SendError(err.to_string()))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let app = Router::new()
            .route("/", post(accept))
            .layer((
                TraceLayer::new_for_http(),
                TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)),
            ))
            .with_state(sender);

        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!("[http:listen] server stopped: {}", err);
            }
        });

        let bound_endpoint = HttpTransport::to_multiaddr(bound);
        info!("[http:listen] inbound listening at {}", bound_endpoint);

        Ok(Inbound {
            endpoint: bound_endpoint,
            receiver,
            server,
        })
    }
}

async fn accept(State(sender): State<UnboundedSender<Envelope>>, body: Bytes) -> StatusCode {
    let envelope = match Envelope::decode(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!("[http:accept] undecodable envelope: {}", err);
            return StatusCode::BAD_REQUEST;
        }
    };

    debug!("[http:accept] {}", envelope.get_type());
    match sender.send(envelope) {
        Ok(_) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[async_trait]
impl TransportBuilder for HttpTransport {
    async fn send(&self, endpoint: Multiaddr, envelope: Envelope) -> Result<(), TransportError> {
        let url = HttpTransport::endpoint_url(&endpoint)?;
        let bytes = envelope
            .encode()
            .map_err(|err| TransportError::EncodeError(err.to_string()))?;

        debug!("[http:send] {} -> {}", envelope.get_type(), url);

        let response = self
            .client
            .post(url.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .body(bytes)
            .send()
            .await
            .map_err(|err| TransportError::SendError(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::SendError(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }

        Ok(())
    }
}
