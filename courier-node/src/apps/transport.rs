use std::collections::HashMap;
use std::sync::Arc;

use multiaddr::Multiaddr;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use rst_common::with_tokio::tokio::sync::RwLock;
use rst_common::with_tokio::tokio::task::JoinHandle;

use prople_courier_core::message::Envelope;
use prople_courier_core::transport::{TransportBuilder, TransportError};

use super::http::HttpTransport;

/// `MemoryTransport` is an in-process hub routing envelopes to the inbound
/// channel registered for an endpoint
///
/// Envelopes go through the wire encoding on every hop, so the receiver
/// always gets a freshly decoded copy
#[derive(Clone, Default)]
pub struct MemoryTransport {
    routes: Arc<RwLock<HashMap<Multiaddr, UnboundedSender<Envelope>>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `register` binds `endpoint` to a new inbound channel, replacing any previous binding
    pub async fn register(&self, endpoint: Multiaddr) -> UnboundedReceiver<Envelope> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.routes.write().await.insert(endpoint, sender);
        receiver
    }

    pub async fn unregister(&self, endpoint: &Multiaddr) {
        self.routes.write().await.remove(endpoint);
    }
}

#[async_trait]
impl TransportBuilder for MemoryTransport {
    async fn send(&self, endpoint: Multiaddr, envelope: Envelope) -> Result<(), TransportError> {
        let sender = self
            .routes
            .read()
            .await
            .get(&endpoint)
            .cloned()
            .ok_or_else(|| TransportError::UnknownEndpoint(endpoint.to_string()))?;

        let bytes = envelope
            .encode()
            .map_err(|err| TransportError::EncodeError(err.to_string()))?;
        let delivered =
            Envelope::decode(&bytes).map_err(|err| TransportError::EncodeError(err.to_string()))?;

        debug!(
            "[transport:send] {} -> {}",
            delivered.get_type(),
            endpoint
        );

        sender
            .send(delivered)
            .map_err(|err| TransportError::SendError(err.to_string()))
    }
}

/// the endpoint peers should use, the inbound channel and the HTTP server task if any
pub type Registration = (
    Multiaddr,
    UnboundedReceiver<Envelope>,
    Option<JoinHandle<()>>,
);

/// `NodeTransport` is the transport a node runs on, chosen at assembly time
#[derive(Clone)]
pub enum NodeTransport {
    Memory(MemoryTransport),
    Http(HttpTransport),
}

impl Default for NodeTransport {
    fn default() -> Self {
        NodeTransport::Memory(MemoryTransport::new())
    }
}

impl NodeTransport {
    /// `register` opens the inbound side of `endpoint`
    pub async fn register(&self, endpoint: Multiaddr) -> Result<Registration, TransportError> {
        match self {
            NodeTransport::Memory(memory) => {
                let inbound = memory.register(endpoint.clone()).await;
                Ok((endpoint, inbound, None))
            }
            NodeTransport::Http(http) => {
                let inbound = http.listen(endpoint).await?;
                Ok((inbound.endpoint, inbound.receiver, Some(inbound.server)))
            }
        }
    }
}

#[async_trait]
impl TransportBuilder for NodeTransport {
    async fn send(&self, endpoint: Multiaddr, envelope: Envelope) -> Result<(), TransportError> {
        match self {
            NodeTransport::Memory(memory) => memory.send(endpoint, envelope).await,
            NodeTransport::Http(http) => http.send(endpoint, envelope).await,
        }
    }
}
