//! `transport` is the outbound seam of an agent. Delivery is asynchronous:
//! a successful `send` only means the envelope was handed over, not that
//! the peer processed it
use multiaddr::Multiaddr;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use crate::message::Envelope;

#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum TransportError {
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("send error: {0}")]
    SendError(String),

    #[error("encode error: {0}")]
    EncodeError(String),
}

#[async_trait]
pub trait TransportBuilder: Send + Sync {
    async fn send(&self, endpoint: Multiaddr, envelope: Envelope) -> Result<(), TransportError>;
}
