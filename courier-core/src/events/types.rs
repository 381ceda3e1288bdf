use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::{Connection, ConnectionID, State as ConnectionState};
use crate::credential::{CredentialExchange, ExchangeID, State as ExchangeState};

#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum EventError {
    #[error("handler error: {0}")]
    HandlerError(String),

    #[error("handler closed")]
    HandlerClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum EventType {
    ConnectionStateChanged,
    CredentialStateChanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionStateChanged {
    pub connection_id: ConnectionID,
    pub previous_state: Option<ConnectionState>,
    pub state: ConnectionState,
    pub record: Connection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialStateChanged {
    pub exchange_id: ExchangeID,
    pub previous_state: Option<ExchangeState>,
    pub state: ExchangeState,
    pub record: CredentialExchange,
}

/// `Event` is published once per committed state change. `previous_state` is `None`
/// when the record has just been created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum Event {
    ConnectionStateChanged(ConnectionStateChanged),
    CredentialStateChanged(CredentialStateChanged),
}

impl Event {
    pub fn connection(previous_state: Option<ConnectionState>, record: &Connection) -> Self {
        Event::ConnectionStateChanged(ConnectionStateChanged {
            connection_id: record.get_id(),
            previous_state,
            state: record.get_state(),
            record: record.clone(),
        })
    }

    pub fn credential(previous_state: Option<ExchangeState>, record: &CredentialExchange) -> Self {
        Event::CredentialStateChanged(CredentialStateChanged {
            exchange_id: record.get_id(),
            previous_state,
            state: record.get_state(),
            record: record.clone(),
        })
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Event::ConnectionStateChanged(_) => EventType::ConnectionStateChanged,
            Event::CredentialStateChanged(_) => EventType::CredentialStateChanged,
        }
    }
}

/// `EventHandler` reacts to a published [`Event`]
///
/// Any plain closure `Fn(Event) -> Result<(), EventError>` is a handler. Handlers needing
/// to call back into the agent should forward events through a channel instead of
/// blocking the dispatcher
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> Result<(), EventError>;
}

#[async_trait]
impl<F> EventHandler for F
where
    F: Fn(Event) -> Result<(), EventError> + Send + Sync,
{
    async fn handle(&self, event: Event) -> Result<(), EventError> {
        (self)(event)
    }
}
