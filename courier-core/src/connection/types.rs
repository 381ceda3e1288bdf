use derive_more::{Display, From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

use crate::message::{
    ConnectionAck, ConnectionRequest, ConnectionResponse, Envelope, ProblemReport, ThreadID,
};

use super::connection::Connection;
use super::invitation::Invitation;

#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum ConnectionError {
    #[error("invalid invitation: {0}")]
    InvalidInvitation(String),

    #[error("unknown invitation: {0}")]
    UnknownInvitation(String),

    #[error("connection verification failed: {0}")]
    ConnectionVerificationFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("repo error: {0}")]
    RepoError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("wallet error: {0}")]
    WalletError(String),

    #[error("message error: {0}")]
    MessageError(String),

    #[error("json error: {0}")]
    JSONError(String),

    #[error("unserialize json error: {0}")]
    JSONUnserializeError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(crate = "self::serde")]
pub struct ConnectionID(String);

impl ConnectionID {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// `State` follows the connection handshake. The declaration order is the
/// handshake order, a record only moves to a later state or to `Abandoned`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    Invited,
    Requested,
    Responded,
    Complete,
    Abandoned,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Complete | State::Abandoned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum Role {
    Inviter,
    Invitee,
}

#[async_trait]
pub trait RepoBuilder: Send + Sync {
    async fn save(&self, connection: Connection) -> Result<(), ConnectionError>;

    async fn get_connection(&self, id: ConnectionID) -> Result<Connection, ConnectionError>;

    async fn find_by_thread(
        &self,
        thread_id: ThreadID,
    ) -> Result<Option<Connection>, ConnectionError>;

    async fn find_by_peer_key(&self, peer_key: String) -> Result<Vec<Connection>, ConnectionError>;

    async fn list_connections(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError>;
}

/// `UsecaseBuilder` is the connection protocol engine
///
/// The inviter side goes through `create_invitation`, `handle_request`, `accept_request`
/// and `handle_ack`. The invitee side goes through `receive_invitation` and `handle_response`.
/// Inbound `handle_*` calls must be serialized per thread by the caller
#[async_trait]
pub trait UsecaseBuilder: Send + Sync {
    async fn create_invitation(&self) -> Result<(Invitation, Connection), ConnectionError>;

    async fn receive_invitation(
        &self,
        invitation: Invitation,
    ) -> Result<Connection, ConnectionError>;

    async fn handle_request(
        &self,
        envelope: Envelope,
        request: ConnectionRequest,
    ) -> Result<Connection, ConnectionError>;

    /// `accept_request` answers a request kept in `Requested` because auto accept is disabled
    async fn accept_request(&self, id: ConnectionID) -> Result<Connection, ConnectionError>;

    async fn handle_response(
        &self,
        envelope: Envelope,
        response: ConnectionResponse,
    ) -> Result<Connection, ConnectionError>;

    async fn handle_ack(
        &self,
        envelope: Envelope,
        ack: ConnectionAck,
    ) -> Result<Connection, ConnectionError>;

    /// `complete_on_activity` completes an inviter side `Responded` connection when the peer
    /// already uses it before its ack arrived. A later ack on the same thread is a no-op
    async fn complete_on_activity(&self, id: ConnectionID) -> Result<Connection, ConnectionError>;

    async fn handle_problem_report(
        &self,
        envelope: Envelope,
        report: ProblemReport,
    ) -> Result<Connection, ConnectionError>;

    async fn abandon(&self, id: ConnectionID, reason: String)
        -> Result<Connection, ConnectionError>;

    async fn get_connection(&self, id: ConnectionID) -> Result<Connection, ConnectionError>;

    async fn list_connections(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError>;
}
