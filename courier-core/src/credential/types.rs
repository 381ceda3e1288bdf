use std::fmt;
use std::sync::Arc;

use derive_more::{Display, From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::Duration;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::ConnectionID;
use crate::message::{
    CredentialAck, CredentialIssue, CredentialOffer, CredentialProposal, CredentialRequest,
    Envelope, ProblemReport, ThreadID,
};

use super::exchange::CredentialExchange;
use super::preview::CredentialPreview;

#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum CredentialError {
    #[error("connection not ready: {0}")]
    ConnectionNotReady(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("offer mismatch: {0}")]
    OfferMismatch(String),

    #[error("credential verification failed: {0}")]
    CredentialVerificationFailed(String),

    #[error("exchange not found: {0}")]
    ExchangeNotFound(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("repo error: {0}")]
    RepoError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("wallet error: {0}")]
    WalletError(String),

    #[error("ledger error: {0}")]
    LedgerError(String),

    #[error("message error: {0}")]
    MessageError(String),

    #[error("json error: {0}")]
    JSONError(String),

    #[error("unserialize json error: {0}")]
    JSONUnserializeError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(crate = "self::serde")]
pub struct ExchangeID(String);

impl ExchangeID {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// `State` follows the issue-credential protocol. The declaration order is the
/// protocol order, a record only moves to a later state or to `Abandoned`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum State {
    ProposalSent,
    ProposalReceived,
    OfferSent,
    OfferReceived,
    RequestSent,
    RequestReceived,
    CredentialIssued,
    Done,
    Abandoned,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Done | State::Abandoned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum Role {
    Issuer,
    Holder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
#[serde(rename_all = "snake_case")]
pub enum AutoAccept {
    #[default]
    Never,
    ContentApproved,
}

pub type ContentApproval = Arc<dyn Fn(&CredentialExchange) -> bool + Send + Sync>;

/// `AutoAcceptPolicy` decides whether an agent answers an incoming proposal, offer
/// or request without waiting for the application
///
/// With `ContentApproved` the approval callback is called once per incoming message, the
/// default callback approves everything
#[derive(Clone)]
pub struct AutoAcceptPolicy {
    mode: AutoAccept,
    approval: ContentApproval,
}

impl AutoAcceptPolicy {
    pub fn never() -> Self {
        Self {
            mode: AutoAccept::Never,
            approval: Arc::new(|_| false),
        }
    }

    pub fn content_approved() -> Self {
        Self {
            mode: AutoAccept::ContentApproved,
            approval: Arc::new(|_| true),
        }
    }

    pub fn content_approved_with<F>(approval: F) -> Self
    where
        F: Fn(&CredentialExchange) -> bool + Send + Sync + 'static,
    {
        Self {
            mode: AutoAccept::ContentApproved,
            approval: Arc::new(approval),
        }
    }

    pub fn get_mode(&self) -> AutoAccept {
        self.mode
    }

    pub fn approves(&self, exchange: &CredentialExchange) -> bool {
        match self.mode {
            AutoAccept::Never => false,
            AutoAccept::ContentApproved => (self.approval)(exchange),
        }
    }
}

impl Default for AutoAcceptPolicy {
    fn default() -> Self {
        Self::never()
    }
}

impl From<AutoAccept> for AutoAcceptPolicy {
    fn from(value: AutoAccept) -> Self {
        match value {
            AutoAccept::Never => Self::never(),
            AutoAccept::ContentApproved => Self::content_approved(),
        }
    }
}

impl fmt::Debug for AutoAcceptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoAcceptPolicy")
            .field("mode", &self.mode)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfferConfig {
    pub credential_definition_id: String,
    pub preview: CredentialPreview,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalConfig {
    pub credential_definition_id: String,
    pub preview: CredentialPreview,
    pub comment: Option<String>,
}

#[async_trait]
pub trait RepoBuilder: Send + Sync {
    async fn save(&self, exchange: CredentialExchange) -> Result<(), CredentialError>;

    async fn get_exchange(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError>;

    async fn find_by_thread(
        &self,
        thread_id: ThreadID,
    ) -> Result<Option<CredentialExchange>, CredentialError>;

    async fn list_exchanges(
        &self,
        state: Option<State>,
    ) -> Result<Vec<CredentialExchange>, CredentialError>;

    async fn list_by_connection(
        &self,
        connection_id: ConnectionID,
    ) -> Result<Vec<CredentialExchange>, CredentialError>;
}

/// `UsecaseBuilder` is the issue-credential protocol engine
///
/// Methods starting with `handle_` are called for inbound messages, they expect the caller to
/// serialize them per thread. The other methods are local actions triggered by the application.
/// Every method sends its outbound message first and only persists the new state once the
/// transport accepted it
#[async_trait]
pub trait UsecaseBuilder: Send + Sync {
    async fn propose_credential(
        &self,
        thread_id: ThreadID,
        connection_id: ConnectionID,
        config: ProposalConfig,
    ) -> Result<CredentialExchange, CredentialError>;

    async fn handle_proposal(
        &self,
        envelope: Envelope,
        connection_id: ConnectionID,
        proposal: CredentialProposal,
    ) -> Result<CredentialExchange, CredentialError>;

    async fn accept_proposal(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError>;

    /// `offer_credential` requires the connection to be `Complete`, no record is created otherwise
    async fn offer_credential(
        &self,
        thread_id: ThreadID,
        connection_id: ConnectionID,
        config: OfferConfig,
    ) -> Result<CredentialExchange, CredentialError>;

    async fn handle_offer(
        &self,
        envelope: Envelope,
        connection_id: ConnectionID,
        offer: CredentialOffer,
    ) -> Result<CredentialExchange, CredentialError>;

    async fn accept_offer(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError>;

    async fn handle_request(
        &self,
        envelope: Envelope,
        request: CredentialRequest,
    ) -> Result<CredentialExchange, CredentialError>;

    async fn accept_request(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError>;

    async fn handle_credential(
        &self,
        envelope: Envelope,
        issue: CredentialIssue,
    ) -> Result<CredentialExchange, CredentialError>;

    async fn handle_ack(
        &self,
        envelope: Envelope,
        ack: CredentialAck,
    ) -> Result<CredentialExchange, CredentialError>;

    async fn handle_problem_report(
        &self,
        envelope: Envelope,
        report: ProblemReport,
    ) -> Result<CredentialExchange, CredentialError>;

    async fn abandon(
        &self,
        id: ExchangeID,
        reason: String,
    ) -> Result<CredentialExchange, CredentialError>;

    /// `abandon_expired` abandons every non terminal exchange idle for longer than `max_idle`
    async fn abandon_expired(
        &self,
        max_idle: Duration,
    ) -> Result<Vec<CredentialExchange>, CredentialError>;

    async fn get_exchange(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError>;

    async fn list_exchanges(
        &self,
        state: Option<State>,
    ) -> Result<Vec<CredentialExchange>, CredentialError>;
}
