use std::fmt;

use derive_more::{Display, From, Into};

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

pub const TYPE_CONNECTION_REQUEST: &str = "connections/1.0/request";
pub const TYPE_CONNECTION_RESPONSE: &str = "connections/1.0/response";
pub const TYPE_CONNECTION_ACK: &str = "connections/1.0/ack";
pub const TYPE_CREDENTIAL_PROPOSAL: &str = "issue-credential/1.0/propose-credential";
pub const TYPE_CREDENTIAL_OFFER: &str = "issue-credential/1.0/offer-credential";
pub const TYPE_CREDENTIAL_REQUEST: &str = "issue-credential/1.0/request-credential";
pub const TYPE_CREDENTIAL_ISSUE: &str = "issue-credential/1.0/issue-credential";
pub const TYPE_CREDENTIAL_ACK: &str = "issue-credential/1.0/ack";
pub const TYPE_PROBLEM_REPORT: &str = "notification/1.0/problem-report";

#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum MessageError {
    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("invalid message body: {0}")]
    InvalidBody(String),

    #[error("encode error: {0}")]
    EncodeError(String),

    #[error("decode error: {0}")]
    DecodeError(String),
}

/// `MessageID` identifies a single envelope on the wire. It is the key used
/// to detect a redelivered message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(crate = "self::serde")]
pub struct MessageID(String);

impl MessageID {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// `ThreadID` correlates all messages belonging to one protocol run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(crate = "self::serde")]
pub struct ThreadID(String);

impl ThreadID {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// `MessageKind` is the closed set of message types an agent knows how to route.
/// Anything outside of it is rejected while decoding the envelope body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ConnectionRequest,
    ConnectionResponse,
    ConnectionAck,
    CredentialProposal,
    CredentialOffer,
    CredentialRequest,
    CredentialIssue,
    CredentialAck,
    ProblemReport,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::ConnectionRequest => TYPE_CONNECTION_REQUEST,
            MessageKind::ConnectionResponse => TYPE_CONNECTION_RESPONSE,
            MessageKind::ConnectionAck => TYPE_CONNECTION_ACK,
            MessageKind::CredentialProposal => TYPE_CREDENTIAL_PROPOSAL,
            MessageKind::CredentialOffer => TYPE_CREDENTIAL_OFFER,
            MessageKind::CredentialRequest => TYPE_CREDENTIAL_REQUEST,
            MessageKind::CredentialIssue => TYPE_CREDENTIAL_ISSUE,
            MessageKind::CredentialAck => TYPE_CREDENTIAL_ACK,
            MessageKind::ProblemReport => TYPE_PROBLEM_REPORT,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            MessageKind::ConnectionRequest
                | MessageKind::ConnectionResponse
                | MessageKind::ConnectionAck
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for MessageKind {
    type Error = MessageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            TYPE_CONNECTION_REQUEST => Ok(MessageKind::ConnectionRequest),
            TYPE_CONNECTION_RESPONSE => Ok(MessageKind::ConnectionResponse),
            TYPE_CONNECTION_ACK => Ok(MessageKind::ConnectionAck),
            TYPE_CREDENTIAL_PROPOSAL => Ok(MessageKind::CredentialProposal),
            TYPE_CREDENTIAL_OFFER => Ok(MessageKind::CredentialOffer),
            TYPE_CREDENTIAL_REQUEST => Ok(MessageKind::CredentialRequest),
            TYPE_CREDENTIAL_ISSUE => Ok(MessageKind::CredentialIssue),
            TYPE_CREDENTIAL_ACK => Ok(MessageKind::CredentialAck),
            TYPE_PROBLEM_REPORT => Ok(MessageKind::ProblemReport),
            _ => Err(MessageError::UnknownType(value.to_string())),
        }
    }
}
