use multiaddr::Multiaddr;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};

use crate::credential::{CredentialPreview, IssuedCredential};

use super::types::{MessageError, MessageKind, ThreadID};

pub const ACK_STATUS_OK: &str = "OK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionRequest {
    pub label: String,
    pub did: String,
    pub verkey: String,
    pub endpoint: Multiaddr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionResponse {
    pub label: String,
    pub did: String,
    pub verkey: String,
    pub endpoint: Multiaddr,
    pub signature: String,
}

/// `ConnectionSignature` is the exact content an inviter signs with the invitation key
/// when it responds to a connection request. The invitee rebuilds it from the response
/// and the thread it belongs to before verifying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionSignature {
    pub thread_id: ThreadID,
    pub did: String,
    pub verkey: String,
    pub endpoint: Multiaddr,
}

impl ConnectionSignature {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessageError> {
        serde_json::to_vec(self).map_err(|err| MessageError::EncodeError(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionAck {
    pub status: String,
}

impl Default for ConnectionAck {
    fn default() -> Self {
        Self {
            status: ACK_STATUS_OK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialProposal {
    pub credential_definition_id: String,
    pub preview: CredentialPreview,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialOffer {
    pub credential_definition_id: String,
    pub preview: CredentialPreview,
    pub nonce: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialRequest {
    pub credential_definition_id: String,
    pub preview: CredentialPreview,
    pub link_secret_commitment: String,
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialIssue {
    pub credential: IssuedCredential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialAck {
    pub status: String,
}

impl Default for CredentialAck {
    fn default() -> Self {
        Self {
            status: ACK_STATUS_OK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProblemReport {
    pub code: String,
    pub explanation: String,
}

impl ProblemReport {
    pub fn new(code: &str, explanation: String) -> Self {
        Self {
            code: code.to_string(),
            explanation,
        }
    }
}

/// `Message` is the decoded, typed body of an [`super::Envelope`]
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ConnectionRequest(ConnectionRequest),
    ConnectionResponse(ConnectionResponse),
    ConnectionAck(ConnectionAck),
    CredentialProposal(CredentialProposal),
    CredentialOffer(CredentialOffer),
    CredentialRequest(CredentialRequest),
    CredentialIssue(CredentialIssue),
    CredentialAck(CredentialAck),
    ProblemReport(ProblemReport),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::ConnectionRequest(_) => MessageKind::ConnectionRequest,
            Message::ConnectionResponse(_) => MessageKind::ConnectionResponse,
            Message::ConnectionAck(_) => MessageKind::ConnectionAck,
            Message::CredentialProposal(_) => MessageKind::CredentialProposal,
            Message::CredentialOffer(_) => MessageKind::CredentialOffer,
            Message::CredentialRequest(_) => MessageKind::CredentialRequest,
            Message::CredentialIssue(_) => MessageKind::CredentialIssue,
            Message::CredentialAck(_) => MessageKind::CredentialAck,
            Message::ProblemReport(_) => MessageKind::ProblemReport,
        }
    }

    pub(crate) fn to_body(&self) -> Result<Value, MessageError> {
        let body = match self {
            Message::ConnectionRequest(payload) => serde_json::to_value(payload),
            Message::ConnectionResponse(payload) => serde_json::to_value(payload),
            Message::ConnectionAck(payload) => serde_json::to_value(payload),
            Message::CredentialProposal(payload) => serde_json::to_value(payload),
            Message::CredentialOffer(payload) => serde_json::to_value(payload),
            Message::CredentialRequest(payload) => serde_json::to_value(payload),
            Message::CredentialIssue(payload) => serde_json::to_value(payload),
            Message::CredentialAck(payload) => serde_json::to_value(payload),
            Message::ProblemReport(payload) => serde_json::to_value(payload),
        };

        body.map_err(|err| MessageError::EncodeError(err.to_string()))
    }

    pub(crate) fn from_body(kind: MessageKind, body: Value) -> Result<Self, MessageError> {
        let message = match kind {
            MessageKind::ConnectionRequest => {
                serde_json::from_value(body).map(Message::ConnectionRequest)
            }
            MessageKind::ConnectionResponse => {
                serde_json::from_value(body).map(Message::ConnectionResponse)
            }
            MessageKind::ConnectionAck => serde_json::from_value(body).map(Message::ConnectionAck),
            MessageKind::CredentialProposal => {
                serde_json::from_value(body).map(Message::CredentialProposal)
            }
            MessageKind::CredentialOffer => {
                serde_json::from_value(body).map(Message::CredentialOffer)
            }
            MessageKind::CredentialRequest => {
                serde_json::from_value(body).map(Message::CredentialRequest)
            }
            MessageKind::CredentialIssue => {
                serde_json::from_value(body).map(Message::CredentialIssue)
            }
            MessageKind::CredentialAck => serde_json::from_value(body).map(Message::CredentialAck),
            MessageKind::ProblemReport => serde_json::from_value(body).map(Message::ProblemReport),
        };

        message.map_err(|err| MessageError::InvalidBody(format!("{}: {}", kind, err)))
    }
}
