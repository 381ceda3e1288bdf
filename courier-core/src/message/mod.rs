//! `message` defines the envelope exchanged between agents and the typed
//! payloads carried inside it
mod envelope;
mod payload;
mod types;

pub use envelope::{Envelope, Thread};
pub use payload::{
    ConnectionAck, ConnectionRequest, ConnectionResponse, ConnectionSignature, CredentialAck,
    CredentialIssue, CredentialOffer, CredentialProposal, CredentialRequest, Message,
    ProblemReport, ACK_STATUS_OK,
};
pub use types::{MessageError, MessageID, MessageKind, ThreadID};

pub mod kind {
    pub use super::types::{
        TYPE_CONNECTION_ACK, TYPE_CONNECTION_REQUEST, TYPE_CONNECTION_RESPONSE,
        TYPE_CREDENTIAL_ACK, TYPE_CREDENTIAL_ISSUE, TYPE_CREDENTIAL_OFFER,
        TYPE_CREDENTIAL_PROPOSAL, TYPE_CREDENTIAL_REQUEST, TYPE_PROBLEM_REPORT,
    };
}
