use multiaddr::Multiaddr;

use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::message::ThreadID;

use super::invitation::Invitation;
use super::types::{ConnectionError, ConnectionID, Role, State};

/// `Connection` is the persisted record of a handshake with one peer
///
/// The peer fields are filled progressively: the invitee knows the inviter key and endpoint
/// from the invitation, the inviter learns the invitee from its request. Records are never
/// removed, a failed handshake ends as `Abandoned`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Connection {
    id: ConnectionID,
    thread_id: ThreadID,
    state: State,
    role: Role,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    peer_label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    peer_did: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    peer_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    peer_endpoint: Option<Multiaddr>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    error_message: Option<String>,

    #[serde(with = "ts_seconds")]
    created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(role: Role, state: State, thread_id: ThreadID) -> Self {
        Self {
            id: ConnectionID::generate(),
            thread_id,
            state,
            role,
            peer_label: None,
            peer_did: None,
            peer_key: None,
            peer_endpoint: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn from_invitation(invitation: &Invitation) -> Self {
        let mut connection = Connection::new(
            Role::Invitee,
            State::Requested,
            invitation.get_thread_id(),
        );

        connection.peer_label = Some(invitation.get_label());
        connection.peer_key = Some(invitation.get_recipient_key());
        connection.peer_endpoint = Some(invitation.get_service_endpoint());
        connection
    }

    /// `transition` moves the record to `next`, returning the previous state
    pub fn transition(&mut self, next: State) -> Result<State, ConnectionError> {
        if self.state.is_terminal() {
            return Err(ConnectionError::InvalidState(format!(
                "connection {} is already {:?}",
                self.id, self.state
            )));
        }

        if next != State::Abandoned && next <= self.state {
            return Err(ConnectionError::InvalidState(format!(
                "connection {} cannot move from {:?} to {:?}",
                self.id, self.state, next
            )));
        }

        let previous = self.state;
        self.state = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn expect(&self, role: Role, state: State) -> Result<(), ConnectionError> {
        if self.role != role || self.state != state {
            return Err(ConnectionError::InvalidState(format!(
                "connection {} is {:?}/{:?}, expected {:?}/{:?}",
                self.id, self.role, self.state, role, state
            )));
        }

        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Complete
    }

    pub(crate) fn set_peer(&mut self, label: String, did: String, key: String, endpoint: Multiaddr) {
        self.peer_label = Some(label);
        self.peer_did = Some(did);
        self.peer_key = Some(key);
        self.peer_endpoint = Some(endpoint);
    }

    pub(crate) fn set_error_message(&mut self, message: String) {
        self.error_message = Some(message);
    }

    pub fn get_id(&self) -> ConnectionID {
        self.id.to_owned()
    }

    pub fn get_thread_id(&self) -> ThreadID {
        self.thread_id.to_owned()
    }

    pub fn get_state(&self) -> State {
        self.state
    }

    pub fn get_role(&self) -> Role {
        self.role
    }

    pub fn get_peer_label(&self) -> Option<String> {
        self.peer_label.to_owned()
    }

    pub fn get_peer_did(&self) -> Option<String> {
        self.peer_did.to_owned()
    }

    pub fn get_peer_key(&self) -> Option<String> {
        self.peer_key.to_owned()
    }

    pub fn get_peer_endpoint(&self) -> Option<Multiaddr> {
        self.peer_endpoint.to_owned()
    }

    pub fn get_error_message(&self) -> Option<String> {
        self.error_message.to_owned()
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl ToJSON for Connection {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json =
            serde_json::to_vec(&self).map_err(|err| ConnectionError::JSONError(err.to_string()))?;
        Ok(json)
    }
}

impl TryFrom<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let connection: Connection = serde_json::from_slice(&value)
            .map_err(|err| ConnectionError::JSONUnserializeError(err.to_string()))?;
        Ok(connection)
    }
}
