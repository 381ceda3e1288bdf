use multiaddr::Multiaddr;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::identity::is_valid_verkey;
use crate::message::ThreadID;

use super::types::ConnectionError;

/// `Invitation` is shared out of band by the inviter. Its `@id` becomes the thread id
/// of the handshake and its recipient key is the key the response must be signed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Invitation {
    #[serde(rename = "@id")]
    id: String,

    label: String,

    #[serde(rename = "recipientKey")]
    recipient_key: String,

    #[serde(rename = "serviceEndpoint")]
    service_endpoint: Multiaddr,
}

impl Invitation {
    pub fn new(label: String, recipient_key: String, service_endpoint: Multiaddr) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label,
            recipient_key,
            service_endpoint,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConnectionError> {
        let invitation: Invitation = serde_json::from_str(json)
            .map_err(|err| ConnectionError::InvalidInvitation(err.to_string()))?;

        invitation.validate()?;
        Ok(invitation)
    }

    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.id.is_empty() {
            return Err(ConnectionError::InvalidInvitation(
                "missing invitation id".to_string(),
            ));
        }

        if self.label.is_empty() {
            return Err(ConnectionError::InvalidInvitation(
                "missing label".to_string(),
            ));
        }

        if !is_valid_verkey(&self.recipient_key) {
            return Err(ConnectionError::InvalidInvitation(format!(
                "invalid recipient key: {}",
                self.recipient_key
            )));
        }

        if self.service_endpoint.is_empty() {
            return Err(ConnectionError::InvalidInvitation(
                "missing service endpoint".to_string(),
            ));
        }

        Ok(())
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_thread_id(&self) -> ThreadID {
        ThreadID::from(self.id.to_owned())
    }

    pub fn get_label(&self) -> String {
        self.label.to_owned()
    }

    pub fn get_recipient_key(&self) -> String {
        self.recipient_key.to_owned()
    }

    pub fn get_service_endpoint(&self) -> Multiaddr {
        self.service_endpoint.to_owned()
    }
}

impl ToJSON for Invitation {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}
