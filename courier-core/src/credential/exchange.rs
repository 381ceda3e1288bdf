use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::connection::ConnectionID;
use crate::message::ThreadID;

use super::preview::CredentialPreview;
use super::types::{CredentialError, ExchangeID, Role, State};

/// `CredentialExchange` is the persisted record of one issue-credential protocol run
///
/// The record belongs to exactly one connection and one thread. Its state only moves forward,
/// see [`CredentialExchange::transition`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialExchange {
    id: ExchangeID,
    connection_id: ConnectionID,
    thread_id: ThreadID,
    state: State,
    role: Role,
    credential_definition_id: String,
    preview: CredentialPreview,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    comment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    nonce: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    link_secret_commitment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    credential_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    error_message: Option<String>,

    #[serde(with = "ts_seconds")]
    created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    updated_at: DateTime<Utc>,
}

impl CredentialExchange {
    pub fn new(
        role: Role,
        state: State,
        connection_id: ConnectionID,
        thread_id: ThreadID,
        credential_definition_id: String,
        preview: CredentialPreview,
    ) -> Self {
        Self {
            id: ExchangeID::generate(),
            connection_id,
            thread_id,
            state,
            role,
            credential_definition_id,
            preview,
            comment: None,
            nonce: None,
            link_secret_commitment: None,
            credential_id: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// `transition` moves the record to `next`, returning the previous state
    ///
    /// Allowed moves are any later protocol state, or `Abandoned` from any non terminal state.
    /// Terminal records never move again
    pub fn transition(&mut self, next: State) -> Result<State, CredentialError> {
        if self.state.is_terminal() {
            return Err(CredentialError::InvalidState(format!(
                "exchange {} is already {:?}",
                self.id, self.state
            )));
        }

        if next != State::Abandoned && next <= self.state {
            return Err(CredentialError::InvalidState(format!(
                "exchange {} cannot move from {:?} to {:?}",
                self.id, self.state, next
            )));
        }

        let previous = self.state;
        self.state = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    /// `expect` guards an operation that is only valid for a given role and state
    pub fn expect(&self, role: Role, state: State) -> Result<(), CredentialError> {
        if self.role != role || self.state != state {
            return Err(CredentialError::InvalidState(format!(
                "exchange {} is {:?}/{:?}, expected {:?}/{:?}",
                self.id, self.role, self.state, role, state
            )));
        }

        Ok(())
    }

    pub fn is_idle_since(&self, deadline: DateTime<Utc>) -> bool {
        !self.state.is_terminal() && self.updated_at < deadline
    }

    pub(crate) fn set_offer(
        &mut self,
        credential_definition_id: String,
        preview: CredentialPreview,
        nonce: String,
    ) {
        self.credential_definition_id = credential_definition_id;
        self.preview = preview;
        self.nonce = Some(nonce);
    }

    pub(crate) fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    pub(crate) fn set_nonce(&mut self, nonce: String) {
        self.nonce = Some(nonce);
    }

    pub(crate) fn set_link_secret_commitment(&mut self, commitment: String) {
        self.link_secret_commitment = Some(commitment);
    }

    pub(crate) fn set_credential_id(&mut self, credential_id: String) {
        self.credential_id = Some(credential_id);
    }

    pub(crate) fn set_error_message(&mut self, message: String) {
        self.error_message = Some(message);
    }

    pub fn get_id(&self) -> ExchangeID {
        self.id.to_owned()
    }

    pub fn get_connection_id(&self) -> ConnectionID {
        self.connection_id.to_owned()
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

    pub fn get_credential_definition_id(&self) -> String {
        self.credential_definition_id.to_owned()
    }

    pub fn get_preview(&self) -> &CredentialPreview {
        &self.preview
    }

    pub fn get_comment(&self) -> Option<String> {
        self.comment.to_owned()
    }

    pub fn get_nonce(&self) -> Option<String> {
        self.nonce.to_owned()
    }

    pub fn get_link_secret_commitment(&self) -> Option<String> {
        self.link_secret_commitment.to_owned()
    }

    pub fn get_credential_id(&self) -> Option<String> {
        self.credential_id.to_owned()
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

impl ToJSON for CredentialExchange {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for CredentialExchange {
    type Error = CredentialError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json =
            serde_json::to_vec(&self).map_err(|err| CredentialError::JSONError(err.to_string()))?;
        Ok(json)
    }
}

impl TryFrom<Vec<u8>> for CredentialExchange {
    type Error = CredentialError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let exchange: CredentialExchange = serde_json::from_slice(&value)
            .map_err(|err| CredentialError::JSONUnserializeError(err.to_string()))?;
        Ok(exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test::table_test;

    fn generate_exchange(state: State) -> CredentialExchange {
        let preview = CredentialPreview::from_record(vec![("Tier", "gold")]).unwrap();
        CredentialExchange::new(
            Role::Holder,
            state,
            ConnectionID::generate(),
            ThreadID::generate(),
            "creddef-1".to_string(),
            preview,
        )
    }

    #[test]
    fn test_forward_transitions() {
        let table = vec![
            ((State::OfferReceived, State::RequestSent), true),
            ((State::RequestSent, State::Done), true),
            ((State::OfferSent, State::RequestReceived), true),
            ((State::RequestSent, State::OfferReceived), false),
            ((State::RequestSent, State::RequestSent), false),
            ((State::OfferReceived, State::Abandoned), true),
            ((State::Done, State::Abandoned), false),
            ((State::Abandoned, State::Done), false),
        ];

        for (validator, (from, to), expected) in table_test!(table) {
            let mut exchange = generate_exchange(from);
            let actual = exchange.transition(to).is_ok();

            validator
                .given(&format!("{:?}", from))
                .when(&format!("transition to {:?}", to))
                .then(&format!("allowed: {}", expected))
                .assert_eq(expected, actual);
        }
    }

    #[test]
    fn test_transition_returns_previous() {
        let mut exchange = generate_exchange(State::OfferReceived);
        let previous = exchange.transition(State::RequestSent);
        assert_eq!(previous.unwrap(), State::OfferReceived);
        assert_eq!(exchange.get_state(), State::RequestSent);

        let invalid = exchange.transition(State::OfferReceived);
        assert!(matches!(
            invalid.unwrap_err(),
            CredentialError::InvalidState(_)
        ));
        assert_eq!(exchange.get_state(), State::RequestSent)
    }

    #[test]
    fn test_expect_role_and_state() {
        let exchange = generate_exchange(State::OfferReceived);
        assert!(!exchange.expect(Role::Holder, State::OfferReceived).is_err());
        assert!(exchange.expect(Role::Issuer, State::OfferReceived).is_err());
        assert!(exchange.expect(Role::Holder, State::RequestSent).is_err())
    }

    #[test]
    fn test_bytes_conversion() {
        let exchange = generate_exchange(State::OfferReceived);
        let bytes: Result<Vec<u8>, CredentialError> = exchange.clone().try_into();
        assert!(!bytes.is_err());

        let restored = CredentialExchange::try_from(bytes.unwrap());
        assert!(!restored.is_err());

        let restored_exchange = restored.unwrap();
        assert_eq!(restored_exchange.get_id(), exchange.get_id());
        assert_eq!(restored_exchange.get_preview(), exchange.get_preview())
    }
}
