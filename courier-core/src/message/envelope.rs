use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use super::payload::Message;
use super::types::{MessageError, MessageID, MessageKind, ThreadID};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Thread {
    thid: ThreadID,
}

/// `Envelope` is the unit exchanged between two agents
///
/// The wire format is a JSON object:
///
/// ```json
/// {
///     "@id": "<message id>",
///     "@type": "issue-credential/1.0/offer-credential",
///     "~thread": {"thid": "<thread id>"},
///     "senderKey": "<hex ed25519 public key>",
///     "body": { ... }
/// }
/// ```
///
/// The `@type` is kept as a raw string so an envelope carrying a type this agent does not
/// understand can still be decoded and rejected while routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Envelope {
    #[serde(rename = "@id")]
    id: MessageID,

    #[serde(rename = "@type")]
    message_type: String,

    #[serde(rename = "~thread")]
    thread: Thread,

    #[serde(rename = "senderKey")]
    sender_key: String,

    body: Value,
}

impl Envelope {
    pub fn pack(
        thread_id: ThreadID,
        sender_key: String,
        message: &Message,
    ) -> Result<Self, MessageError> {
        let body = message.to_body()?;

        Ok(Self {
            id: MessageID::generate(),
            message_type: message.kind().as_str().to_string(),
            thread: Thread { thid: thread_id },
            sender_key,
            body,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        serde_json::from_slice(bytes).map_err(|err| MessageError::DecodeError(err.to_string()))
    }

    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        serde_json::to_vec(self).map_err(|err| MessageError::EncodeError(err.to_string()))
    }

    pub fn kind(&self) -> Result<MessageKind, MessageError> {
        MessageKind::try_from(self.message_type.as_str())
    }

    pub fn message(&self) -> Result<Message, MessageError> {
        let kind = self.kind()?;
        Message::from_body(kind, self.body.clone())
    }

    pub fn get_id(&self) -> &MessageID {
        &self.id
    }

    pub fn get_type(&self) -> &str {
        self.message_type.as_str()
    }

    pub fn get_thread_id(&self) -> ThreadID {
        self.thread.thid.clone()
    }

    pub fn get_sender_key(&self) -> &str {
        self.sender_key.as_str()
    }

    pub fn get_body(&self) -> &Value {
        &self.body
    }
}

impl ToJSON for Envelope {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for Envelope {
    type Error = MessageError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        self.encode()
    }
}

impl TryFrom<Vec<u8>> for Envelope {
    type Error = MessageError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Envelope::decode(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ConnectionAck, ProblemReport};

    #[test]
    fn test_pack_and_decode() {
        let thread_id = ThreadID::generate();
        let report = ProblemReport::new("abandoned", "not interested".to_string());
        let envelope = Envelope::pack(
            thread_id.clone(),
            "sender".to_string(),
            &Message::ProblemReport(report.clone()),
        );
        assert!(!envelope.is_err());

        let bytes = envelope.unwrap().encode();
        assert!(!bytes.is_err());

        let decoded = Envelope::decode(&bytes.unwrap());
        assert!(!decoded.is_err());

        let decoded_envelope = decoded.unwrap();
        assert_eq!(decoded_envelope.get_thread_id(), thread_id);
        assert_eq!(decoded_envelope.get_sender_key(), "sender");
        assert_eq!(
            decoded_envelope.get_type(),
            "notification/1.0/problem-report"
        );
        assert_eq!(
            decoded_envelope.message().unwrap(),
            Message::ProblemReport(report)
        )
    }

    #[test]
    fn test_wire_field_names() {
        let envelope = Envelope::pack(
            ThreadID::from("thread-1".to_string()),
            "sender".to_string(),
            &Message::ConnectionAck(ConnectionAck::default()),
        )
        .unwrap();

        let json = envelope.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["@type"], "connections/1.0/ack");
        assert_eq!(value["~thread"]["thid"], "thread-1");
        assert_eq!(value["senderKey"], "sender");
        assert_eq!(value["body"]["status"], "OK");
        assert!(value["@id"].is_string())
    }

    #[test]
    fn test_decode_unknown_type() {
        let raw = r#"{
            "@id": "msg-1",
            "@type": "trust-ping/1.0/ping",
            "~thread": {"thid": "thread-1"},
            "senderKey": "sender",
            "body": {}
        }"#;

        let envelope = Envelope::decode(raw.as_bytes());
        assert!(!envelope.is_err());

        let message = envelope.unwrap().message();
        assert!(message.is_err());
        assert!(matches!(message.unwrap_err(), MessageError::UnknownType(_)))
    }

    #[test]
    fn test_decode_invalid_body() {
        let raw = r#"{
            "@id": "msg-1",
            "@type": "connections/1.0/request",
            "~thread": {"thid": "thread-1"},
            "senderKey": "sender",
            "body": {"label": "missing everything else"}
        }"#;

        let message = Envelope::decode(raw.as_bytes()).unwrap().message();
        assert!(message.is_err());
        assert!(matches!(message.unwrap_err(), MessageError::InvalidBody(_)))
    }

    #[test]
    fn test_decode_broken_bytes() {
        let envelope = Envelope::try_from(b"not a json".to_vec());
        assert!(envelope.is_err());
        assert!(matches!(envelope.unwrap_err(), MessageError::DecodeError(_)))
    }
}
