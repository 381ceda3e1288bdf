use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use super::preview::CredentialPreview;
use super::types::CredentialError;

#[derive(Serialize)]
#[serde(crate = "self::serde")]
struct SigningPayload<'a> {
    schema_id: &'a str,
    credential_definition_id: &'a str,
    values: &'a CredentialPreview,
    link_secret_commitment: &'a str,
}

/// `IssuedCredential` is the credential an issuer signs for a holder. The signature
/// covers the schema, the credential definition, the attribute values and the holder
/// link secret commitment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct IssuedCredential {
    id: String,
    schema_id: String,
    credential_definition_id: String,
    values: CredentialPreview,
    link_secret_commitment: String,
    signature: String,

    #[serde(with = "ts_seconds")]
    issued_at: DateTime<Utc>,
}

impl IssuedCredential {
    pub fn new(
        schema_id: String,
        credential_definition_id: String,
        values: CredentialPreview,
        link_secret_commitment: String,
        signature: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            schema_id,
            credential_definition_id,
            values,
            link_secret_commitment,
            signature,
            issued_at: Utc::now(),
        }
    }

    /// `build_signing_payload` returns the bytes an issuer signs before the credential exists
    pub fn build_signing_payload(
        schema_id: &str,
        credential_definition_id: &str,
        values: &CredentialPreview,
        link_secret_commitment: &str,
    ) -> Result<Vec<u8>, CredentialError> {
        let payload = SigningPayload {
            schema_id,
            credential_definition_id,
            values,
            link_secret_commitment,
        };

        serde_json::to_vec(&payload).map_err(|err| CredentialError::JSONError(err.to_string()))
    }

    pub fn signing_payload(&self) -> Result<Vec<u8>, CredentialError> {
        IssuedCredential::build_signing_payload(
            &self.schema_id,
            &self.credential_definition_id,
            &self.values,
            &self.link_secret_commitment,
        )
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_schema_id(&self) -> String {
        self.schema_id.to_owned()
    }

    pub fn get_credential_definition_id(&self) -> String {
        self.credential_definition_id.to_owned()
    }

    pub fn get_values(&self) -> &CredentialPreview {
        &self.values
    }

    pub fn get_link_secret_commitment(&self) -> String {
        self.link_secret_commitment.to_owned()
    }

    pub fn get_signature(&self) -> String {
        self.signature.to_owned()
    }

    pub fn get_issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl ToJSON for IssuedCredential {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}
