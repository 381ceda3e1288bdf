//! `ledger` is the shared registry both parties trust: schemas and credential
//! definitions are written by issuers and resolved by holders before any
//! credential is requested or accepted
use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::with_errors::thiserror::{self, Error};

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("unknown error: {0}")]
    UnknownError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct SchemaConfig {
    pub name: String,
    pub version: String,
    pub attributes: Vec<String>,
}

impl SchemaConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.name.is_empty() || self.version.is_empty() {
            return Err(LedgerError::ValidationError(
                "schema name and version are required".to_string(),
            ));
        }

        if self.attributes.is_empty() {
            return Err(LedgerError::ValidationError(
                "schema must have at least one attribute".to_string(),
            ));
        }

        let mut names: Vec<&String> = self.attributes.iter().collect();
        names.sort();
        names.dedup();
        if names.len() != self.attributes.len() {
            return Err(LedgerError::ValidationError(
                "schema attributes must be unique".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Schema {
    pub id: String,
    pub issuer_did: String,
    pub name: String,
    pub version: String,
    pub attributes: Vec<String>,
}

impl ToJSON for Schema {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialDefinitionConfig {
    pub schema: Schema,
    pub tag: String,
    pub support_revocation: bool,
}

/// `CredentialDefinition` binds a schema to the issuer public key credentials
/// will be signed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialDefinition {
    pub id: String,
    pub schema_id: String,
    pub tag: String,
    pub issuer_did: String,
    pub public_key: String,
    pub support_revocation: bool,
}

impl ToJSON for CredentialDefinition {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

#[async_trait]
pub trait LedgerBuilder: Send + Sync {
    async fn register_schema(
        &self,
        issuer_did: String,
        config: SchemaConfig,
    ) -> Result<Schema, LedgerError>;

    async fn get_schema(&self, id: String) -> Result<Schema, LedgerError>;

    async fn register_credential_definition(
        &self,
        issuer_did: String,
        public_key: String,
        config: CredentialDefinitionConfig,
    ) -> Result<CredentialDefinition, LedgerError>;

    async fn resolve_credential_definition(
        &self,
        id: String,
    ) -> Result<CredentialDefinition, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_schema_config() {
        let config = SchemaConfig {
            name: "Gym membership".to_string(),
            version: "1.0.0".to_string(),
            attributes: vec!["Start date".to_string(), "Tier".to_string()],
        };
        assert!(!config.validate().is_err());

        let duplicated = SchemaConfig {
            attributes: vec!["Tier".to_string(), "Tier".to_string()],
            ..config.clone()
        };
        assert!(matches!(
            duplicated.validate().unwrap_err(),
            LedgerError::ValidationError(_)
        ));

        let empty = SchemaConfig {
            attributes: vec![],
            ..config
        };
        assert!(matches!(
            empty.validate().unwrap_err(),
            LedgerError::ValidationError(_)
        ));
    }
}
