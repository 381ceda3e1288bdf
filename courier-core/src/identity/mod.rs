//! `identity` holds who an agent is: a human readable label, a `DID` generated through
//! `prople-did-core` and the verification key (`verkey`) owned by the agent wallet
use prople_did_core::did::DID;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum IdentityError {
    #[error("generate error: {0}")]
    GenerateError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// A `verkey` is an ed25519 public key encoded as lowercase or uppercase hex
pub fn is_valid_verkey(key: &str) -> bool {
    key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Identity {
    label: String,
    did: String,
    verkey: String,
}

impl Identity {
    pub fn new(label: String, did: String, verkey: String) -> Result<Self, IdentityError> {
        if label.is_empty() {
            return Err(IdentityError::ValidationError(
                "label must not be empty".to_string(),
            ));
        }

        if did.is_empty() {
            return Err(IdentityError::ValidationError(
                "did must not be empty".to_string(),
            ));
        }

        if !is_valid_verkey(&verkey) {
            return Err(IdentityError::ValidationError(format!(
                "invalid verkey: {}",
                verkey
            )));
        }

        Ok(Self { label, did, verkey })
    }

    /// `generate` creates a fresh `DID` with its own key pair and attaches the wallet `verkey`
    /// next to it. The `DID` is not derived from the `verkey`, peers authenticate messages
    /// with the `verkey` alone
    pub fn generate(label: String, verkey: String) -> Result<Self, IdentityError> {
        let did = DID::new();
        let did_identity = did
            .identity()
            .map_err(|err| IdentityError::GenerateError(err.to_string()))?;

        Identity::new(label, did_identity.value(), verkey)
    }

    pub fn get_label(&self) -> String {
        self.label.to_owned()
    }

    pub fn get_did(&self) -> String {
        self.did.to_owned()
    }

    pub fn get_verkey(&self) -> String {
        self.verkey.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verkey() -> String {
        "ab".repeat(32)
    }

    #[test]
    fn test_generate_identity() {
        let identity = Identity::generate("holder".to_string(), verkey());
        assert!(!identity.is_err());

        let holder = identity.unwrap();
        assert_eq!(holder.get_label(), "holder".to_string());
        assert!(holder.get_did().starts_with("did:"));
        assert_eq!(holder.get_verkey(), verkey())
    }

    #[test]
    fn test_generate_did_independent_of_verkey() {
        let first = Identity::generate("holder".to_string(), verkey()).unwrap();
        let second = Identity::generate("holder".to_string(), verkey()).unwrap();
        assert_ne!(first.get_did(), second.get_did());
        assert_eq!(first.get_verkey(), second.get_verkey());
        assert!(!first.get_did().contains(&verkey()))
    }

    #[test]
    fn test_invalid_identity() {
        let empty_label = Identity::new(String::from(""), "did:prople:1".to_string(), verkey());
        assert!(matches!(
            empty_label.unwrap_err(),
            IdentityError::ValidationError(_)
        ));

        let invalid_key = Identity::new(
            "holder".to_string(),
            "did:prople:1".to_string(),
            "not-a-key".to_string(),
        );
        assert!(matches!(
            invalid_key.unwrap_err(),
            IdentityError::ValidationError(_)
        ));
    }

    #[test]
    fn test_verkey_format() {
        assert!(is_valid_verkey(&verkey()));
        assert!(!is_valid_verkey("ab"));
        assert!(!is_valid_verkey(&"zz".repeat(32)))
    }
}
