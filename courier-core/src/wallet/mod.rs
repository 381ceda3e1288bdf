//! `wallet` owns the agent key material. Connection responses, link secret commitments
//! and issued credentials are all produced and checked through it
use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use crate::credential::{CredentialPreview, IssuedCredential};
use crate::ledger::CredentialDefinition;

#[derive(Debug, PartialEq, Error, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum WalletError {
    #[error("signing error: {0}")]
    SigningError(String),

    #[error("verification error: {0}")]
    VerificationError(String),

    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

#[async_trait]
pub trait WalletBuilder: Send + Sync {
    /// `public_key` returns the hex encoded verification key of this wallet
    fn public_key(&self) -> String;

    async fn sign(&self, payload: Vec<u8>) -> Result<String, WalletError>;

    async fn verify(
        &self,
        public_key: String,
        payload: Vec<u8>,
        signature: String,
    ) -> Result<bool, WalletError>;

    /// `create_link_secret_commitment` binds the holder link secret to a single offer
    async fn create_link_secret_commitment(
        &self,
        definition: CredentialDefinition,
        nonce: String,
    ) -> Result<String, WalletError>;

    async fn issue_credential(
        &self,
        definition: CredentialDefinition,
        values: CredentialPreview,
        link_secret_commitment: String,
    ) -> Result<IssuedCredential, WalletError>;

    async fn verify_credential(
        &self,
        definition: CredentialDefinition,
        credential: IssuedCredential,
    ) -> Result<bool, WalletError>;

    async fn store_credential(&self, credential: IssuedCredential) -> Result<String, WalletError>;
}
