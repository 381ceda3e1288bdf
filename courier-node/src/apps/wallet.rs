use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::sync::RwLock;

use prople_courier_core::credential::{CredentialPreview, IssuedCredential};
use prople_courier_core::ledger::CredentialDefinition;
use prople_courier_core::wallet::{WalletBuilder, WalletError};

/// `KeyWallet` keeps an Ed25519 signing key, the holder link secret and the credentials
/// this agent has accepted
#[derive(Clone)]
pub struct KeyWallet {
    signing_key: SigningKey,
    link_secret: Vec<u8>,
    credentials: Arc<RwLock<HashMap<String, IssuedCredential>>>,
}

impl KeyWallet {
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);

        let mut link_secret = vec![0u8; 32];
        csprng.fill_bytes(&mut link_secret);

        Self {
            signing_key,
            link_secret,
            credentials: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get_credential(&self, id: &str) -> Option<IssuedCredential> {
        self.credentials.read().await.get(id).cloned()
    }

    pub async fn list_credentials(&self) -> Vec<IssuedCredential> {
        self.credentials.read().await.values().cloned().collect()
    }

    fn parse_public_key(public_key: &str) -> Result<VerifyingKey, WalletError> {
        let key_bytes = hex::decode(public_key)
            .map_err(|err| WalletError::VerificationError(err.to_string()))?;

        let key_array: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| WalletError::VerificationError("invalid public key length".to_string()))?;

        VerifyingKey::from_bytes(&key_array)
            .map_err(|err| WalletError::VerificationError(err.to_string()))
    }
}

#[async_trait]
impl WalletBuilder for KeyWallet {
    fn public_key(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    async fn sign(&self, payload: Vec<u8>) -> Result<String, WalletError> {
        let signature = self
            .signing_key
            .try_sign(&payload)
            .map_err(|err| WalletError::SigningError(err.to_string()))?;

        Ok(hex::encode(signature.to_bytes()))
    }

    async fn verify(
        &self,
        public_key: String,
        payload: Vec<u8>,
        signature: String,
    ) -> Result<bool, WalletError> {
        let verifying_key = KeyWallet::parse_public_key(&public_key)?;

        let signature_bytes = hex::decode(signature)
            .map_err(|err| WalletError::VerificationError(err.to_string()))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|err| WalletError::VerificationError(err.to_string()))?;

        Ok(verifying_key.verify(&payload, &signature).is_ok())
    }

    async fn create_link_secret_commitment(
        &self,
        definition: CredentialDefinition,
        nonce: String,
    ) -> Result<String, WalletError> {
        let mut hasher = Sha256::new();
        hasher.update(&self.link_secret);
        hasher.update(definition.id.as_bytes());
        hasher.update(nonce.as_bytes());

        Ok(hex::encode(hasher.finalize()))
    }

    async fn issue_credential(
        &self,
        definition: CredentialDefinition,
        values: CredentialPreview,
        link_secret_commitment: String,
    ) -> Result<IssuedCredential, WalletError> {
        if definition.public_key != self.public_key() {
            return Err(WalletError::KeyMismatch(definition.id));
        }

        let payload = IssuedCredential::build_signing_payload(
            &definition.schema_id,
            &definition.id,
            &values,
            &link_secret_commitment,
        )
        .map_err(|err| WalletError::SigningError(err.to_string()))?;

        let signature = self.sign(payload).await?;
        debug!(
            "[wallet:issue_credential] credential signed for definition: {}",
            definition.id
        );

        Ok(IssuedCredential::new(
            definition.schema_id,
            definition.id,
            values,
            link_secret_commitment,
            signature,
        ))
    }

    async fn verify_credential(
        &self,
        definition: CredentialDefinition,
        credential: IssuedCredential,
    ) -> Result<bool, WalletError> {
        if credential.get_credential_definition_id() != definition.id {
            return Ok(false);
        }

        let payload = credential
            .signing_payload()
            .map_err(|err| WalletError::VerificationError(err.to_string()))?;

        self.verify(definition.public_key, payload, credential.get_signature())
            .await
    }

    async fn store_credential(&self, credential: IssuedCredential) -> Result<String, WalletError> {
        let id = credential.get_id();
        self.credentials
            .write()
            .await
            .entry(id.clone())
            .or_insert(credential);

        Ok(id)
    }
}
