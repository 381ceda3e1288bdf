use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use multiaddr::Multiaddr;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::connection::{
    Connection, ConnectionError, ConnectionID, RepoBuilder as ConnectionRepoBuilder,
    State as ConnectionState,
};
use crate::credential::{
    CredentialError, CredentialExchange, CredentialPreview, ExchangeID, IssuedCredential,
    RepoBuilder as CredentialRepoBuilder, State as ExchangeState,
};
use crate::ledger::{
    CredentialDefinition, CredentialDefinitionConfig, LedgerBuilder, LedgerError, Schema,
    SchemaConfig,
};
use crate::message::{Envelope, ThreadID};
use crate::transport::{TransportBuilder, TransportError};
use crate::wallet::{WalletBuilder, WalletError};

use super::agent::Agent;

pub type FakeAgent = Agent<FakeConnections, FakeExchanges, FakeTransport, FakeWallet, FakeLedger>;

#[derive(Clone, Default)]
pub struct FakeConnections {
    items: Arc<Mutex<HashMap<String, Connection>>>,
}

#[async_trait]
impl ConnectionRepoBuilder for FakeConnections {
    async fn save(&self, connection: Connection) -> Result<(), ConnectionError> {
        self.items
            .lock()
            .unwrap()
            .insert(connection.get_id().to_string(), connection);
        Ok(())
    }

    async fn get_connection(&self, id: ConnectionID) -> Result<Connection, ConnectionError> {
        self.items
            .lock()
            .unwrap()
            .get(&id.to_string())
            .cloned()
            .ok_or_else(|| ConnectionError::ConnectionNotFound(id.to_string()))
    }

    async fn find_by_thread(
        &self,
        thread_id: ThreadID,
    ) -> Result<Option<Connection>, ConnectionError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .find(|connection| connection.get_thread_id() == thread_id)
            .cloned())
    }

    async fn find_by_peer_key(&self, peer_key: String) -> Result<Vec<Connection>, ConnectionError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .filter(|connection| connection.get_peer_key() == Some(peer_key.clone()))
            .cloned()
            .collect())
    }

    async fn list_connections(
        &self,
        state: Option<ConnectionState>,
    ) -> Result<Vec<Connection>, ConnectionError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .filter(|connection| state.map_or(true, |expected| connection.get_state() == expected))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct FakeExchanges {
    items: Arc<Mutex<HashMap<String, CredentialExchange>>>,
}

#[async_trait]
impl CredentialRepoBuilder for FakeExchanges {
    async fn save(&self, exchange: CredentialExchange) -> Result<(), CredentialError> {
        self.items
            .lock()
            .unwrap()
            .insert(exchange.get_id().to_string(), exchange);
        Ok(())
    }

    async fn get_exchange(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError> {
        self.items
            .lock()
            .unwrap()
            .get(&id.to_string())
            .cloned()
            .ok_or_else(|| CredentialError::ExchangeNotFound(id.to_string()))
    }

    async fn find_by_thread(
        &self,
        thread_id: ThreadID,
    ) -> Result<Option<CredentialExchange>, CredentialError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .find(|exchange| exchange.get_thread_id() == thread_id)
            .cloned())
    }

    async fn list_exchanges(
        &self,
        state: Option<ExchangeState>,
    ) -> Result<Vec<CredentialExchange>, CredentialError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .filter(|exchange| state.map_or(true, |expected| exchange.get_state() == expected))
            .cloned()
            .collect())
    }

    async fn list_by_connection(
        &self,
        connection_id: ConnectionID,
    ) -> Result<Vec<CredentialExchange>, CredentialError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .filter(|exchange| exchange.get_connection_id() == connection_id)
            .cloned()
            .collect())
    }
}

/// Routes envelopes to the channel registered for an endpoint without any I/O
#[derive(Clone, Default)]
pub struct FakeTransport {
    routes: Arc<Mutex<HashMap<Multiaddr, UnboundedSender<Envelope>>>>,
}

impl FakeTransport {
    pub fn register(&self, endpoint: Multiaddr) -> UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.lock().unwrap().insert(endpoint, tx);
        rx
    }
}

#[async_trait]
impl TransportBuilder for FakeTransport {
    async fn send(&self, endpoint: Multiaddr, envelope: Envelope) -> Result<(), TransportError> {
        let sender = self
            .routes
            .lock()
            .unwrap()
            .get(&endpoint)
            .cloned()
            .ok_or_else(|| TransportError::UnknownEndpoint(endpoint.to_string()))?;

        sender
            .send(envelope)
            .map_err(|err| TransportError::SendError(err.to_string()))
    }
}

/// A keyed hash stands in for real signatures, good enough to tell keys apart
#[derive(Clone)]
pub struct FakeWallet {
    key: String,
}

impl FakeWallet {
    pub fn new(key: String) -> Self {
        Self { key }
    }

    fn digest(key: &str, payload: &[u8]) -> String {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        payload.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

#[async_trait]
impl WalletBuilder for FakeWallet {
    fn public_key(&self) -> String {
        self.key.clone()
    }

    async fn sign(&self, payload: Vec<u8>) -> Result<String, WalletError> {
        Ok(FakeWallet::digest(&self.key, &payload))
    }

    async fn verify(
        &self,
        public_key: String,
        payload: Vec<u8>,
        signature: String,
    ) -> Result<bool, WalletError> {
        Ok(FakeWallet::digest(&public_key, &payload) == signature)
    }

    async fn create_link_secret_commitment(
        &self,
        definition: CredentialDefinition,
        nonce: String,
    ) -> Result<String, WalletError> {
        Ok(FakeWallet::digest(
            &self.key,
            format!("{}:{}", definition.id, nonce).as_bytes(),
        ))
    }

    async fn issue_credential(
        &self,
        definition: CredentialDefinition,
        values: CredentialPreview,
        link_secret_commitment: String,
    ) -> Result<IssuedCredential, WalletError> {
        let payload = IssuedCredential::build_signing_payload(
            &definition.schema_id,
            &definition.id,
            &values,
            &link_secret_commitment,
        )
        .map_err(|err| WalletError::SigningError(err.to_string()))?;

        let signature = self.sign(payload).await?;
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
        let payload = credential
            .signing_payload()
            .map_err(|err| WalletError::VerificationError(err.to_string()))?;

        self.verify(definition.public_key, payload, credential.get_signature())
            .await
    }

    async fn store_credential(&self, credential: IssuedCredential) -> Result<String, WalletError> {
        Ok(credential.get_id())
    }
}

#[derive(Clone, Default)]
pub struct FakeLedger {
    schemas: Arc<Mutex<HashMap<String, Schema>>>,
    definitions: Arc<Mutex<HashMap<String, CredentialDefinition>>>,
}

#[async_trait]
impl LedgerBuilder for FakeLedger {
    async fn register_schema(
        &self,
        issuer_did: String,
        config: SchemaConfig,
    ) -> Result<Schema, LedgerError> {
        let schema = Schema {
            id: format!("{}:2:{}:{}", issuer_did, config.name, config.version),
            issuer_did,
            name: config.name,
            version: config.version,
            attributes: config.attributes,
        };

        self.schemas
            .lock()
            .unwrap()
            .insert(schema.id.clone(), schema.clone());
        Ok(schema)
    }

    async fn get_schema(&self, id: String) -> Result<Schema, LedgerError> {
        self.schemas
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }

    async fn register_credential_definition(
        &self,
        issuer_did: String,
        public_key: String,
        config: CredentialDefinitionConfig,
    ) -> Result<CredentialDefinition, LedgerError> {
        let definition = CredentialDefinition {
            id: format!("{}:3:CL:{}:{}", issuer_did, config.schema.id, config.tag),
            schema_id: config.schema.id,
            tag: config.tag,
            issuer_did,
            public_key,
            support_revocation: config.support_revocation,
        };

        self.definitions
            .lock()
            .unwrap()
            .insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    async fn resolve_credential_definition(
        &self,
        id: String,
    ) -> Result<CredentialDefinition, LedgerError> {
        self.definitions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }
}
