use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::info;
use rst_common::with_tokio::tokio::sync::RwLock;

use prople_courier_core::ledger::{
    CredentialDefinition, CredentialDefinitionConfig, LedgerBuilder, LedgerError, Schema,
    SchemaConfig,
};

#[derive(Default)]
struct Registry {
    schemas: HashMap<String, Schema>,
    definitions: HashMap<String, CredentialDefinition>,
}

/// `MemoryLedger` is a shared in-process registry. Every agent built against the same
/// instance sees the same schemas and credential definitions
#[derive(Clone, Default)]
pub struct MemoryLedger {
    registry: Arc<RwLock<Registry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_schema_id(issuer_did: &str, name: &str, version: &str) -> String {
        format!("{}:2:{}:{}", issuer_did, name, version)
    }

    pub fn build_definition_id(issuer_did: &str, schema_id: &str, tag: &str) -> String {
        format!("{}:3:CL:{}:{}", issuer_did, schema_id, tag)
    }
}

#[async_trait]
impl LedgerBuilder for MemoryLedger {
    async fn register_schema(
        &self,
        issuer_did: String,
        config: SchemaConfig,
    ) -> Result<Schema, LedgerError> {
        config.validate()?;

        let id = MemoryLedger::build_schema_id(&issuer_did, &config.name, &config.version);
        let mut registry = self.registry.write().await;
        if registry.schemas.contains_key(&id) {
            return Err(LedgerError::AlreadyExists(id));
        }

        let schema = Schema {
            id: id.clone(),
            issuer_did,
            name: config.name,
            version: config.version,
            attributes: config.attributes,
        };

        registry.schemas.insert(id.clone(), schema.clone());
        info!("[ledger:register_schema] schema registered: {}", id);

        Ok(schema)
    }

    async fn get_schema(&self, id: String) -> Result<Schema, LedgerError> {
        self.registry
            .read()
            .await
            .schemas
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
        if config.support_revocation {
            return Err(LedgerError::Unsupported(
                "credential revocation".to_string(),
            ));
        }

        if config.tag.is_empty() {
            return Err(LedgerError::ValidationError(
                "credential definition tag is required".to_string(),
            ));
        }

        let mut registry = self.registry.write().await;
        if !registry.schemas.contains_key(&config.schema.id) {
            return Err(LedgerError::NotFound(config.schema.id));
        }

        let id = MemoryLedger::build_definition_id(&issuer_did, &config.schema.id, &config.tag);
        if registry.definitions.contains_key(&id) {
            return Err(LedgerError::AlreadyExists(id));
        }

        let definition = CredentialDefinition {
            id: id.clone(),
            schema_id: config.schema.id,
            tag: config.tag,
            issuer_did,
            public_key,
            support_revocation: false,
        };

        registry.definitions.insert(id.clone(), definition.clone());
        info!(
            "[ledger:register_credential_definition] definition registered: {}",
            id
        );

        Ok(definition)
    }

    async fn resolve_credential_definition(
        &self,
        id: String,
    ) -> Result<CredentialDefinition, LedgerError> {
        self.registry
            .read()
            .await
            .definitions
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }
}
