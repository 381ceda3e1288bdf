use std::convert::TryInto;

use rst_common::standard::async_trait::async_trait;

use prople_courier_core::connection::ConnectionID;
use prople_courier_core::credential::{
    CredentialError, CredentialExchange, ExchangeID, RepoBuilder, State,
};
use prople_courier_core::message::ThreadID;

use super::store::Store;

const EXCHANGE_KEY_ID: &str = "exchange_id";
const EXCHANGE_KEY_THREAD: &str = "exchange_thread";
const EXCHANGE_KEY_CONNECTION: &str = "exchange_connection";
const EXCHANGE_KEY_INDEX: &str = "exchange_index";

#[derive(Clone, Default)]
pub struct Repository {
    store: Store,
}

impl Repository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn collect(&self, bucket_key: &str) -> Result<Vec<CredentialExchange>, CredentialError> {
        let ids = self
            .store
            .get_bucket(bucket_key)
            .await
            .map_err(|err| CredentialError::RepoError(err.to_string()))?;

        let mut exchanges = Vec::new();
        for id in ids {
            exchanges.push(self.get_exchange(ExchangeID::from(id)).await?);
        }

        Ok(exchanges)
    }
}

#[async_trait]
impl RepoBuilder for Repository {
    async fn save(&self, exchange: CredentialExchange) -> Result<(), CredentialError> {
        let id = exchange.get_id();
        let thread_key = Store::build_key(EXCHANGE_KEY_THREAD, exchange.get_thread_id().as_str());
        let connection_key = Store::build_key(
            EXCHANGE_KEY_CONNECTION,
            exchange.get_connection_id().as_str(),
        );

        let exchange_bytes: Vec<u8> = exchange.try_into()?;

        self.store
            .put(Store::build_key(EXCHANGE_KEY_ID, id.as_str()), exchange_bytes)
            .await
            .map_err(|err| CredentialError::RepoError(err.to_string()))?;

        self.store
            .put(thread_key, id.as_str().as_bytes().to_vec())
            .await
            .map_err(|err| CredentialError::RepoError(err.to_string()))?;

        self.store
            .add_to_bucket(connection_key, id.to_string())
            .await
            .map_err(|err| CredentialError::RepoError(err.to_string()))?;

        self.store
            .add_to_bucket(EXCHANGE_KEY_INDEX.to_string(), id.to_string())
            .await
            .map_err(|err| CredentialError::RepoError(err.to_string()))?;

        Ok(())
    }

    async fn get_exchange(&self, id: ExchangeID) -> Result<CredentialExchange, CredentialError> {
        let exchange_bytes = self
            .store
            .get(&Store::build_key(EXCHANGE_KEY_ID, id.as_str()))
            .await
            .map_err(|err| CredentialError::RepoError(err.to_string()))?
            .ok_or_else(|| CredentialError::ExchangeNotFound(id.to_string()))?;

        CredentialExchange::try_from(exchange_bytes)
    }

    async fn find_by_thread(
        &self,
        thread_id: ThreadID,
    ) -> Result<Option<CredentialExchange>, CredentialError> {
        let id = self
            .store
            .get_string(&Store::build_key(EXCHANGE_KEY_THREAD, thread_id.as_str()))
            .await
            .map_err(|err| CredentialError::RepoError(err.to_string()))?;

        match id {
            Some(exchange_id) => self
                .get_exchange(ExchangeID::from(exchange_id))
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    async fn list_exchanges(
        &self,
        state: Option<State>,
    ) -> Result<Vec<CredentialExchange>, CredentialError> {
        let exchanges = self.collect(EXCHANGE_KEY_INDEX).await?;

        Ok(exchanges
            .into_iter()
            .filter(|exchange| state.map_or(true, |expected| exchange.get_state() == expected))
            .collect())
    }

    async fn list_by_connection(
        &self,
        connection_id: ConnectionID,
    ) -> Result<Vec<CredentialExchange>, CredentialError> {
        self.collect(&Store::build_key(
            EXCHANGE_KEY_CONNECTION,
            connection_id.as_str(),
        ))
        .await
    }
}
