use std::convert::TryInto;

use rst_common::standard::async_trait::async_trait;

use prople_courier_core::connection::{
    Connection, ConnectionError, ConnectionID, RepoBuilder, State,
};
use prople_courier_core::message::ThreadID;

use super::store::Store;

const CONNECTION_KEY_ID: &str = "connection_id";
const CONNECTION_KEY_THREAD: &str = "connection_thread";
const CONNECTION_KEY_PEER: &str = "connection_peer";
const CONNECTION_KEY_INDEX: &str = "connection_index";

/// `Repository` keeps connection records with a thread index, a peer key bucket
/// and a bucket of every known connection id
#[derive(Clone, Default)]
pub struct Repository {
    store: Store,
}

impl Repository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn get_id(&self, key: String) -> Result<Option<ConnectionID>, ConnectionError> {
        let id = self
            .store
            .get_string(&key)
            .await
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?;

        Ok(id.map(ConnectionID::from))
    }

    async fn collect(&self, bucket_key: &str) -> Result<Vec<Connection>, ConnectionError> {
        let ids = self
            .store
            .get_bucket(bucket_key)
            .await
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?;

        let mut connections = Vec::new();
        for id in ids {
            connections.push(self.get_connection(ConnectionID::from(id)).await?);
        }

        Ok(connections)
    }
}

#[async_trait]
impl RepoBuilder for Repository {
    async fn save(&self, connection: Connection) -> Result<(), ConnectionError> {
        let id = connection.get_id();
        let thread_key = Store::build_key(CONNECTION_KEY_THREAD, connection.get_thread_id().as_str());
        let peer_key = connection
            .get_peer_key()
            .map(|key| Store::build_key(CONNECTION_KEY_PEER, &key));

        let connection_bytes: Vec<u8> = connection.try_into()?;

        self.store
            .put(Store::build_key(CONNECTION_KEY_ID, id.as_str()), connection_bytes)
            .await
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?;

        self.store
            .put(thread_key, id.as_str().as_bytes().to_vec())
            .await
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?;

        if let Some(key) = peer_key {
            self.store
                .add_to_bucket(key, id.to_string())
                .await
                .map_err(|err| ConnectionError::RepoError(err.to_string()))?;
        }

        self.store
            .add_to_bucket(CONNECTION_KEY_INDEX.to_string(), id.to_string())
            .await
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?;

        Ok(())
    }

    async fn get_connection(&self, id: ConnectionID) -> Result<Connection, ConnectionError> {
        let connection_bytes = self
            .store
            .get(&Store::build_key(CONNECTION_KEY_ID, id.as_str()))
            .await
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?
            .ok_or_else(|| ConnectionError::ConnectionNotFound(id.to_string()))?;

        Connection::try_from(connection_bytes)
    }

    async fn find_by_thread(
        &self,
        thread_id: ThreadID,
    ) -> Result<Option<Connection>, ConnectionError> {
        let id = self
            .get_id(Store::build_key(CONNECTION_KEY_THREAD, thread_id.as_str()))
            .await?;

        match id {
            Some(connection_id) => self.get_connection(connection_id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_by_peer_key(&self, peer_key: String) -> Result<Vec<Connection>, ConnectionError> {
        self.collect(&Store::build_key(CONNECTION_KEY_PEER, &peer_key))
            .await
    }

    async fn list_connections(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError> {
        let connections = self.collect(CONNECTION_KEY_INDEX).await?;

        Ok(connections
            .into_iter()
            .filter(|connection| state.map_or(true, |expected| connection.get_state() == expected))
            .collect())
    }
}
