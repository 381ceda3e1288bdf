use std::collections::HashMap;
use std::sync::Arc;

use rst_common::with_tokio::tokio::sync::{Mutex, RwLock};

use rstdev_storage::engine::rocksdb::db::DB;

use super::db::{Bucket, Instruction, Runner};
use super::types::AppError;

#[derive(Clone)]
enum Backend {
    Memory(Arc<RwLock<HashMap<String, Vec<u8>>>>),
    RocksDB(Runner<DB>),
}

/// `Store` is the key value space shared by the repositories of one agent.
/// Values are the byte encoding of the stored entities, keys are prefixed per index
/// and list lookups go through JSON buckets of member ids.
#[derive(Clone)]
pub struct Store {
    backend: Backend,
    buckets: Arc<Mutex<()>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// `new` keeps every record in process memory
    pub fn new() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(HashMap::new()))),
            buckets: Arc::new(Mutex::new(())),
        }
    }

    /// `from_runner` persists every record into the rocksdb column family of `runner`
    pub fn from_runner(runner: Runner<DB>) -> Self {
        Self {
            backend: Backend::RocksDB(runner),
            buckets: Arc::new(Mutex::new(())),
        }
    }

    pub fn build_key(prefix: &str, value: &str) -> String {
        format!("{}:{}", prefix, value)
    }

    pub async fn put(&self, key: String, value: Vec<u8>) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(items) => {
                items.write().await.insert(key, value);
                Ok(())
            }
            Backend::RocksDB(runner) => runner
                .exec(Instruction::SaveCf { key, value })
                .await
                .map(|_| ()),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        match &self.backend {
            Backend::Memory(items) => Ok(items.read().await.get(key).cloned()),
            Backend::RocksDB(runner) => {
                runner
                    .exec(Instruction::GetCf {
                        key: key.to_string(),
                    })
                    .await
            }
        }
    }

    pub async fn get_string(&self, key: &str) -> Result<Option<String>, AppError> {
        match self.get(key).await? {
            Some(value) => {
                let str_value =
                    String::from_utf8(value).map_err(|err| AppError::StoreError(err.to_string()))?;
                Ok(Some(str_value))
            }
            None => Ok(None),
        }
    }

    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(items) => {
                items.write().await.remove(key);
                Ok(())
            }
            Backend::RocksDB(runner) => runner
                .exec(Instruction::RemoveCf {
                    key: key.to_string(),
                })
                .await
                .map(|_| ()),
        }
    }

    /// `add_to_bucket` appends `member` to the bucket under `key` unless it is already there
    pub async fn add_to_bucket(&self, key: String, member: String) -> Result<(), AppError> {
        let _guard = self.buckets.lock().await;

        let mut bucket: Bucket<String> = match self.get(&key).await? {
            Some(bytes) => Bucket::try_from(bytes)?,
            None => Bucket::new(),
        };

        if bucket.contains(&member) {
            return Ok(());
        }

        bucket.add(member);
        let bucket_bytes: Vec<u8> = bucket.try_into()?;
        self.put(key, bucket_bytes).await
    }

    /// `get_bucket` returns the members under `key` in insertion order
    pub async fn get_bucket(&self, key: &str) -> Result<Vec<String>, AppError> {
        match self.get(key).await? {
            Some(bytes) => {
                let bucket: Bucket<String> = Bucket::try_from(bytes)?;
                Ok(bucket.get_collections())
            }
            None => Ok(Vec::new()),
        }
    }
}
