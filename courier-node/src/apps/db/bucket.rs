use rst_common::standard::serde::de::DeserializeOwned;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use crate::apps::types::AppError;

/// `Bucket` is a JSON encoded list stored under a single key, used for the
/// secondary indexes a key value store cannot answer by itself
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(crate = "self::serde")]
pub struct Bucket<T>
where
    T: Serialize,
{
    collections: Vec<T>,
}

impl<T> Bucket<T>
where
    T: Serialize + DeserializeOwned + PartialEq,
{
    pub fn new() -> Self {
        Self {
            collections: Vec::new(),
        }
    }

    pub fn add(&mut self, val: T) {
        self.collections.push(val)
    }

    pub fn contains(&self, val: &T) -> bool {
        self.collections.contains(val)
    }

    pub fn get_collections(self) -> Vec<T> {
        self.collections
    }
}

impl<T> TryInto<Vec<u8>> for Bucket<T>
where
    T: Serialize,
{
    type Error = AppError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json =
            serde_json::to_vec(&self).map_err(|err| AppError::BucketError(err.to_string()))?;

        Ok(json)
    }
}

impl<T> TryFrom<Vec<u8>> for Bucket<T>
where
    T: Serialize + DeserializeOwned,
{
    type Error = AppError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let bucket: Self =
            serde_json::from_slice(&value).map_err(|err| AppError::BucketError(err.to_string()))?;
        Ok(bucket)
    }
}
