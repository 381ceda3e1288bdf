use rst_common::with_tokio::tokio::task::spawn_blocking;

use rstdev_storage::engine::rocksdb::db::DB;
use rstdev_storage::types::Storage;

use crate::apps::types::AppError;

use super::types::Instruction;

/// `Runner` executes storage instructions against a single column family
#[derive(Clone)]
pub struct Runner<TStorage>
where
    TStorage: Storage<Instance = DB>,
{
    instance: TStorage,
    cf_name: String,
}

impl<TStorage> Runner<TStorage>
where
    TStorage: Storage<Instance = DB>,
{
    pub fn new(instance: TStorage, cf_name: String) -> Self {
        Self { instance, cf_name }
    }

    pub fn get_cf_def(&self) -> String {
        self.cf_name.to_owned()
    }
}

impl Runner<DB> {
    pub async fn exec(&self, instruction: Instruction) -> Result<Option<Vec<u8>>, AppError> {
        let instance = self.instance.clone().get_instance();

        let db_instance = instance
            .db
            .clone()
            .ok_or(AppError::DbError("db instance is missing".to_string()))?;

        let cf_def = self.get_cf_def();

        match instruction {
            Instruction::SaveCf { key, value } => {
                spawn_blocking(move || {
                    let cf = db_instance
                        .cf_handle(cf_def.as_str())
                        .map(|val| val.to_owned())
                        .ok_or(AppError::DbError("cf handler failed".to_string()))?;

                    db_instance
                        .put_cf(cf, key, value)
                        .map_err(|err| AppError::DbError(err.to_string()))
                })
                .await
                .map_err(|err| AppError::DbError(err.to_string()))??;

                Ok(None)
            }
            Instruction::GetCf { key } => {
                let value = spawn_blocking(move || {
                    let cf = db_instance
                        .cf_handle(cf_def.as_str())
                        .map(|val| val.to_owned())
                        .ok_or(AppError::DbError("cf handler failed".to_string()))?;

                    db_instance
                        .get_cf(cf, key)
                        .map_err(|err| AppError::DbError(err.to_string()))
                })
                .await
                .map_err(|err| AppError::DbError(err.to_string()))??;

                Ok(value)
            }
            Instruction::RemoveCf { key } => {
                spawn_blocking(move || {
                    let cf = db_instance
                        .cf_handle(cf_def.as_str())
                        .map(|val| val.to_owned())
                        .ok_or(AppError::DbError("cf handler failed".to_string()))?;

                    db_instance
                        .delete_cf(cf, key)
                        .map_err(|err| AppError::DbError(err.to_string()))
                })
                .await
                .map_err(|err| AppError::DbError(err.to_string()))??;

                Ok(None)
            }
        }
    }
}
