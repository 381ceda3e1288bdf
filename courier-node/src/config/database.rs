use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct RocksDBCommon {
    pub(super) path: String,
    pub(super) cf_name: String,
}

impl RocksDBCommon {
    pub fn new(path: String, cf_name: String) -> Self {
        Self { path, cf_name }
    }

    pub fn get(&self) -> (String, String) {
        (self.path.to_owned(), self.cf_name.to_owned())
    }
}

impl Default for RocksDBCommon {
    fn default() -> Self {
        Self {
            path: "./db".to_string(),
            cf_name: "".to_string(),
        }
    }
}

impl ToValidate for RocksDBCommon {
    fn validate(&self) -> Result<(), CommonError> {
        if self.path.is_empty() {
            return Err(CommonError::ValidationError(
                "config: rocksdbcommon:path is missing".to_string(),
            ));
        }

        if self.cf_name.is_empty() {
            return Err(CommonError::ValidationError(
                "config: rocksdbcommon:cf_name is missing".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(crate = "self::serde")]
pub struct RocksDBOptions {
    #[serde(default = "enabled")]
    pub(super) create_if_missing: bool,

    #[serde(default = "enabled")]
    pub(super) create_missing_columns: bool,

    #[serde(default)]
    pub(super) set_error_if_exists: bool,

    pub(super) set_wal_dir: String,
}

fn enabled() -> bool {
    true
}

impl RocksDBOptions {
    pub fn new(set_wal_dir: String) -> Self {
        Self {
            set_wal_dir,
            ..Self::default()
        }
    }

    pub fn get_create_if_missing(&self) -> bool {
        self.create_if_missing.to_owned()
    }

    pub fn get_create_missing_columns(&self) -> bool {
        self.create_missing_columns.to_owned()
    }

    pub fn get_set_error_if_exists(&self) -> bool {
        self.set_error_if_exists.to_owned()
    }

    pub fn get_set_wal_dir(&self) -> String {
        self.set_wal_dir.to_owned()
    }
}

impl Default for RocksDBOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            create_missing_columns: true,
            set_error_if_exists: false,
            set_wal_dir: "".to_string(),
        }
    }
}

impl ToValidate for RocksDBOptions {
    fn validate(&self) -> Result<(), CommonError> {
        if self.set_wal_dir.is_empty() {
            return Err(CommonError::ValidationError(
                "config: rocksdboptions:wal_dir is missing".to_string(),
            ));
        }

        Ok(())
    }
}

/// `Storage` is the rocksdb location of a single agent
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Storage {
    pub(super) common: RocksDBCommon,
    pub(super) db: RocksDBOptions,
}

impl Storage {
    pub fn new(common: RocksDBCommon, db: RocksDBOptions) -> Self {
        Self { common, db }
    }

    pub fn get_common(&self) -> RocksDBCommon {
        self.common.to_owned()
    }

    pub fn get_db_options(&self) -> RocksDBOptions {
        self.db.to_owned()
    }
}

impl ToValidate for Storage {
    fn validate(&self) -> Result<(), CommonError> {
        self.common.validate()?;
        self.db.validate()?;

        Ok(())
    }
}

/// `Database` keeps the records of each party in its own rocksdb instance
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Database {
    pub(super) holder: Storage,
    pub(super) issuer: Storage,
}

impl Database {
    pub fn holder(&self) -> &Storage {
        &self.holder
    }

    pub fn issuer(&self) -> &Storage {
        &self.issuer
    }
}

impl ToValidate for Database {
    fn validate(&self) -> Result<(), CommonError> {
        self.holder.validate()?;
        self.issuer.validate()?;

        if self.holder.common.path == self.issuer.common.path {
            return Err(CommonError::ValidationError(
                "config: database:holder and database:issuer must use different paths"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
