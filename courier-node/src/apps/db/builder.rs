use rstdev_storage::engine::rocksdb::db::DB;
use rstdev_storage::engine::rocksdb::options::Options;

use rst_common::with_logging::log::info;

use crate::common::types::CommonError;
use crate::config::{Database, Storage};

use super::Runner;

/// `Builder` opens the rocksdb instance of one party out of the `[database]` section
pub struct Builder {
    cfg: Database,
}

impl Builder {
    pub fn new(cfg: Database) -> Self {
        Self { cfg }
    }

    pub fn build(
        &mut self,
        db_callback: impl FnOnce(&Database) -> Storage,
    ) -> Result<Runner<DB>, CommonError> {
        let storage = db_callback(&self.cfg);
        let (opts_path, opts_cf_name) = storage.get_common().get();

        let opts_db_main = storage.get_db_options();

        info!("[db:build] opening {} with cf {}", opts_path, opts_cf_name);

        let mut db_opts = Options::new(opts_path, opts_cf_name.clone());
        db_opts.build_default_opts().set_db_opts(move |opt| {
            opt.create_if_missing(opts_db_main.get_create_if_missing());
            opt.create_missing_column_families(opts_db_main.get_create_missing_columns());
            opt.set_error_if_exists(opts_db_main.get_set_error_if_exists());
            opt.set_wal_dir(opts_db_main.get_set_wal_dir());

            opt
        });

        let mut db = DB::new(db_opts).map_err(|err| CommonError::DbError(err.to_string()))?;
        let _ = db
            .build()
            .map_err(|err| CommonError::DbError(err.to_string()))?;

        Ok(Runner::new(db, opts_cf_name))
    }
}
