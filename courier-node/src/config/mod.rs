mod agent;
pub use agent::Agent;

mod credential;
pub use credential::{Attribute, Credential};

mod database;
pub use database::{Database, RocksDBCommon, RocksDBOptions, Storage};

mod config;
pub use config::{Config, TransportKind};

mod parser;
pub use parser::Parser;
