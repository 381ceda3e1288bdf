//! `apps` provides the storage, transport, wallet and ledger adapters an agent runs against
mod store;
mod types;

pub mod db;

pub mod connection;
pub mod credential;
pub mod http;
pub mod ledger;
pub mod transport;
pub mod wallet;

pub use store::Store;

#[cfg(test)]
pub(crate) use store::testdb;
pub use db::{Builder as DbBuilder, Runner as DbRunner};
pub use types::AppError;

pub use connection::Repository as ConnectionRepository;
pub use credential::Repository as ExchangeRepository;
pub use ledger::MemoryLedger;
pub use http::HttpTransport;
pub use transport::{MemoryTransport, NodeTransport};
pub use wallet::KeyWallet;
