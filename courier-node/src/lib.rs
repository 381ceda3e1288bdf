//! `prople-courier-node` runs courier agents: adapters for every collaborator trait of
//! `prople-courier-core` (rocksdb or in-memory records, HTTP or in-process transport),
//! TOML configuration and the two party demo scenario
pub mod apps;
pub mod builder;
pub mod common;
pub mod config;
pub mod demo;

pub use builder::{AgentBuilder, Node, NodeAgent};
pub use config::{Config, Parser as ConfigManager, TransportKind};
pub use demo::DemoOutcome;
