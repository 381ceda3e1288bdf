//! `agent` wires both protocol engines together behind a single identity and routes
//! inbound envelopes to them
mod agent;
mod locks;
mod types;

#[cfg(test)]
mod fakes;

pub use agent::Agent;
pub use locks::{ProcessedMessages, ThreadLocks};
pub use types::{AgentConfig, AgentError};
