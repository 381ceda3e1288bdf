//! `events` publishes every committed state change of connection and
//! credential exchange records
mod bus;
mod types;

pub use bus::EventBus;
pub use types::{
    ConnectionStateChanged, CredentialStateChanged, Event, EventError, EventHandler, EventType,
};
