//! `prople-courier-core` is the protocol engine behind a `courier` agent.
//!
//! An agent runs two peer-to-peer protocols on behalf of a single identity:
//!
//! - `connection`, a three message handshake (`request`, `response`, `ack`) started
//!   from an out-of-band [`connection::Invitation`]
//! - `credential`, an issue-credential exchange (`propose`, `offer`, `request`, `issue`, `ack`)
//!   running over a completed connection
//!
//! Every protocol run is tracked as a persisted record moving forward through a finite
//! state machine. State changes are published through the [`events::EventBus`] so that
//! the application can react to them or decide the next step manually.
//!
//! This crate only defines the abstractions. Storage, transport, ledger and wallet are
//! provided through the `*Builder` traits and implemented by the node crate.
pub mod agent;
pub mod connection;
pub mod credential;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod message;
pub mod transport;
pub mod wallet;
