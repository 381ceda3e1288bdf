//! `connection` implements the handshake two agents run before exchanging credentials
//!
//! The inviter shares an [`Invitation`] out of band, the invitee answers with a request,
//! the inviter responds with a signed copy of its own endpoint and keys, and the invitee
//! closes the handshake with an ack once the signature matched the invitation key
mod connection;
mod invitation;
mod types;
mod usecase;

pub use connection::Connection;
pub use invitation::Invitation;
pub use types::{ConnectionError, ConnectionID, RepoBuilder, Role, State, UsecaseBuilder};
pub use usecase::{Usecase, PROBLEM_CONNECTION_ABANDONED};
