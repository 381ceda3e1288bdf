use std::time::Duration;

use multiaddr::Multiaddr;

use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::ConnectionError;
use crate::credential::{AutoAcceptPolicy, CredentialError};
use crate::identity::IdentityError;
use crate::ledger::LedgerError;

#[derive(Debug, PartialEq, Error, Clone)]
pub enum AgentError {
    #[error("unroutable message: {0}")]
    UnroutableMessage(String),

    #[error("message error: {0}")]
    MessageError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    ConnectionError(#[from] ConnectionError),

    #[error(transparent)]
    CredentialError(#[from] CredentialError),

    #[error(transparent)]
    LedgerError(#[from] LedgerError),

    #[error(transparent)]
    IdentityError(#[from] IdentityError),
}

/// `AgentConfig` holds the per agent options
///
/// Connections are accepted automatically unless told otherwise, credentials are never
/// accepted automatically unless a [`AutoAcceptPolicy`] says so
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub label: String,
    pub endpoint: Multiaddr,
    pub auto_accept_connections: bool,
    pub credential_policy: AutoAcceptPolicy,
    pub credential_expiry: Option<Duration>,
}

impl AgentConfig {
    pub fn new(label: String, endpoint: Multiaddr) -> Self {
        Self {
            label,
            endpoint,
            auto_accept_connections: true,
            credential_policy: AutoAcceptPolicy::default(),
            credential_expiry: None,
        }
    }

    pub fn with_auto_accept_connections(mut self, enabled: bool) -> Self {
        self.auto_accept_connections = enabled;
        self
    }

    pub fn with_credential_policy(mut self, policy: AutoAcceptPolicy) -> Self {
        self.credential_policy = policy;
        self
    }

    pub fn with_credential_expiry(mut self, expiry: Duration) -> Self {
        self.credential_expiry = Some(expiry);
        self
    }
}
