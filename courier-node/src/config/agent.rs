use std::time::Duration;

use multiaddr::Multiaddr;

use rst_common::standard::serde::{self, Deserialize};

use prople_courier_core::agent::AgentConfig;
use prople_courier_core::credential::AutoAccept;

use crate::common::types::{CommonError, ToValidate};

fn default_auto_accept_connections() -> bool {
    true
}

/// `Agent` is one `[holder]` or `[issuer]` section
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Agent {
    #[serde(default)]
    pub(super) label: String,

    #[serde(default)]
    pub(super) endpoint: String,

    #[serde(default = "default_auto_accept_connections")]
    pub(super) auto_accept_connections: bool,

    #[serde(default)]
    pub(super) auto_accept_credentials: AutoAccept,

    pub(super) credential_expiry_secs: Option<u64>,
}

impl Agent {
    pub fn get_label(&self) -> String {
        self.label.to_owned()
    }

    pub fn get_endpoint(&self) -> Result<Multiaddr, CommonError> {
        self.endpoint
            .parse()
            .map_err(|err| CommonError::ValidationError(format!("config: agent:endpoint {}", err)))
    }

    pub fn get_auto_accept_connections(&self) -> bool {
        self.auto_accept_connections
    }

    pub fn get_auto_accept_credentials(&self) -> AutoAccept {
        self.auto_accept_credentials
    }

    pub fn get_credential_expiry(&self) -> Option<Duration> {
        self.credential_expiry_secs.map(Duration::from_secs)
    }

    /// `to_agent_config` builds the runtime options of this agent section
    pub fn to_agent_config(&self) -> Result<AgentConfig, CommonError> {
        let mut config = AgentConfig::new(self.get_label(), self.get_endpoint()?)
            .with_auto_accept_connections(self.auto_accept_connections)
            .with_credential_policy(self.auto_accept_credentials.into());

        if let Some(expiry) = self.get_credential_expiry() {
            config = config.with_credential_expiry(expiry);
        }

        Ok(config)
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            label: String::from(""),
            endpoint: String::from(""),
            auto_accept_connections: default_auto_accept_connections(),
            auto_accept_credentials: AutoAccept::default(),
            credential_expiry_secs: None,
        }
    }
}

impl ToValidate for Agent {
    fn validate(&self) -> Result<(), CommonError> {
        if self.label.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:label is missing".to_string(),
            ));
        }

        if self.endpoint.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:endpoint is missing".to_string(),
            ));
        }

        let _ = self.get_endpoint()?;

        if self.credential_expiry_secs == Some(0) {
            return Err(CommonError::ValidationError(
                "config: agent:credential_expiry_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
