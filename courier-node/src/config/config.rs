use std::str::FromStr;

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

use super::{Agent, Credential, Database};

/// `TransportKind` picks how envelopes travel between the two parties
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(crate = "self::serde", rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Memory,
    Http,
}

impl FromStr for TransportKind {
    type Err = CommonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "memory" => Ok(TransportKind::Memory),
            "http" => Ok(TransportKind::Http),
            _ => Err(CommonError::ConfigError(format!(
                "unknown transport: {}",
                value
            ))),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Config {
    #[serde(default)]
    pub(super) holder: Agent,

    #[serde(default)]
    pub(super) issuer: Agent,

    #[serde(default)]
    pub(super) credential: Credential,

    #[serde(default)]
    pub(super) transport: TransportKind,

    pub(super) database: Option<Database>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder(&self) -> &Agent {
        &self.holder
    }

    pub fn issuer(&self) -> &Agent {
        &self.issuer
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn set_transport(&mut self, transport: TransportKind) {
        self.transport = transport
    }

    pub fn database(&self) -> Option<&Database> {
        self.database.as_ref()
    }

    pub fn set_database(&mut self, database: Database) {
        self.database = Some(database)
    }
}

impl ToValidate for Config {
    fn validate(&self) -> Result<(), CommonError> {
        self.holder.validate()?;
        self.issuer.validate()?;
        self.credential.validate()?;

        if let Some(database) = &self.database {
            database.validate()?;
        }

        if self.holder.endpoint == self.issuer.endpoint {
            return Err(CommonError::ValidationError(
                "config: holder and issuer must use different endpoints".to_string(),
            ));
        }

        Ok(())
    }
}
