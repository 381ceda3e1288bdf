use rst_common::standard::serde::{self, Deserialize};

use prople_courier_core::credential::CredentialPreview;
use prople_courier_core::ledger::SchemaConfig;

use crate::common::types::{CommonError, ToValidate};

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// `Credential` describes the schema, the definition and the attribute values the
/// issuer offers during the scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Credential {
    #[serde(default)]
    pub(super) schema_name: String,

    #[serde(default)]
    pub(super) schema_version: String,

    #[serde(default)]
    pub(super) tag: String,

    #[serde(default)]
    pub(super) support_revocation: bool,

    #[serde(default = "default_timeout_secs")]
    pub(super) timeout_secs: u64,

    #[serde(default)]
    pub(super) attributes: Vec<Attribute>,
}

impl Credential {
    pub fn get_tag(&self) -> String {
        self.tag.to_owned()
    }

    pub fn get_support_revocation(&self) -> bool {
        self.support_revocation
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn get_attributes(&self) -> &Vec<Attribute> {
        &self.attributes
    }

    pub fn schema_config(&self) -> SchemaConfig {
        SchemaConfig {
            name: self.schema_name.to_owned(),
            version: self.schema_version.to_owned(),
            attributes: self
                .attributes
                .iter()
                .map(|attr| attr.name.to_owned())
                .collect(),
        }
    }

    pub fn preview(&self) -> Result<CredentialPreview, CommonError> {
        CredentialPreview::from_record(
            self.attributes
                .iter()
                .map(|attr| (attr.name.to_owned(), attr.value.to_owned())),
        )
        .map_err(|err| CommonError::ValidationError(format!("config: credential:{}", err)))
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self {
            schema_name: String::from(""),
            schema_version: String::from(""),
            tag: String::from(""),
            support_revocation: false,
            timeout_secs: default_timeout_secs(),
            attributes: Vec::new(),
        }
    }
}

impl ToValidate for Credential {
    fn validate(&self) -> Result<(), CommonError> {
        if self.schema_name.is_empty() {
            return Err(CommonError::ValidationError(
                "config: credential:schema_name is missing".to_string(),
            ));
        }

        if self.schema_version.is_empty() {
            return Err(CommonError::ValidationError(
                "config: credential:schema_version is missing".to_string(),
            ));
        }

        if self.tag.is_empty() {
            return Err(CommonError::ValidationError(
                "config: credential:tag is missing".to_string(),
            ));
        }

        if self.attributes.is_empty() {
            return Err(CommonError::ValidationError(
                "config: credential:attributes is missing".to_string(),
            ));
        }

        let _ = self.preview()?;
        Ok(())
    }
}
