use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use crate::ledger::Schema;

use super::types::CredentialError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PreviewAttribute {
    pub name: String,
    pub value: String,
}

/// `CredentialPreview` is the ordered list of attribute values an issuer offers
///
/// Attribute names are unique. The order is the insertion order and it is part of the
/// serialized content, which matters because offers and requests are compared
/// byte-for-byte
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialPreview {
    attributes: Vec<PreviewAttribute>,
}

impl CredentialPreview {
    pub fn new() -> Self {
        Self::default()
    }

    /// `from_record` builds a preview from `(name, value)` pairs, keeping their order
    pub fn from_record<I, K, V>(record: I) -> Result<Self, CredentialError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut preview = Self::new();
        for (name, value) in record {
            preview.add_attribute(name.into(), value.into())?;
        }

        Ok(preview)
    }

    pub fn add_attribute(&mut self, name: String, value: String) -> Result<(), CredentialError> {
        if name.is_empty() {
            return Err(CredentialError::ValidationError(
                "attribute name must not be empty".to_string(),
            ));
        }

        if self.get(&name).is_some() {
            return Err(CredentialError::ValidationError(format!(
                "duplicate attribute: {}",
                name
            )));
        }

        self.attributes.push(PreviewAttribute { name, value });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn get_attributes(&self) -> &Vec<PreviewAttribute> {
        &self.attributes
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|attr| attr.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// `validate` checks a preview coming from the wire, which bypassed [`CredentialPreview::add_attribute`]
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.attributes.is_empty() {
            return Err(CredentialError::ValidationError(
                "preview must have at least one attribute".to_string(),
            ));
        }

        let mut checked = CredentialPreview::new();
        for attr in self.attributes.iter() {
            checked.add_attribute(attr.name.clone(), attr.value.clone())?;
        }

        Ok(())
    }

    /// `validate_schema` requires the preview to carry exactly the attributes
    /// declared by the schema, in any order
    pub fn validate_schema(&self, schema: &Schema) -> Result<(), CredentialError> {
        let mut names = self.attribute_names();
        names.sort();

        let mut expected = schema.attributes.clone();
        expected.sort();

        if names != expected {
            return Err(CredentialError::ValidationError(format!(
                "preview attributes {:?} do not match schema {} attributes {:?}",
                names, schema.id, expected
            )));
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CredentialError> {
        serde_json::to_vec(self).map_err(|err| CredentialError::JSONError(err.to_string()))
    }

    /// `matches` compares two previews using their serialized form
    pub fn matches(&self, other: &CredentialPreview) -> Result<bool, CredentialError> {
        Ok(self.to_bytes()? == other.to_bytes()?)
    }
}
