//! DN to friendly value converter
//!
//! `from_ldap` turns a DN into the value of its first RDN. `to_ldap` turns
//! a friendly value, a DN, a GUID or a SID back into the DN of the entry it
//! identifies, using one directory search.

use crate::config::{AttributeConfig, ConfigError, IdentifierAttributes};
use crate::directory::{DirectoryError, DirectorySearch, SearchRequest, SearchScope};
use crate::dn::{self, DnError};
use crate::filter::SearchFilter;
use crate::identifier::{self, IdentifierError};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no options configured for attribute '{0}'")]
    MissingConfiguration(String),
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigError),
    #[error("malformed distinguished name: {0}")]
    MalformedDn(#[from] DnError),
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] IdentifierError),
    #[error("no entry found for '{0}'")]
    IdentifierNotFound(String),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Converts attribute values between their directory and friendly forms.
pub trait AttributeConverter {
    /// Directory value to friendly value
    fn from_ldap(&self, value: &str) -> Result<String, ConvertError>;

    /// Friendly value to directory value
    fn to_ldap(&self, value: &str) -> Result<String, ConvertError>;
}

/// Converter for attributes whose directory value is a DN.
///
/// Configured once with the logical attribute it serves and the options of
/// every logical attribute; holds no per-call state.
pub struct ConvertValueToDn<D> {
    directory: D,
    attribute: String,
    options: HashMap<String, AttributeConfig>,
    identifiers: IdentifierAttributes,
}

impl<D: DirectorySearch> ConvertValueToDn<D> {
    /// Create a converter for `attribute`.
    ///
    /// DN/GUID/SID attribute names default to those of the directory's
    /// dialect.
    pub fn new(
        directory: D,
        attribute: impl Into<String>,
        options: HashMap<String, AttributeConfig>,
    ) -> Self {
        let identifiers = IdentifierAttributes::for_directory(directory.directory_type());
        Self {
            directory,
            attribute: attribute.into(),
            options,
            identifiers,
        }
    }

    /// Override the DN/GUID/SID attribute names
    pub fn with_identifier_attributes(mut self, identifiers: IdentifierAttributes) -> Self {
        self.identifiers = identifiers;
        self
    }

    fn attribute_options(&self) -> Result<&AttributeConfig, ConvertError> {
        self.options
            .get(&self.attribute)
            .ok_or_else(|| ConvertError::MissingConfiguration(self.attribute.clone()))
    }

    /// Build the search `to_ldap` would run for `value`, without running it.
    pub fn search_request(&self, value: &str) -> Result<SearchRequest, ConvertError> {
        let options = self.attribute_options()?;

        if value.trim().is_empty() {
            return Err(IdentifierError::Empty.into());
        }

        let identifier = identifier::classify(value);
        let filter = SearchFilter::for_identifier(&identifier, options, &self.identifiers)?;
        debug!(
            attribute = %self.attribute,
            kind = identifier.kind(),
            filter = %filter,
            "built DN lookup filter"
        );

        Ok(SearchRequest {
            filter: filter.to_string(),
            attributes: vec![self.identifiers.distinguished_name.clone()],
            base_dn: options.base_dn.clone(),
            scope: SearchScope::Subtree,
            size_limit: None,
        })
    }
}

impl<D: DirectorySearch> AttributeConverter for ConvertValueToDn<D> {
    fn from_ldap(&self, value: &str) -> Result<String, ConvertError> {
        Ok(dn::first_rdn_value(value)?)
    }

    fn to_ldap(&self, value: &str) -> Result<String, ConvertError> {
        let request = self.search_request(value)?;
        let entries = self.directory.search(&request)?;

        if entries.len() > 1 {
            warn!(
                attribute = %self.attribute,
                value,
                count = entries.len(),
                "DN lookup matched more than one entry, using the first"
            );
        }

        entries
            .first()
            .and_then(|entry| entry.distinguished_name(&self.identifiers.distinguished_name))
            .map(str::to_string)
            .ok_or_else(|| ConvertError::IdentifierNotFound(value.to_string()))
    }
}
