//! Search filter composition
//!
//! A filter is the AND of the configured base clauses and one group of
//! alternative identifier clauses:
//!
//! ```text
//! (&(objectClass=\75\73\65\72)(|(objectGuid=\d3\1c...)(cn=\61\31...)))
//! ```
//!
//! All values are hex-escaped byte by byte. Attribute names are written
//! verbatim and are checked to be attribute descriptors first.

use crate::config::{AttributeConfig, ConfigError, IdentifierAttributes};
use crate::escape::{escape_filter_value, hex_escape};
use crate::identifier::Identifier;
use std::collections::BTreeMap;
use std::fmt;

/// A single `(attribute=value)` item with an already escaped value
#[derive(Debug, Clone, PartialEq, Eq)]
struct EqualityItem {
    attribute: String,
    value: String,
}

impl fmt::Display for EqualityItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}={})", self.attribute, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    base: Vec<EqualityItem>,
    alternatives: Vec<EqualityItem>,
}

impl SearchFilter {
    /// Start a filter from base clauses, in key order
    fn new(base_filter: &BTreeMap<String, String>) -> Self {
        Self {
            base: base_filter
                .iter()
                .map(|(attribute, value)| EqualityItem {
                    attribute: attribute.clone(),
                    value: escape_filter_value(value),
                })
                .collect(),
            alternatives: Vec::new(),
        }
    }

    /// Build the filter that finds the entry an identifier refers to.
    ///
    /// DNs are matched against the DN attribute and the target attribute,
    /// GUIDs and SIDs against their binary attribute (when the dialect has
    /// one) and the target attribute as text, plain names against the
    /// target attribute only.
    ///
    /// Fails with `ConfigError::InvalidConfig` when any attribute name that
    /// would be written into the filter is not an attribute descriptor.
    pub fn for_identifier(
        identifier: &Identifier,
        options: &AttributeConfig,
        identifiers: &IdentifierAttributes,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        identifiers.validate()?;

        let mut filter = Self::new(&options.filter);
        let target = &options.attribute;

        match identifier {
            Identifier::DistinguishedName(dn) => {
                filter.match_bytes(&identifiers.distinguished_name, dn.as_bytes());
                filter.match_bytes(target, dn.as_bytes());
            }
            Identifier::ObjectGuid { bytes, text } => {
                if let Some(attribute) = &identifiers.object_guid {
                    filter.match_bytes(attribute, bytes);
                }
                filter.match_text(target, text);
            }
            Identifier::ObjectSid { bytes, text } => {
                if let Some(attribute) = &identifiers.object_sid {
                    filter.match_bytes(attribute, bytes);
                }
                filter.match_text(target, text);
            }
            Identifier::PlainName(name) => filter.match_text(target, name),
        }

        Ok(filter)
    }

    /// Add an alternative matching a binary value
    fn match_bytes(&mut self, attribute: &str, bytes: &[u8]) {
        self.alternatives.push(EqualityItem {
            attribute: attribute.to_string(),
            value: hex_escape(bytes),
        });
    }

    /// Add an alternative matching a text value
    fn match_text(&mut self, attribute: &str, text: &str) {
        self.alternatives.push(EqualityItem {
            attribute: attribute.to_string(),
            value: escape_filter_value(text),
        });
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(&")?;
        for item in &self.base {
            write!(f, "{}", item)?;
        }
        match self.alternatives.as_slice() {
            [] => {}
            [single] => write!(f, "{}", single)?,
            many => {
                f.write_str("(|")?;
                for item in many {
                    write!(f, "{}", item)?;
                }
                f.write_str(")")?;
            }
        }
        f.write_str(")")
    }
}
