//! Converter configuration
//!
//! Per-attribute options and the directory connection settings.
//! Configuration is loaded from /etc/ldap_dn_converter/config.toml

use crate::directory::DirectoryType;
use crate::dn::is_attribute_descriptor;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/ldap_dn_converter/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory connection (required to resolve values)
    #[serde(default)]
    pub ldap: Option<LdapConfig>,
    /// Overrides for the DN/GUID/SID attribute names
    #[serde(default)]
    pub identifiers: IdentifierOverrides,
    /// Options keyed by logical attribute name
    #[serde(default)]
    pub attributes: HashMap<String, AttributeConfig>,
}

/// Options for one logical attribute
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttributeConfig {
    /// Attribute holding the friendly value (e.g. `cn`)
    pub attribute: String,
    /// Equality clauses ANDed into every search
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
    /// Search base; the connection default is used when unset
    #[serde(default)]
    pub base_dn: Option<String>,
}

impl AttributeConfig {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            filter: BTreeMap::new(),
            base_dn: None,
        }
    }

    pub fn with_filter(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.insert(attribute.into(), value.into());
        self
    }

    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = Some(base_dn.into());
        self
    }

    /// Check the target attribute and every base filter key.
    ///
    /// Attribute names are written into search filters verbatim, so each
    /// must be a plain attribute descriptor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_attribute_name("attribute", &self.attribute)?;
        for key in self.filter.keys() {
            check_attribute_name("filter", key)?;
        }
        Ok(())
    }
}

fn check_attribute_name(context: &str, name: &str) -> Result<(), ConfigError> {
    if is_attribute_descriptor(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfig(format!(
            "{}: invalid attribute name '{}'",
            context, name
        )))
    }
}

/// Names of the attributes a DN, GUID or SID is matched against.
///
/// A dialect without a binary GUID or SID attribute leaves it unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierAttributes {
    pub distinguished_name: String,
    pub object_guid: Option<String>,
    pub object_sid: Option<String>,
}

impl IdentifierAttributes {
    /// Defaults for a directory dialect
    pub fn for_directory(directory_type: DirectoryType) -> Self {
        match directory_type {
            DirectoryType::ActiveDirectory => Self {
                distinguished_name: "distinguishedName".to_string(),
                object_guid: Some("objectGuid".to_string()),
                object_sid: Some("objectSid".to_string()),
            },
            DirectoryType::OpenLdap => Self {
                distinguished_name: "entryDN".to_string(),
                object_guid: None,
                object_sid: None,
            },
        }
    }

    /// Check the DN, GUID and SID attribute names
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_attribute_name("distinguished_name", &self.distinguished_name)?;
        if let Some(guid) = &self.object_guid {
            check_attribute_name("object_guid", guid)?;
        }
        if let Some(sid) = &self.object_sid {
            check_attribute_name("object_sid", sid)?;
        }
        Ok(())
    }

    pub fn with_overrides(mut self, overrides: &IdentifierOverrides) -> Self {
        if let Some(dn) = &overrides.distinguished_name {
            self.distinguished_name = dn.clone();
        }
        if let Some(guid) = &overrides.object_guid {
            self.object_guid = Some(guid.clone());
        }
        if let Some(sid) = &overrides.object_sid {
            self.object_sid = Some(sid.clone());
        }
        self
    }
}

impl Default for IdentifierAttributes {
    fn default() -> Self {
        Self::for_directory(DirectoryType::default())
    }
}

/// `[identifiers]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdentifierOverrides {
    pub distinguished_name: Option<String>,
    pub object_guid: Option<String>,
    pub object_sid: Option<String>,
}

/// LDAP connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LdapConfig {
    /// LDAP server URL (e.g., ldap://dc01.example.com:389)
    pub server: String,
    /// Default base DN for searches
    pub base_dn: String,
    /// Bind DN for authentication
    pub bind_dn: String,
    /// Path to file containing bind password
    pub bind_password_file: String,
    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Directory dialect: "ad" or "openldap"
    #[serde(default)]
    pub directory_type: DirectoryType,
}

fn default_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, options) in &self.attributes {
            if name.is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "attribute section name cannot be empty".to_string(),
                ));
            }
            options.validate().map_err(|e| match e {
                ConfigError::InvalidConfig(msg) => {
                    ConfigError::InvalidConfig(format!("attributes.{}.{}", name, msg))
                }
                other => other,
            })?;
        }

        self.identifier_attributes().validate().map_err(|e| match e {
            ConfigError::InvalidConfig(msg) => {
                ConfigError::InvalidConfig(format!("identifiers.{}", msg))
            }
            other => other,
        })?;

        if let Some(ldap) = &self.ldap {
            if ldap.server.is_empty() {
                return Err(ConfigError::MissingField("ldap.server"));
            }
        }

        Ok(())
    }

    /// Identifier attribute names for the configured dialect
    pub fn identifier_attributes(&self) -> IdentifierAttributes {
        let directory_type = self
            .ldap
            .as_ref()
            .map(|l| l.directory_type)
            .unwrap_or_default();
        IdentifierAttributes::for_directory(directory_type).with_overrides(&self.identifiers)
    }

    /// Get the `[ldap]` section
    pub fn ldap(&self) -> Result<&LdapConfig, ConfigError> {
        self.ldap.as_ref().ok_or(ConfigError::MissingField("[ldap] section"))
    }

    /// Load the LDAP bind password
    pub fn load_ldap_password(&self) -> Result<String, ConfigError> {
        let password = fs::read_to_string(&self.ldap()?.bind_password_file)?;
        Ok(password.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_CONFIG: &str = r#"
[ldap]
server = "ldap://dc01.example.com:389"
base_dn = "dc=example,dc=com"
bind_dn = "cn=svc,dc=example,dc=com"
bind_password_file = "/etc/ldap_dn_converter/bind.secret"

[attributes.manager]
attribute = "cn"
base_dn = "ou=People,dc=example,dc=com"

[attributes.manager.filter]
objectClass = "user"
objectCategory = "person"

[attributes.group]
attribute = "sAMAccountName"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(FULL_CONFIG).unwrap();

        let ldap = config.ldap().unwrap();
        assert_eq!(ldap.server, "ldap://dc01.example.com:389");
        assert_eq!(ldap.timeout_seconds, 10); // default
        assert_eq!(ldap.directory_type, DirectoryType::ActiveDirectory); // default

        let manager = &config.attributes["manager"];
        assert_eq!(manager.attribute, "cn");
        assert_eq!(manager.base_dn.as_deref(), Some("ou=People,dc=example,dc=com"));
        assert_eq!(manager.filter.len(), 2);
        assert_eq!(manager.filter["objectClass"], "user");

        let group = &config.attributes["group"];
        assert!(group.filter.is_empty());
        assert!(group.base_dn.is_none());
    }

    #[test]
    fn test_identifier_attributes_defaults() {
        let config = Config::parse(FULL_CONFIG).unwrap();
        assert_eq!(
            config.identifier_attributes(),
            IdentifierAttributes::for_directory(DirectoryType::ActiveDirectory)
        );
    }

    #[test]
    fn test_identifier_attributes_openldap_with_override() {
        let config = Config::parse(
            r#"
[ldap]
server = "ldap://localhost:389"
base_dn = "dc=example,dc=com"
bind_dn = "cn=admin,dc=example,dc=com"
bind_password_file = "/tmp/secret"
directory_type = "openldap"

[identifiers]
object_guid = "objectGUID"
"#,
        )
        .unwrap();

        let ids = config.identifier_attributes();
        assert_eq!(ids.distinguished_name, "entryDN");
        assert_eq!(ids.object_guid.as_deref(), Some("objectGUID"));
        assert_eq!(ids.object_sid, None);
    }

    #[test]
    fn test_attributes_without_ldap_section() {
        let config = Config::parse(
            r#"
[attributes.owner]
attribute = "uid"
"#,
        )
        .unwrap();
        assert!(config.ldap.is_none());
        assert!(matches!(config.ldap(), Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_invalid_target_attribute() {
        let result = Config::parse(
            r#"
[attributes.manager]
attribute = "cn)(objectClass=*"
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_filter_key() {
        let result = Config::parse(
            r#"
[attributes.manager]
attribute = "cn"

[attributes.manager.filter]
"object Class" = "user"
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_identifier_override() {
        let result = Config::parse(
            r#"
[identifiers]
object_sid = "-objectSid"
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_directory_type() {
        let result = Config::parse(
            r#"
[ldap]
server = "ldap://localhost:389"
base_dn = "dc=example,dc=com"
bind_dn = "cn=admin,dc=example,dc=com"
bind_password_file = "/tmp/secret"
directory_type = "novell"
"#,
        );
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_from_file_and_password() {
        let mut secret = NamedTempFile::new().unwrap();
        writeln!(secret, "s3cret  ").unwrap();

        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[ldap]
server = "ldaps://dc01.example.com:636"
base_dn = "dc=example,dc=com"
bind_dn = "cn=svc,dc=example,dc=com"
bind_password_file = "{}"
timeout_seconds = 3
"#,
            secret.path().display()
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.ldap().unwrap().timeout_seconds, 3);
        assert_eq!(config.load_ldap_password().unwrap(), "s3cret");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load_from("/nonexistent/ldap_dn_converter.toml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_attribute_config_builder() {
        let options = AttributeConfig::new("cn")
            .with_filter("objectClass", "bar")
            .with_base_dn("dc=example,dc=com");
        assert_eq!(options.filter["objectClass"], "bar");
        assert_eq!(options.base_dn.as_deref(), Some("dc=example,dc=com"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_attribute_config_validate_without_file() {
        let options = AttributeConfig::new("cn=*)(|(objectClass");
        assert!(matches!(options.validate(), Err(ConfigError::InvalidConfig(_))));

        let options = AttributeConfig::new("cn").with_filter("objectClass=*)(x", "user");
        assert!(matches!(options.validate(), Err(ConfigError::InvalidConfig(_))));

        assert!(AttributeConfig::new("1.2.840.113556.1.4.221").validate().is_ok());
    }

    #[test]
    fn test_identifier_attributes_validate() {
        assert!(IdentifierAttributes::default().validate().is_ok());
        assert!(IdentifierAttributes::for_directory(DirectoryType::OpenLdap)
            .validate()
            .is_ok());

        let ids = IdentifierAttributes {
            distinguished_name: "distinguishedName)(cn=*".to_string(),
            object_guid: None,
            object_sid: None,
        };
        assert!(matches!(ids.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_config_message_names_section() {
        let err = Config::parse(
            r#"
[attributes.manager]
attribute = "c n"
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: attributes.manager.attribute: invalid attribute name 'c n'"
        );
    }
}
