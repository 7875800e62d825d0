//! LDAP DN Value Converter
//!
//! Reconcile a directory entry's distinguished name with a friendly
//! identifying value (such as its common name).
//!
//! # Conversion
//!
//! - `from_ldap`: `cn=Foo,dc=example,dc=com` becomes `Foo`, no search needed
//! - `to_ldap`: the value is classified as a DN, objectGUID, objectSid or
//!   plain name, a hex-escaped search filter is built from the attribute's
//!   options, and the DN of the matching entry is returned
//!
//! # Example
//!
//! ```no_run
//! use ldap_dn_converter::{AttributeConfig, AttributeConverter, Config, ConvertValueToDn, LdapDirectory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let directory = LdapDirectory::new(config.ldap()?.clone(), config.load_ldap_password()?);
//! let converter = ConvertValueToDn::new(directory, "manager", config.attributes.clone())
//!     .with_identifier_attributes(config.identifier_attributes());
//!
//! let dn = converter.to_ldap("S-1-5-21-1004336348-1177238915-682003330-512")?;
//! assert_eq!(converter.from_ldap(&dn)?, "Administrator");
//! # let _ = AttributeConfig::new("cn");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod converter;
pub mod directory;
pub mod dn;
pub mod escape;
pub mod filter;
pub mod identifier;

pub use config::{AttributeConfig, Config, ConfigError, IdentifierAttributes};
pub use converter::{AttributeConverter, ConvertError, ConvertValueToDn};
pub use directory::{
    DirectoryError, DirectorySearch, DirectoryType, Entry, LdapDirectory, SearchRequest,
    SearchScope,
};
pub use filter::SearchFilter;
pub use identifier::{classify, Identifier};
