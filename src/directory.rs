//! Directory search
//!
//! The converter only needs one capability from the directory: run a
//! search and hand back the matching entries. `DirectorySearch` is that
//! seam; `LdapDirectory` implements it over a synchronous ldap3 connection.

use crate::config::LdapConfig;
use ldap3::{LdapConn, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("LDAP connection failed: {0}")]
    ConnectionFailed(String),
    #[error("LDAP bind failed: {0}")]
    BindFailed(String),
    #[error("LDAP search failed: {0}")]
    SearchFailed(String),
}

/// Directory dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DirectoryType {
    #[default]
    #[serde(rename = "ad")]
    ActiveDirectory,
    #[serde(rename = "openldap")]
    OpenLdap,
}

impl DirectoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectoryType::ActiveDirectory => "ad",
            DirectoryType::OpenLdap => "openldap",
        }
    }
}

/// Search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// Parameters of a single search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub filter: String,
    pub attributes: Vec<String>,
    /// Search base; `None` means the connection's default base
    pub base_dn: Option<String>,
    pub scope: SearchScope,
    pub size_limit: Option<i32>,
}

/// A search result entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attrs.insert(name.into(), values);
        self
    }

    /// Values of an attribute, matching the name case-insensitively
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// First non-empty value of the DN attribute `attribute`.
    ///
    /// The entry's own `dn` is not consulted: an entry the server returned
    /// without the requested attribute has no DN value.
    pub fn distinguished_name(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|v| v.first())
            .map(String::as_str)
            .filter(|dn| !dn.is_empty())
    }
}

impl From<SearchEntry> for Entry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
        }
    }
}

/// Search capability consumed by the converter
pub trait DirectorySearch: Send + Sync {
    /// Run one search and return every matching entry
    fn search(&self, request: &SearchRequest) -> Result<Vec<Entry>, DirectoryError>;

    /// Dialect of the directory behind this connection
    fn directory_type(&self) -> DirectoryType;
}

impl<T: DirectorySearch + ?Sized> DirectorySearch for &T {
    fn search(&self, request: &SearchRequest) -> Result<Vec<Entry>, DirectoryError> {
        (**self).search(request)
    }

    fn directory_type(&self) -> DirectoryType {
        (**self).directory_type()
    }
}

impl<T: DirectorySearch + ?Sized> DirectorySearch for Arc<T> {
    fn search(&self, request: &SearchRequest) -> Result<Vec<Entry>, DirectoryError> {
        (**self).search(request)
    }

    fn directory_type(&self) -> DirectoryType {
        (**self).directory_type()
    }
}

/// LDAP-backed directory
///
/// Every search opens, binds and unbinds its own connection, so a shared
/// `&LdapDirectory` can serve concurrent callers.
pub struct LdapDirectory {
    config: LdapConfig,
    password: String,
}

impl LdapDirectory {
    /// Create a new LDAP directory client
    pub fn new(config: LdapConfig, password: String) -> Self {
        Self { config, password }
    }

    fn connect(&self) -> Result<LdapConn, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.timeout_seconds));

        let mut ldap = LdapConn::with_settings(settings, &self.config.server)
            .map_err(|e| DirectoryError::ConnectionFailed(e.to_string()))?;

        ldap.simple_bind(&self.config.bind_dn, &self.password)
            .map_err(|e| DirectoryError::BindFailed(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::BindFailed(e.to_string()))?;

        info!(server = %self.config.server, bind_dn = %self.config.bind_dn, "LDAP bind succeeded");
        Ok(ldap)
    }
}

impl DirectorySearch for LdapDirectory {
    fn search(&self, request: &SearchRequest) -> Result<Vec<Entry>, DirectoryError> {
        let mut ldap = self.connect()?;

        if let Some(limit) = request.size_limit {
            ldap.with_search_options(SearchOptions::new().sizelimit(limit));
        }

        let base = request.base_dn.as_deref().unwrap_or(&self.config.base_dn);
        debug!(base, filter = %request.filter, "LDAP search");

        let result = ldap
            .search(
                base,
                request.scope.into(),
                &request.filter,
                request.attributes.iter().map(String::as_str).collect::<Vec<_>>(),
            )
            .map_err(|e| DirectoryError::SearchFailed(e.to_string()))
            .and_then(|r| {
                r.success()
                    .map_err(|e| DirectoryError::SearchFailed(e.to_string()))
            });

        let _ = ldap.unbind();

        let (rs, _res) = result?;
        Ok(rs
            .into_iter()
            .map(|entry| Entry::from(SearchEntry::construct(entry)))
            .collect())
    }

    fn directory_type(&self) -> DirectoryType {
        self.config.directory_type
    }
}
