//! Runtime configuration loaded via OrthoConfig.
//!
//! Numeric knobs carry defaults at load time, so the service starts with no
//! `ROSTER_SYNC_*` variables set. Everything else is optional; accessors
//! report missing or malformed required values.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::ExternalId;
use crate::domain::source_rows::NormaliseOptions;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised while interpreting loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Configuration for the sync service and the `sync-once` command.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ROSTER_SYNC")]
pub struct SyncSettings {
    /// Socket address the HTTP server listens on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    #[ortho_config(default = 10)]
    pub max_pool_size: u32,
    /// Base URL of the CMS REST API. Without it, syncs need a CSV path.
    pub cms_base_url: Option<String>,
    /// Items requested per CMS page.
    #[ortho_config(default = 100)]
    pub cms_page_size: u32,
    #[ortho_config(default = 30)]
    pub cms_timeout_secs: u64,
    /// Base URL of the auth provider verifying bearer tokens.
    pub auth_base_url: Option<String>,
    /// API key sent to the auth provider alongside the caller's token.
    pub auth_api_key: Option<String>,
    #[ortho_config(default = 10)]
    pub auth_timeout_secs: u64,
    /// External id of the organization assigned to parentless teams.
    pub default_organization: Option<String>,
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSettings")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("max_pool_size", &self.max_pool_size)
            .field("cms_base_url", &self.cms_base_url)
            .field("cms_page_size", &self.cms_page_size)
            .field("cms_timeout_secs", &self.cms_timeout_secs)
            .field("auth_base_url", &self.auth_base_url)
            .field("auth_api_key", &self.auth_api_key.as_ref().map(|_| "<redacted>"))
            .field("auth_timeout_secs", &self.auth_timeout_secs)
            .field("default_organization", &self.default_organization)
            .finish()
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|raw| raw.trim()).filter(|raw| !raw.is_empty())
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|error| SettingsError::Invalid {
        name,
        message: error.to_string(),
    })
}

impl SyncSettings {
    /// Listen address, defaulting to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        non_blank(self.bind_addr.as_ref())
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|error: std::net::AddrParseError| SettingsError::Invalid {
                name: "bind_addr",
                message: error.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when no database URL is configured.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        non_blank(self.database_url.as_ref()).ok_or(SettingsError::Missing("database_url"))
    }

    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }

    /// The CMS API base URL, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for an unparsable URL.
    pub fn cms_base_url(&self) -> Result<Option<Url>, SettingsError> {
        non_blank(self.cms_base_url.as_ref())
            .map(|raw| parse_url("cms_base_url", raw))
            .transpose()
    }

    pub fn cms_page_size(&self) -> u32 {
        self.cms_page_size
    }

    pub fn cms_timeout(&self) -> Duration {
        Duration::from_secs(self.cms_timeout_secs)
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset and
    /// [`SettingsError::Invalid`] when unparsable.
    pub fn auth_base_url(&self) -> Result<Url, SettingsError> {
        let raw = non_blank(self.auth_base_url.as_ref())
            .ok_or(SettingsError::Missing("auth_base_url"))?;
        parse_url("auth_base_url", raw)
    }

    pub fn auth_api_key(&self) -> Option<String> {
        non_blank(self.auth_api_key.as_ref()).map(str::to_owned)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    /// Row normalisation options derived from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when the default organization id
    /// is blank after trimming.
    pub fn normalise_options(&self) -> Result<NormaliseOptions, SettingsError> {
        let default_organization = self
            .default_organization
            .as_ref()
            .map(|raw| {
                ExternalId::new(raw).map_err(|error| SettingsError::Invalid {
                    name: "default_organization",
                    message: error.to_string(),
                })
            })
            .transpose()?;
        Ok(NormaliseOptions {
            default_organization,
        })
    }
}
