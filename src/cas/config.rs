//! CAS strategy configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// CAS server and service configuration.
///
/// Every field is required. The configuration is fixed when the strategy is
/// built and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasConfig {
    /// Base URL of the CAS server.
    /// Example: "https://cas.example.com/cas"
    pub base: String,

    /// Login route, appended to `base`.
    /// Example: "/login"
    pub login_route: String,

    /// Ticket validation route, appended to `base`.
    /// Example: "/p3/serviceValidate"
    pub validate_route: String,

    /// Logout route, appended to `base`.
    /// Example: "/logout"
    pub logout_route: String,

    /// Public URL of this server, used to resolve request URLs into
    /// service URLs.
    /// Example: "https://app.example.com"
    pub server_url: String,
}

impl CasConfig {
    /// Load configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read CAS config: {:?}", path))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse CAS config: {:?}", path))
    }

    /// Full login endpoint (`{base}{login_route}`).
    pub fn login_endpoint(&self) -> String {
        format!("{}{}", self.base, self.login_route)
    }

    /// Full validation endpoint (`{base}{validate_route}`).
    pub fn validate_endpoint(&self) -> String {
        format!("{}{}", self.base, self.validate_route)
    }

    /// Full logout endpoint (`{base}{logout_route}`).
    pub fn logout_endpoint(&self) -> String {
        format!("{}{}", self.base, self.logout_route)
    }
}

/// Endpoints parsed once from a [`CasConfig`].
#[derive(Debug, Clone)]
pub struct CasEndpoints {
    pub login: Url,
    pub validate: Url,
    pub logout: Url,
    pub server: Url,
}

impl CasEndpoints {
    /// Parse all endpoints. URL parsing is the only validation applied.
    pub fn from_config(config: &CasConfig) -> Result<Self> {
        Ok(Self {
            login: parse_endpoint("login", &config.login_endpoint())?,
            validate: parse_endpoint("validate", &config.validate_endpoint())?,
            logout: parse_endpoint("logout", &config.logout_endpoint())?,
            server: parse_endpoint("server", &config.server_url)?,
        })
    }
}

fn parse_endpoint(kind: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid CAS {} URL: {}", kind, raw))
}
