//! Host request abstraction.

use anyhow::Result;
use async_trait::async_trait;

/// What the strategy needs from an incoming request.
#[async_trait]
pub trait CasRequest: Send {
    /// Original request URL, absolute or path plus query.
    fn original_url(&self) -> &str;

    /// Decoded value of a query parameter (first occurrence).
    fn query_param(&self, name: &str) -> Option<String>;

    /// End the local session. Called before redirecting to CAS logout.
    async fn logout(&mut self) -> Result<()>;
}

/// Plain request built from its URL, for hosts without their own type.
#[derive(Debug, Clone)]
pub struct RequestParts {
    original_url: String,
    query: Vec<(String, String)>,
    logged_out: bool,
}

impl RequestParts {
    pub fn new(original_url: impl Into<String>) -> Self {
        let original_url = original_url.into();
        let query = original_url
            .split_once('?')
            .map(|(_, rest)| rest.split('#').next().unwrap_or_default())
            .map(|raw| url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            original_url,
            query,
            logged_out: false,
        }
    }

    /// Whether `logout` has been called.
    pub fn logged_out(&self) -> bool {
        self.logged_out
    }
}

#[async_trait]
impl CasRequest for RequestParts {
    fn original_url(&self) -> &str {
        &self.original_url
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    async fn logout(&mut self) -> Result<()> {
        self.logged_out = true;
        Ok(())
    }
}
