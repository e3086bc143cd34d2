//! CAS service ticket validation.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::response::{CasProfile, ServiceResponse};
use super::service::TICKET_PARAM;

/// Reason reported when the validation body cannot be understood.
pub const BAD_RESPONSE: &str = "bad response from server";

/// Reason reported when the CAS server rejects the ticket.
pub const AUTHENTICATION_FAILED: &str = "authentication failed";

/// Result of asking the CAS server about a ticket.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// The ticket is valid; the profile still needs host verification.
    Authenticated(CasProfile),
    /// The attempt failed for the given reason.
    Rejected(String),
}

/// Validates service tickets against the CAS validation endpoint.
#[derive(Debug, Clone)]
pub struct TicketValidator {
    client: Client,
    endpoint: Url,
}

impl TicketValidator {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Validation URL for a ticket: `{endpoint}?ticket=..&service=..`.
    pub fn validate_url(&self, ticket: &str, service: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(TICKET_PARAM, ticket)
            .append_pair("service", service);
        url
    }

    /// Validate `ticket` for `service`.
    ///
    /// Transport errors and non-200 statuses are not retried and the body is
    /// not parsed in that case.
    pub async fn validate(&self, ticket: &str, service: &str) -> Validation {
        let body = match self.fetch(ticket, service).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "CAS ticket validation request failed");
                return Validation::Rejected(e.to_string());
            }
        };

        let response = match ServiceResponse::parse(&body) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Unparseable CAS validation response");
                return Validation::Rejected(BAD_RESPONSE.to_string());
            }
        };

        match response {
            ServiceResponse::Success(profile) => {
                debug!(user = %profile.user, "CAS ticket validated");
                Validation::Authenticated(profile)
            }
            ServiceResponse::Failure(failure) => {
                debug!(
                    code = ?failure.code,
                    description = ?failure.description,
                    "CAS rejected ticket"
                );
                let reason = match failure.code {
                    Some(code) => format!("{}: {}", AUTHENTICATION_FAILED, code),
                    None => AUTHENTICATION_FAILED.to_string(),
                };
                Validation::Rejected(reason)
            }
            ServiceResponse::Malformed => {
                debug!("CAS response has neither success nor failure");
                Validation::Rejected(AUTHENTICATION_FAILED.to_string())
            }
        }
    }

    async fn fetch(&self, ticket: &str, service: &str) -> Result<String> {
        let url = self.validate_url(ticket, service);
        debug!(endpoint = %self.endpoint, "Validating CAS ticket");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(anyhow!("{}", status));
        }

        response
            .text()
            .await
            .context("Failed to read CAS validation response")
    }
}
