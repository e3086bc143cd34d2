//! CAS authentication strategy.
//!
//! Per request the strategy either redirects to CAS logout (when a
//! `RelayState` is present), redirects to CAS login (when no ticket is
//! present), or validates the ticket and hands the profile to the host's
//! [`VerifyHook`].

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info, warn};

use super::config::{CasConfig, CasEndpoints};
use super::outcome::AuthOutcome;
use super::service::{resolve_service_url, TICKET_PARAM};
use super::validator::{TicketValidator, Validation};
use super::verify::{Completion, VerifyHook};
use crate::hooks::LogHooks;
use crate::request::CasRequest;

/// Query parameter that triggers the logout flow.
pub const RELAY_STATE_PARAM: &str = "RelayState";

/// Reason reported when the verification hook never reports a decision.
pub const HOOK_DROPPED: &str = "verification hook dropped the completion";

/// CAS authentication strategy.
///
/// `P` is the application profile and `I` the auxiliary info produced by the
/// verification hook.
pub struct CasStrategy<P, I> {
    config: CasConfig,
    endpoints: CasEndpoints,
    validator: TicketValidator,
    hook: Box<dyn VerifyHook<P, I>>,
    log: LogHooks,
}

impl<P, I> CasStrategy<P, I>
where
    P: Send + 'static,
    I: Send + 'static,
{
    /// Create a strategy with a default HTTP client (no timeout).
    pub fn new(config: CasConfig, hook: impl VerifyHook<P, I> + 'static) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Self::with_client(config, client, hook)
    }

    /// Create a strategy using a caller-configured HTTP client.
    ///
    /// Timeouts, proxies and TLS settings are taken from `client`.
    pub fn with_client(
        config: CasConfig,
        client: Client,
        hook: impl VerifyHook<P, I> + 'static,
    ) -> Result<Self> {
        let endpoints = CasEndpoints::from_config(&config)?;
        let validator = TicketValidator::new(client, endpoints.validate.clone());

        Ok(Self {
            config,
            endpoints,
            validator,
            hook: Box::new(hook),
            log: LogHooks::default(),
        })
    }

    /// Attach host logging callbacks.
    pub fn with_log_hooks(mut self, log: LogHooks) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    /// Service URL identifying `req` to the CAS server.
    pub fn service_url<R: CasRequest + ?Sized>(&self, req: &R) -> Result<String> {
        resolve_service_url(&self.endpoints.server, req.original_url())
    }

    /// CAS login redirect target for `service`.
    pub fn login_url(&self, service: &str) -> String {
        let mut url = self.endpoints.login.clone();
        url.query_pairs_mut().append_pair("service", service);
        url.to_string()
    }

    /// CAS logout redirect target echoing `relay_state`.
    pub fn logout_url(&self, relay_state: &str) -> String {
        let mut url = self.endpoints.logout.clone();
        url.query_pairs_mut()
            .append_pair("_eventId", "next")
            .append_pair(RELAY_STATE_PARAM, relay_state);
        url.to_string()
    }

    /// CAS validation URL for `ticket` and `service`.
    pub fn validate_url(&self, ticket: &str, service: &str) -> String {
        self.validator.validate_url(ticket, service).to_string()
    }

    /// Authenticate a request.
    ///
    /// Never returns an error: every failure is reported as
    /// [`AuthOutcome::Fail`].
    pub async fn authenticate<R: CasRequest + ?Sized>(&self, req: &mut R) -> AuthOutcome<P, I> {
        if let Some(relay_state) = non_empty(req.query_param(RELAY_STATE_PARAM)) {
            if let Err(e) = req.logout().await {
                warn!(error = %e, "Local logout failed, continuing with CAS logout");
                self.log.error("local logout failed", Some(&e));
            }

            let location = self.logout_url(&relay_state);
            info!(location = %location, "Redirecting to CAS logout");
            self.log.info("redirecting to CAS logout");
            return AuthOutcome::redirect(location);
        }

        let service = match self.service_url(&*req) {
            Ok(service) => service,
            Err(e) => {
                warn!(error = %e, "Failed to resolve CAS service URL");
                self.log.error("failed to resolve service URL", Some(&e));
                return AuthOutcome::fail(format!("{:#}", e));
            }
        };

        let Some(ticket) = non_empty(req.query_param(TICKET_PARAM)) else {
            let location = self.login_url(&service);
            info!(service = %service, "No CAS ticket, redirecting to login");
            self.log.info("redirecting to CAS login");
            return AuthOutcome::redirect(location);
        };

        self.validate(&ticket, &service).await
    }

    /// Validate `ticket` for `service` and run host verification.
    pub async fn validate(&self, ticket: &str, service: &str) -> AuthOutcome<P, I> {
        let profile = match self.validator.validate(ticket, service).await {
            Validation::Authenticated(profile) => profile,
            Validation::Rejected(reason) => {
                info!(reason = %reason, "CAS authentication failed");
                self.log.error(&reason, None);
                return AuthOutcome::fail(reason);
            }
        };

        let user = profile.user.clone();
        let (done, pending) = Completion::channel();
        self.hook.verify(profile, done);

        let verified = match pending.await {
            Ok(verified) => verified,
            Err(_) => {
                warn!(user = %user, "Verification hook dropped its completion");
                self.log.error(HOOK_DROPPED, None);
                return AuthOutcome::fail(HOOK_DROPPED);
            }
        };

        if let Some(ref e) = verified.error {
            warn!(user = %user, error = %e, "Verification hook reported an error");
            self.log.error("verification hook reported an error", Some(e));
        }

        let outcome = verified.into_outcome();
        if outcome.is_success() {
            info!(user = %user, "CAS authentication successful");
            self.log.info("CAS authentication successful");
        } else {
            debug!(user = %user, challenge = ?outcome.challenge(), "Host rejected CAS user");
        }
        outcome
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::response::CasProfile;
    use crate::request::RequestParts;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use url::Url;

    fn test_config() -> CasConfig {
        CasConfig {
            base: "https://cas.example.com/cas".to_string(),
            login_route: "/login".to_string(),
            validate_route: "/p3/serviceValidate".to_string(),
            logout_route: "/logout".to_string(),
            server_url: "https://app.example.com".to_string(),
        }
    }

    fn strategy() -> CasStrategy<CasProfile, ()> {
        CasStrategy::new(test_config(), |profile: CasProfile, done: Completion<CasProfile, ()>| {
            done.success(profile, None)
        })
        .unwrap()
    }

    fn query(location: &str) -> Vec<(String, String)> {
        Url::parse(location).unwrap().query_pairs().into_owned().collect()
    }

    struct FailingLogout;

    #[async_trait]
    impl CasRequest for FailingLogout {
        fn original_url(&self) -> &str {
            "/app?RelayState=bye"
        }

        fn query_param(&self, name: &str) -> Option<String> {
            (name == RELAY_STATE_PARAM).then(|| "bye".to_string())
        }

        async fn logout(&mut self) -> Result<()> {
            Err(anyhow!("session store unavailable"))
        }
    }

    #[tokio::test]
    async fn test_redirects_to_login_without_ticket() {
        let mut req = RequestParts::new("/dashboard?tab=1");
        let outcome = strategy().authenticate(&mut req).await;

        let location = outcome.location().unwrap();
        assert!(location.starts_with("https://cas.example.com/cas/login?"));
        assert_eq!(
            query(location),
            vec![(
                "service".to_string(),
                "https://app.example.com/dashboard?tab=1".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_empty_ticket_redirects_to_login() {
        let mut req = RequestParts::new("/dashboard?ticket=");
        let outcome = strategy().authenticate(&mut req).await;

        let location = outcome.location().unwrap();
        assert_eq!(
            query(location),
            vec![(
                "service".to_string(),
                "https://app.example.com/dashboard".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_relay_state_redirects_to_logout() {
        let mut req = RequestParts::new("/app?ticket=ST-1&RelayState=%2Fgoodbye%3Fa%3Db");
        let outcome = strategy().authenticate(&mut req).await;

        assert!(req.logged_out());
        let location = outcome.location().unwrap();
        assert!(location.starts_with("https://cas.example.com/cas/logout?"));
        assert_eq!(
            query(location),
            vec![
                ("_eventId".to_string(), "next".to_string()),
                ("RelayState".to_string(), "/goodbye?a=b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_logout_failure_still_redirects() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&errors);
        let strategy = strategy().with_log_hooks(LogHooks::new().with_error(move |msg, _| {
            seen.lock().unwrap().push(msg.to_string());
        }));

        let outcome = strategy.authenticate(&mut FailingLogout).await;

        assert!(outcome
            .location()
            .unwrap()
            .starts_with("https://cas.example.com/cas/logout?"));
        assert_eq!(*errors.lock().unwrap(), vec!["local logout failed"]);
    }

    #[test]
    fn test_service_url_never_contains_ticket() {
        let strategy = strategy();
        let req = RequestParts::new("/cb?ticket=ST-77&next=%2Fhome");
        let service = strategy.service_url(&req).unwrap();
        assert_eq!(service, "https://app.example.com/cb?next=%2Fhome");
    }

    #[test]
    fn test_validate_url_shape() {
        let url = strategy().validate_url("ST-1", "https://app.example.com/");
        assert_eq!(
            url,
            "https://cas.example.com/cas/p3/serviceValidate?ticket=ST-1&service=https%3A%2F%2Fapp.example.com%2F"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.server_url = "app.example.com".to_string();
        let result = CasStrategy::<CasProfile, ()>::new(
            config,
            |profile: CasProfile, done: Completion<CasProfile, ()>| done.success(profile, None),
        );
        assert!(result.is_err());
    }
}
