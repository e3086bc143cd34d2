//! Final result of one authentication attempt.

use serde::Serialize;

/// Outcome reported back to the host for a single request.
///
/// Every failure, whatever its origin, is reported as `Fail`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthOutcome<P, I> {
    /// Send the client to `location`.
    Redirect { location: String },
    /// The user is authenticated.
    Success { profile: P, info: Option<I> },
    /// Authentication failed. `challenge` carries the reason when known.
    Fail { challenge: Option<String> },
}

impl<P, I> AuthOutcome<P, I> {
    pub fn redirect(location: impl Into<String>) -> Self {
        AuthOutcome::Redirect {
            location: location.into(),
        }
    }

    pub fn fail(challenge: impl Into<String>) -> Self {
        AuthOutcome::Fail {
            challenge: Some(challenge.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success { .. })
    }

    /// Failure reason, if this is a failure carrying one.
    pub fn challenge(&self) -> Option<&str> {
        match self {
            AuthOutcome::Fail { challenge } => challenge.as_deref(),
            _ => None,
        }
    }

    /// Redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        match self {
            AuthOutcome::Redirect { location } => Some(location),
            _ => None,
        }
    }
}
