//! Host verification of a validated CAS profile.
//!
//! After the CAS server accepts a ticket, the host application gets the
//! parsed profile and decides whether the user is authenticated. The decision
//! is reported through a [`Completion`], which can be used at most once and
//! may be finished synchronously or from another task.

use tokio::sync::oneshot;

use super::outcome::AuthOutcome;
use super::response::CasProfile;

/// Host decision for a validated profile.
#[derive(Debug)]
pub struct Verified<P, I> {
    pub error: Option<anyhow::Error>,
    pub profile: Option<P>,
    pub info: Option<I>,
    pub challenge: Option<String>,
}

impl<P, I> Verified<P, I> {
    /// Map the host decision to the final outcome.
    ///
    /// An error or a missing profile both fail with the host's challenge.
    pub fn into_outcome(self) -> AuthOutcome<P, I> {
        if self.error.is_some() {
            return AuthOutcome::Fail {
                challenge: self.challenge,
            };
        }

        match self.profile {
            Some(profile) => AuthOutcome::Success {
                profile,
                info: self.info,
            },
            None => AuthOutcome::Fail {
                challenge: self.challenge,
            },
        }
    }
}

/// One-shot handle used by a [`VerifyHook`] to report its decision.
#[derive(Debug)]
pub struct Completion<P, I> {
    tx: oneshot::Sender<Verified<P, I>>,
}

impl<P, I> Completion<P, I> {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Verified<P, I>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Report the decision as `(error, profile, info, challenge)`.
    pub fn complete(
        self,
        error: Option<anyhow::Error>,
        profile: Option<P>,
        info: Option<I>,
        challenge: Option<String>,
    ) {
        // The attempt may already be gone; nothing left to report to.
        let _ = self.tx.send(Verified {
            error,
            profile,
            info,
            challenge,
        });
    }

    /// Accept the user.
    pub fn success(self, profile: P, info: Option<I>) {
        self.complete(None, Some(profile), info, None);
    }

    /// Reject the user.
    pub fn fail(self, challenge: Option<String>) {
        self.complete(None, None, None, challenge);
    }

    /// Reject the user because verification itself failed.
    pub fn error(self, error: anyhow::Error, challenge: Option<String>) {
        self.complete(Some(error), None, None, challenge);
    }
}

/// Host capability resolving a CAS profile into an application identity.
///
/// Implementations must eventually consume `done`. Dropping it without a
/// decision fails the attempt.
pub trait VerifyHook<P, I>: Send + Sync {
    fn verify(&self, profile: CasProfile, done: Completion<P, I>);
}

impl<P, I, F> VerifyHook<P, I> for F
where
    F: Fn(CasProfile, Completion<P, I>) + Send + Sync,
{
    fn verify(&self, profile: CasProfile, done: Completion<P, I>) {
        self(profile, done)
    }
}
