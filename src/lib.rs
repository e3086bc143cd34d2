//! Zentinel CAS authentication strategy
//!
//! Delegates user authentication to a CAS server. The host supplies a
//! [`CasRequest`] per incoming request and a [`VerifyHook`] that turns the
//! CAS profile into its own user record; the strategy answers with an
//! [`AuthOutcome`].

pub mod cas;
pub mod hooks;
pub mod request;

pub use cas::{AuthOutcome, CasConfig, CasProfile, CasStrategy, Completion, VerifyHook};
pub use hooks::LogHooks;
pub use request::{CasRequest, RequestParts};
