//! CAS (Central Authentication Service) v3 authentication.
//!
//! Redirect-based single sign-on: unauthenticated requests are sent to the
//! CAS login page, returning service tickets are validated against the CAS
//! server, and the validated profile is handed to the host for a final
//! decision.

pub mod config;
pub mod outcome;
pub mod response;
pub mod service;
pub mod strategy;
pub mod validator;
pub mod verify;

pub use config::{CasConfig, CasEndpoints};
pub use outcome::AuthOutcome;
pub use response::{Attributes, AuthenticationFailure, CasProfile, ServiceResponse};
pub use service::resolve_service_url;
pub use strategy::CasStrategy;
pub use validator::{TicketValidator, Validation};
pub use verify::{Completion, Verified, VerifyHook};
