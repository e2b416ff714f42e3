//! Identity and authorization for the Critiq review service
//!
//! Holds the user store, confirmation codes and their delivery, access
//! tokens, the authorization policy and the flows built from them. The HTTP
//! surface lives in the `api` service.

pub mod bootstrap;
pub mod confirmation;
pub mod jwt;
pub mod mailer;
pub mod models;
pub mod policy;
pub mod rate_limiter;
pub mod repositories;
pub mod service;
pub mod validation;

pub use service::{AuthError, AuthService};
