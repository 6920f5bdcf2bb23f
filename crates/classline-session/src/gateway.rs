//! Identity verification hook.
//!
//! Classline doesn't implement authentication itself — the hosted identity
//! authority does. This crate only defines the [`IdentityGateway`] trait: a
//! single async method that exchanges a bearer token for a verified
//! [`Principal`] or a typed failure. Production wires in an HTTP client for
//! the identity service; tests wire in stubs.
//!
//! The gateway makes no retry guarantee and attaches no retry policy —
//! callers (the [`SessionStore`](crate::SessionStore)) decide what a
//! failure means.

use std::future::Future;

use crate::{GatewayError, Principal};

/// Exchanges a locally cached credential for a verified identity.
///
/// Returns `impl Future + Send` rather than using a plain `async fn` so
/// implementations can be held by spawned tasks.
///
/// # Example
///
/// ```rust
/// use classline_protocol::{Role, UserId};
/// use classline_session::{GatewayError, IdentityGateway, Principal};
///
/// /// Accepts one hard-coded token. Only for tests!
/// struct StubGateway;
///
/// impl IdentityGateway for StubGateway {
///     async fn verify(
///         &self,
///         token: &str,
///     ) -> Result<Principal, GatewayError> {
///         if token != "valid-token" {
///             return Err(GatewayError::Unauthorized);
///         }
///         Ok(Principal {
///             id: UserId::new("u-1"),
///             display_name: "Ada".into(),
///             role: Role::Student,
///             email: "ada@example.com".into(),
///         })
///     }
/// }
/// ```
pub trait IdentityGateway: Send + Sync + 'static {
    /// Validates the given bearer token and returns the verified identity.
    ///
    /// # Errors
    /// - [`GatewayError::Unauthorized`] — the token is invalid or expired
    /// - [`GatewayError::Network`] — the authority was unreachable
    /// - [`GatewayError::MalformedResponse`] — the authority answered
    ///   with something this client can't interpret
    fn verify(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Principal, GatewayError>> + Send;
}
