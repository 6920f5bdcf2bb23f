//! Error types for the session layer.

/// Typed failures from the identity authority boundary.
///
/// The session store normalizes all of these into "logged out" — they
/// never propagate out of [`SessionStore::hydrate`](crate::SessionStore::hydrate).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The credential was rejected by the authority. Never retried
    /// automatically.
    #[error("credential rejected")]
    Unauthorized,

    /// The authority was unreachable or the request failed in transit.
    /// Transient, but the session store does not auto-retry — the user
    /// re-authenticates instead.
    #[error("network error: {0}")]
    Network(String),

    /// The authority answered, but with a response this client can't
    /// interpret. Treated exactly like `Unauthorized`.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
