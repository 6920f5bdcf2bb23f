//! The session store: the single owner of login state.
//!
//! Every other component reads login state through by-value snapshots of
//! this store; `hydrate`, `login`, and `logout` are the only mutation
//! points in the whole client.
//!
//! # Concurrency note
//!
//! `SessionStore` is NOT thread-safe by itself — mutation goes through
//! `&mut self`. This is intentional: the store is owned by a single task
//! (the client's main loop) and accessed through a channel or mutex at a
//! higher level, which keeps the commit points serialized without hidden
//! locking here.

use crate::{
    Credential, CredentialStorage, EMAIL_KEY, IdentityGateway, Principal,
    Session, TOKEN_KEY,
};

/// Process-wide authoritative login state.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ hydrate() ──→ [authenticated]
///   │            │              │
///   │            ▼ (any failure)│ logout()
///   │       [anonymous] ◀───────┘
///   │            ▲
///   └── login() ─┘ (from a login form, after the authority accepts)
/// ```
///
/// Failures never escape: a rejected or unreachable identity authority
/// leaves the store anonymous with the stale credential removed.
pub struct SessionStore<G, S> {
    gateway: G,
    storage: S,
    session: Session,
}

impl<G: IdentityGateway, S: CredentialStorage> SessionStore<G, S> {
    /// Creates a store in the anonymous state.
    ///
    /// Call [`hydrate`](Self::hydrate) afterwards to resume a persisted
    /// login; until it completes, snapshots read as anonymous, which is
    /// exactly what the route guard should see.
    pub fn new(gateway: G, storage: S) -> Self {
        Self {
            gateway,
            storage,
            session: Session::anonymous(),
        }
    }

    /// Attempts to resume the persisted login.
    ///
    /// Reads the stored token; if present, asks the gateway to verify it.
    /// Success commits the authenticated session. Any failure — rejected
    /// token, unreachable authority, malformed response — commits the
    /// anonymous session and removes the stored credential.
    ///
    /// Never fails from the caller's perspective.
    pub async fn hydrate(&mut self) {
        let Some(token) = self.storage.get(TOKEN_KEY) else {
            tracing::debug!("no persisted credential, staying anonymous");
            return;
        };

        match self.gateway.verify(&token).await {
            Ok(principal) => {
                tracing::info!(user = %principal.id, "session hydrated");
                self.session = Session::authenticated(principal);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "hydration failed, clearing session and credential"
                );
                self.clear();
            }
        }
    }

    /// Commits a fully populated session and persists the credential.
    ///
    /// Called after the identity authority has accepted a fresh login.
    /// The credential goes through the store because the store is the
    /// only writer of the storage keys. The commit is atomic from a
    /// reader's perspective: no snapshot can observe the new identity
    /// without `is_authenticated` set.
    pub fn login(&mut self, principal: Principal, credential: Credential) {
        self.storage.set(TOKEN_KEY, &credential.token);
        self.storage.set(EMAIL_KEY, &credential.email);
        tracing::info!(user = %principal.id, "logged in");
        self.session = Session::authenticated(principal);
    }

    /// Clears the in-memory session and the persisted credential.
    ///
    /// Synchronous — both storage keys are removed before this returns —
    /// and idempotent: a second call is a no-op.
    pub fn logout(&mut self) {
        if self.session.is_authenticated() {
            tracing::info!("logged out");
        }
        self.clear();
    }

    /// Returns the current session by value.
    ///
    /// Callers get a snapshot, not a live reference, so nothing outside
    /// the store can mutate shared state.
    pub fn snapshot(&self) -> Session {
        self.session.clone()
    }

    fn clear(&mut self) {
        self.session = Session::anonymous();
        self.storage.remove(TOKEN_KEY);
        self.storage.remove(EMAIL_KEY);
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionStore`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //!
    //! The gateway is stubbed with a scripted verdict so each failure
    //! path of the taxonomy (`Unauthorized`, `Network`,
    //! `MalformedResponse`) can be induced deterministically.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use classline_protocol::{Role, UserId};

    use super::*;
    use crate::{GatewayError, MemoryStorage};

    // -- Helpers ----------------------------------------------------------

    fn principal() -> Principal {
        Principal {
            id: UserId::new("u-1"),
            display_name: "Ada".into(),
            role: Role::Student,
            email: "ada@example.com".into(),
        }
    }

    fn credential() -> Credential {
        Credential {
            token: "tok-123".into(),
            email: "ada@example.com".into(),
        }
    }

    /// What the stub gateway should answer.
    #[derive(Clone, Copy)]
    enum Verdict {
        Accept,
        Unauthorized,
        Network,
        Malformed,
    }

    /// Scripted gateway that counts how often it was called.
    struct StubGateway {
        verdict: Verdict,
        calls: Arc<AtomicU32>,
    }

    impl StubGateway {
        fn new(verdict: Verdict) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    verdict,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl IdentityGateway for StubGateway {
        async fn verify(
            &self,
            _token: &str,
        ) -> Result<Principal, GatewayError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match self.verdict {
                Verdict::Accept => Ok(principal()),
                Verdict::Unauthorized => Err(GatewayError::Unauthorized),
                Verdict::Network => {
                    Err(GatewayError::Network("connection refused".into()))
                }
                Verdict::Malformed => Err(GatewayError::MalformedResponse(
                    "unexpected body".into(),
                )),
            }
        }
    }

    /// Builds a store whose storage already holds a credential.
    fn store_with_stored_credential(
        verdict: Verdict,
    ) -> (SessionStore<StubGateway, MemoryStorage>, Arc<AtomicU32>) {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "tok-123");
        storage.set(EMAIL_KEY, "ada@example.com");
        let (gateway, calls) = StubGateway::new(verdict);
        (SessionStore::new(gateway, storage), calls)
    }

    // =====================================================================
    // hydrate()
    // =====================================================================

    #[tokio::test]
    async fn test_hydrate_valid_credential_authenticates() {
        let (mut store, _) = store_with_stored_credential(Verdict::Accept);

        store.hydrate().await;

        let session = store.snapshot();
        assert!(session.is_authenticated());
        assert_eq!(
            session.identity().map(|p| p.id.clone()),
            Some(UserId::new("u-1"))
        );
        assert_eq!(session.role(), Role::Student);
    }

    #[tokio::test]
    async fn test_hydrate_no_credential_skips_gateway() {
        let (gateway, calls) = StubGateway::new(Verdict::Accept);
        let mut store = SessionStore::new(gateway, MemoryStorage::new());

        store.hydrate().await;

        assert!(!store.snapshot().is_authenticated());
        assert_eq!(calls.load(Ordering::Relaxed), 0, "gateway not consulted");
    }

    #[tokio::test]
    async fn test_hydrate_rejected_token_clears_session_and_credential() {
        let (mut store, _) =
            store_with_stored_credential(Verdict::Unauthorized);

        store.hydrate().await;

        let session = store.snapshot();
        assert!(!session.is_authenticated());
        assert!(session.identity().is_none());
        // The stale credential must be gone from both keys.
        assert!(store.storage.get(TOKEN_KEY).is_none());
        assert!(store.storage.get(EMAIL_KEY).is_none());
    }

    #[tokio::test]
    async fn test_hydrate_network_failure_absorbed_into_logged_out() {
        let (mut store, calls) =
            store_with_stored_credential(Verdict::Network);

        store.hydrate().await;

        assert!(!store.snapshot().is_authenticated());
        // Gateway failures are not retried by the store.
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_hydrate_malformed_response_treated_as_unauthorized() {
        let (mut store, _) =
            store_with_stored_credential(Verdict::Malformed);

        store.hydrate().await;

        assert!(!store.snapshot().is_authenticated());
        assert!(store.storage.get(TOKEN_KEY).is_none());
    }

    // =====================================================================
    // login() / logout()
    // =====================================================================

    #[tokio::test]
    async fn test_login_commits_session_and_persists_credential() {
        let (gateway, _) = StubGateway::new(Verdict::Accept);
        let mut store = SessionStore::new(gateway, MemoryStorage::new());

        store.login(principal(), credential());

        assert!(store.snapshot().is_authenticated());
        assert_eq!(store.storage.get(TOKEN_KEY).as_deref(), Some("tok-123"));
        assert_eq!(
            store.storage.get(EMAIL_KEY).as_deref(),
            Some("ada@example.com")
        );
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_both_keys() {
        let (gateway, _) = StubGateway::new(Verdict::Accept);
        let mut store = SessionStore::new(gateway, MemoryStorage::new());
        store.login(principal(), credential());

        store.logout();

        let session = store.snapshot();
        assert!(!session.is_authenticated());
        assert!(session.identity().is_none());
        assert_eq!(session.role(), Role::Unset);
        assert!(store.storage.get(TOKEN_KEY).is_none());
        assert!(store.storage.get(EMAIL_KEY).is_none());
    }

    #[tokio::test]
    async fn test_logout_twice_is_idempotent() {
        let (gateway, _) = StubGateway::new(Verdict::Accept);
        let mut store = SessionStore::new(gateway, MemoryStorage::new());
        store.login(principal(), credential());

        store.logout();
        let after_first = store.snapshot();
        store.logout();
        let after_second = store.snapshot();

        assert_eq!(after_first, after_second);
        assert!(store.storage.get(TOKEN_KEY).is_none());
        assert!(store.storage.get(EMAIL_KEY).is_none());
    }

    #[tokio::test]
    async fn test_login_after_logout_works_again() {
        let (gateway, _) = StubGateway::new(Verdict::Accept);
        let mut store = SessionStore::new(gateway, MemoryStorage::new());

        store.login(principal(), credential());
        store.logout();
        store.login(principal(), credential());

        assert!(store.snapshot().is_authenticated());
    }

    // =====================================================================
    // snapshot()
    // =====================================================================

    #[tokio::test]
    async fn test_snapshot_is_detached_from_later_commits() {
        let (gateway, _) = StubGateway::new(Verdict::Accept);
        let mut store = SessionStore::new(gateway, MemoryStorage::new());
        store.login(principal(), credential());

        let snapshot = store.snapshot();
        store.logout();

        // The earlier snapshot still shows the old state — it's a copy,
        // not a live view.
        assert!(snapshot.is_authenticated());
        assert!(!store.snapshot().is_authenticated());
    }
}
