//! Session types: the data structures that represent login state.

use classline_protocol::{Role, UserId};

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// A verified identity record, as returned by the identity authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// The user's unique id.
    pub id: UserId,
    /// Human-readable display name.
    pub display_name: String,
    /// The user's platform role.
    pub role: Role,
    /// The email the credential was issued for.
    pub email: String,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A snapshot of the client's login state.
///
/// The fields are private and the only constructors are
/// [`Session::anonymous`] and [`Session::authenticated`], so the invariant
/// "`is_authenticated` implies an identity is present" cannot be violated
/// by construction. `is_authenticated` is stored redundantly rather than
/// derived on every read so that a snapshot taken mid-hydration is still a
/// single consistent value.
///
/// Sessions are handed out by value from
/// [`SessionStore::snapshot`](crate::SessionStore::snapshot) — holding one
/// never aliases live store state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Option<Principal>,
    is_authenticated: bool,
    role: Role,
}

impl Session {
    /// The logged-out session: no identity, no role.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            is_authenticated: false,
            role: Role::Unset,
        }
    }

    /// A fully populated, authenticated session.
    pub fn authenticated(principal: Principal) -> Self {
        let role = principal.role;
        Self {
            identity: Some(principal),
            is_authenticated: true,
            role,
        }
    }

    /// The verified identity, present iff authenticated.
    pub fn identity(&self) -> Option<&Principal> {
        self.identity.as_ref()
    }

    /// Whether the session is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// The session's role (`Role::Unset` when anonymous).
    pub fn role(&self) -> Role {
        self.role
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}
