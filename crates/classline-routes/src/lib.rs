//! Route declarations and the navigation guard for Classline.
//!
//! Every route carries a declarative access tag; the guard is a pure
//! function from `(route, session)` to a decision. There is no hidden
//! timing dependency: calling the guard before session hydration has
//! finished simply sees an anonymous session and redirects to login,
//! preserving the requested path so navigation can resume afterwards.

use classline_protocol::Role;
use classline_session::Session;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Route declarations
// ---------------------------------------------------------------------------

/// The access requirement a route declares.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RouteAccess {
    /// Reachable by anyone.
    #[default]
    Public,
    /// Reachable only with an authenticated session.
    RequiresAuth,
    /// Reachable only without one (login, registration).
    RequiresGuest,
}

/// A single route declaration.
///
/// `roles` further restricts a [`RouteAccess::RequiresAuth`] route to a
/// set of roles (e.g. the parent dashboard). Empty means any role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// The route path, e.g. `"/courses"`.
    pub path: String,
    /// The declared access requirement.
    pub access: RouteAccess,
    /// Roles allowed on this route. Empty = no role restriction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
}

impl Route {
    /// Declares a route with the given access tag and no role restriction.
    pub fn new(path: impl Into<String>, access: RouteAccess) -> Self {
        Self {
            path: path.into(),
            access,
            roles: Vec::new(),
        }
    }

    /// Restricts the route to the given roles.
    pub fn with_roles(mut self, roles: impl Into<Vec<Role>>) -> Self {
        self.roles = roles.into();
        self
    }
}

/// An ordered set of route declarations with exact-path lookup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Creates a table from a list of declarations.
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Finds the declaration for an exact path, if any.
    ///
    /// Unknown paths return `None`; what to render for those (a 404
    /// page, usually) is the view layer's business, not the guard's.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// All declared routes, in declaration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

/// The outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Proceed to the requested route.
    Allow,
    /// Go elsewhere instead.
    Redirect {
        /// Where to go.
        to: String,
        /// The originally requested path, when it should be resumed
        /// after a successful login.
        resume: Option<String>,
    },
    /// Stay put — the session's role may not enter this route.
    Deny,
}

/// Evaluates route access against a session snapshot.
///
/// Holds the two well-known paths navigation falls back to; everything
/// else about [`decide`](Self::decide) is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    /// Where unauthenticated users are sent for auth-required routes.
    pub login_path: String,
    /// The default landing route for authenticated users.
    pub home_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            home_path: "/courses".to_string(),
        }
    }
}

impl RouteGuard {
    /// Decides whether navigation to `route` may proceed.
    ///
    /// - Auth-required route, anonymous session → redirect to the login
    ///   path, carrying the requested path for resumption.
    /// - Auth-required route, authenticated session with a role outside
    ///   the route's role set → [`GuardDecision::Deny`].
    /// - Guest-required route, authenticated session → redirect to the
    ///   landing route (unless the target already is the landing route).
    /// - Anything else → allow.
    pub fn decide(&self, route: &Route, session: &Session) -> GuardDecision {
        match route.access {
            RouteAccess::RequiresAuth => {
                if !session.is_authenticated() {
                    tracing::debug!(
                        path = %route.path,
                        "unauthenticated, redirecting to login"
                    );
                    return GuardDecision::Redirect {
                        to: self.login_path.clone(),
                        resume: Some(route.path.clone()),
                    };
                }
                if !route.roles.is_empty()
                    && !route.roles.contains(&session.role())
                {
                    tracing::debug!(
                        path = %route.path,
                        role = %session.role(),
                        "role not permitted on route"
                    );
                    return GuardDecision::Deny;
                }
                GuardDecision::Allow
            }
            RouteAccess::RequiresGuest => {
                if session.is_authenticated() && route.path != self.home_path
                {
                    return GuardDecision::Redirect {
                        to: self.home_path.clone(),
                        resume: None,
                    };
                }
                GuardDecision::Allow
            }
            RouteAccess::Public => GuardDecision::Allow,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
