//! Session state management for Classline.
//!
//! This crate answers "who is logged in" for the whole client:
//!
//! 1. **Identity verification** — exchanging a cached credential for a
//!    verified identity ([`IdentityGateway`] trait)
//! 2. **Session state** — the [`Session`] snapshot read by every other
//!    component, committed only through [`SessionStore`]
//! 3. **Credential persistence** — the durable key/value surface holding
//!    the bearer token between runs ([`CredentialStorage`] trait)
//!
//! # How it fits in the stack
//!
//! ```text
//! Route guard / views (above)  ← read session snapshots on every navigation
//!     ↕
//! Session layer (this crate)   ← owns login state and the stored credential
//!     ↕
//! Identity authority (remote)  ← reached only through IdentityGateway
//! ```

mod error;
mod gateway;
mod session;
mod storage;
mod store;

pub use error::GatewayError;
pub use gateway::IdentityGateway;
pub use session::{Principal, Session};
pub use storage::{
    Credential, CredentialStorage, EMAIL_KEY, MemoryStorage, TOKEN_KEY,
};
pub use store::SessionStore;
