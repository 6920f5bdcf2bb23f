//! Protocol types for Classline's message relay.
//!
//! This crate defines everything that travels on the wire between a
//! Classline client and the relay endpoint, plus the identity types
//! shared by the session and messaging layers.
//!
//! # Feature Flags
//!
//! - `json` (default) — [`JsonCodec`] via `serde_json`

mod codec;
mod error;
mod types;

#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use codec::Codec;
pub use error::ProtocolError;
pub use types::{Envelope, Role, UserId};
