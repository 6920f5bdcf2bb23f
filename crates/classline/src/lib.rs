//! # Classline
//!
//! Client-side real-time core for the Classline education platform:
//! session state, navigation guarding, and a self-healing connection to
//! the messaging relay.
//!
//! The crate is the facade over four focused members:
//!
//! - `classline-protocol` — envelope types and wire codec
//! - `classline-transport` — connector/connection traits and the
//!   WebSocket transport
//! - `classline-session` — session store, identity gateway, credential
//!   storage
//! - `classline-routes` — route declarations and the navigation guard
//!
//! plus the two pieces that live here: the [`ConnectionManager`], which
//! owns the single relay connection and reconnects forever with bounded
//! backoff, and the [`MessageChannel`], which layers topic-filtered
//! subscribe/publish on top of it.
//!
//! ## Example
//!
//! ```no_run
//! use classline::{
//!     ConnectionManager, MessageChannel, ReconnectConfig, Topic, UserId,
//!     WebSocketConnector,
//! };
//!
//! # async fn run() -> Result<(), classline::ClasslineError> {
//! let manager = ConnectionManager::spawn(
//!     WebSocketConnector,
//!     ReconnectConfig::default(),
//! );
//! manager.connect("ws://relay.classline.example").await?;
//!
//! let channel = MessageChannel::attach(manager, UserId::new("alice"));
//! let mut inbox = channel.subscribe(Topic::Direct(UserId::new("alice"))).await;
//! channel.publish(Some(UserId::new("bob")), b"hi".to_vec()).await?;
//! if let Some(envelope) = inbox.recv().await {
//!     println!("from {}", envelope.sender_id());
//! }
//! # Ok(())
//! # }
//! ```

mod channel;
mod error;
mod manager;
mod retry;

pub use channel::{MessageChannel, Subscription, Topic};
pub use error::ClasslineError;
pub use manager::{ConnectionManager, ConnectionState, ConnectionStatus};
pub use retry::ReconnectConfig;

pub use classline_protocol::{
    Codec, Envelope, JsonCodec, ProtocolError, Role, UserId,
};
pub use classline_routes::{
    GuardDecision, Route, RouteAccess, RouteGuard, RouteTable,
};
pub use classline_session::{
    Credential, CredentialStorage, EMAIL_KEY, GatewayError, IdentityGateway,
    MemoryStorage, Principal, Session, SessionStore, TOKEN_KEY,
};
pub use classline_transport::{
    Connection, ConnectionId, Connector, TransportError,
};
#[cfg(feature = "websocket")]
pub use classline_transport::WebSocketConnector;
