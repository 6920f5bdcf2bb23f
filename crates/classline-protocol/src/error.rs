//! Error types for the protocol layer.
//!
//! Each crate in Classline defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in serialization, not in
//! networking or session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed. Common causes: malformed JSON, missing
    /// required fields, wrong data types, truncated messages.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message is invalid at the protocol level — it deserialized
    /// fine but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
