//! Core protocol types: identity, roles, and the message envelope.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user.
///
/// Newtype over the opaque string id issued by the identity authority.
/// `#[serde(transparent)]` makes it serialize as the bare string, which is
/// what the relay and the identity service both expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a `UserId` from any string-ish value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The role a user holds on the platform.
///
/// Roles decide which routes are reachable (e.g. the parent dashboard is
/// parent-only). `Unset` is the state of an anonymous session — a session
/// that has not been hydrated or whose credential was rejected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// No role known — anonymous or not yet hydrated.
    #[default]
    Unset,
    /// A student account.
    Student,
    /// A teacher account.
    Teacher,
    /// A parent account.
    Parent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Unset => "unset",
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level message wrapper. Every message on the wire is an Envelope.
///
/// The payload is opaque bytes — the transport and the channel layer route
/// envelopes without interpreting their content. `recipient_id` is `None`
/// for broadcast messages.
///
/// Fields are private on purpose: an envelope is immutable once
/// constructed. [`Envelope::new`] stamps `sent_at` at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Who sent this envelope.
    sender_id: UserId,

    /// Who should receive it. `None` means broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipient_id: Option<UserId>,

    /// Opaque message content.
    payload: Vec<u8>,

    /// Milliseconds since the Unix epoch at construction time.
    sent_at: u64,
}

impl Envelope {
    /// Constructs an envelope, stamping the send time.
    pub fn new(
        sender_id: UserId,
        recipient_id: Option<UserId>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            sender_id,
            recipient_id,
            payload,
            sent_at: now_millis(),
        }
    }

    /// Constructs an envelope addressed to a single recipient.
    pub fn direct(
        sender_id: UserId,
        recipient_id: UserId,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(sender_id, Some(recipient_id), payload)
    }

    /// Constructs a broadcast envelope (no recipient).
    pub fn broadcast(sender_id: UserId, payload: Vec<u8>) -> Self {
        Self::new(sender_id, None, payload)
    }

    /// The sender of this envelope.
    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    /// The recipient, or `None` for broadcast.
    pub fn recipient_id(&self) -> Option<&UserId> {
        self.recipient_id.as_ref()
    }

    /// The opaque payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Milliseconds since the Unix epoch when the envelope was built.
    pub fn sent_at(&self) -> u64 {
        self.sent_at
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// A clock before 1970 yields 0 rather than panicking.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Tests for protocol types and their JSON serialization.
    //!
    //! The relay protocol defines exact JSON shapes; these verify that the
    //! serde attributes produce them, because a mismatch means the relay
    //! can't parse our messages.

    use super::*;

    fn uid(id: &str) -> UserId {
        UserId::new(id)
    }

    // =====================================================================
    // UserId / Role
    // =====================================================================

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        // `#[serde(transparent)]` means UserId("u-7") → `"u-7"`, not
        // `{"0":"u-7"}`.
        let json = serde_json::to_string(&uid("u-7")).unwrap();
        assert_eq!(json, "\"u-7\"");
    }

    #[test]
    fn test_user_id_deserializes_from_plain_string() {
        let id: UserId = serde_json::from_str("\"u-7\"").unwrap();
        assert_eq!(id, uid("u-7"));
    }

    #[test]
    fn test_user_id_display_and_as_str() {
        let id = uid("alice");
        assert_eq!(id.to_string(), "alice");
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn test_user_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(uid("a"), 1);
        map.insert(uid("b"), 2);
        assert_eq!(map[&uid("a")], 1);
    }

    #[test]
    fn test_role_default_is_unset() {
        assert_eq!(Role::default(), Role::Unset);
    }

    #[test]
    fn test_role_serializes_as_lowercase() {
        let json = serde_json::to_string(&Role::Student).unwrap();
        assert_eq!(json, "\"student\"");
        let json = serde_json::to_string(&Role::Parent).unwrap();
        assert_eq!(json, "\"parent\"");
    }

    #[test]
    fn test_role_deserializes_from_lowercase() {
        let role: Role = serde_json::from_str("\"teacher\"").unwrap();
        assert_eq!(role, Role::Teacher);
    }

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_envelope_new_stamps_sent_at() {
        let env = Envelope::new(uid("a"), None, vec![1, 2]);
        assert!(env.sent_at() > 0, "sent_at should be stamped");
    }

    #[test]
    fn test_envelope_direct_sets_recipient() {
        let env = Envelope::direct(uid("a"), uid("b"), vec![]);
        assert_eq!(env.sender_id(), &uid("a"));
        assert_eq!(env.recipient_id(), Some(&uid("b")));
    }

    #[test]
    fn test_envelope_broadcast_has_no_recipient() {
        let env = Envelope::broadcast(uid("a"), vec![]);
        assert!(env.recipient_id().is_none());
    }

    #[test]
    fn test_envelope_round_trip() {
        let env = Envelope::direct(uid("a"), uid("b"), vec![10, 20, 30]);
        let bytes = serde_json::to_vec(&env).unwrap();
        let decoded: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(env, decoded);
    }

    #[test]
    fn test_envelope_broadcast_omits_recipient_field() {
        // `skip_serializing_if` keeps broadcast envelopes free of a
        // `"recipient_id": null` field.
        let env = Envelope::broadcast(uid("a"), vec![1]);
        let json: serde_json::Value = serde_json::to_value(&env).unwrap();
        assert!(json.get("recipient_id").is_none());
    }

    #[test]
    fn test_envelope_missing_recipient_decodes_as_broadcast() {
        let json = r#"{
            "sender_id": "a",
            "payload": [1, 2],
            "sent_at": 100
        }"#;
        let env: Envelope = serde_json::from_str(json).unwrap();
        assert!(env.recipient_id().is_none());
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<Envelope, _> = serde_json::from_slice(garbage);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_wrong_shape_returns_error() {
        // Valid JSON but missing required fields.
        let wrong = r#"{"name": "hello"}"#;
        let result: Result<Envelope, _> = serde_json::from_str(wrong);
        assert!(result.is_err());
    }
}
