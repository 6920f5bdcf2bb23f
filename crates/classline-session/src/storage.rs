//! Durable credential storage.
//!
//! The persisted credential lives in a key/value surface outside process
//! memory (the browser's local storage in the original client). The
//! [`SessionStore`](crate::SessionStore) is the only component permitted
//! to write these keys.

use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed key for the persisted bearer token.
pub const TOKEN_KEY: &str = "token";

/// Fixed key for the email associated with the token.
pub const EMAIL_KEY: &str = "email";

/// A bearer token plus the email it was issued for.
///
/// Existence of a persisted credential does not imply validity — it must
/// be revalidated through the identity gateway before the session is
/// marked authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque bearer token.
    pub token: String,
    /// The account email.
    pub email: String,
}

/// A durable key/value surface for the persisted credential.
///
/// The operations are synchronous on purpose: logout must clear the keys
/// before it returns, and the backing stores this models (local storage,
/// a settings file) are synchronous too.
pub trait CredentialStorage: Send + Sync + 'static {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);

    /// Removes `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str);
}

/// An in-memory [`CredentialStorage`], used by tests and by hosts that
/// have no durable surface to offer.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("storage lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("storage lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .expect("storage lock poisoned")
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key_returns_none() {
        let storage = MemoryStorage::new();
        assert!(storage.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "abc");
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("abc"));
    }

    #[test]
    fn test_set_replaces_previous_value() {
        let storage = MemoryStorage::new();
        storage.set(EMAIL_KEY, "old@example.com");
        storage.set(EMAIL_KEY, "new@example.com");
        assert_eq!(
            storage.get(EMAIL_KEY).as_deref(),
            Some("new@example.com")
        );
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let storage = MemoryStorage::new();
        storage.remove(TOKEN_KEY);
        assert!(storage.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_remove_deletes_value() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "abc");
        storage.remove(TOKEN_KEY);
        assert!(storage.get(TOKEN_KEY).is_none());
    }
}
