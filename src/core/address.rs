//! Player Addresses
//!
//! The identity collaborator (a wallet in production) hands us a stable,
//! externally verifiable address string. It is the only cross-player and
//! cross-session identifier: registry key, ledger key and wire identity.

use std::fmt;
use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Opaque player address.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an address supplied by the identity collaborator.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Derive a wallet-style address (`0x` + 40 hex chars) from an identity
    /// subject. Same subject, same address.
    pub fn from_subject(subject: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"arena-sync-address:");
        hasher.update(subject.as_bytes());
        let hash = hasher.finalize();
        Self(format!("0x{}", hex::encode(&hash[..20])))
    }

    /// Throwaway 10-character address for local testing without a wallet.
    pub fn random() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self(id[..10].to_string())
    }

    /// Borrow the raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for logs and default display names.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_derivation_is_stable() {
        let a = Address::from_subject("alice");
        let b = Address::from_subject("alice");
        let c = Address::from_subject("bob");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("0x"));
        assert_eq!(a.as_str().len(), 42);
    }

    #[test]
    fn test_random_addresses_differ() {
        let a = Address::random();
        let b = Address::random();
        assert_eq!(a.as_str().len(), 10);
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_form() {
        assert_eq!(Address::new("0x1234567890").short(), "0x123456");
        assert_eq!(Address::new("abc").short(), "abc");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Address::new("p1")).unwrap();
        assert_eq!(json, "\"p1\"");
    }
}
