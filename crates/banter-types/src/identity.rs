//! Caller identity passed to the backend on every request.
//!
//! Identity comes from an external provider; this type only guarantees it
//! is non-empty, so "absent" is always represented as `None`.

use serde::{Deserialize, Serialize};

use std::fmt;

/// A non-empty caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserIdentity(String);

impl UserIdentity {
    /// Returns `None` for empty or whitespace-only input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserIdentity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserIdentity::new(value).ok_or_else(|| "user identity must not be empty".to_string())
    }
}

impl From<UserIdentity> for String {
    fn from(identity: UserIdentity) -> Self {
        identity.0
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identity_rejected() {
        assert!(UserIdentity::new("").is_none());
        assert!(UserIdentity::new("   ").is_none());
    }

    #[test]
    fn test_identity_is_trimmed() {
        let id = UserIdentity::new("  user-42 ").unwrap();
        assert_eq!(id.as_str(), "user-42");
    }

    #[test]
    fn test_identity_serde_rejects_empty() {
        assert!(serde_json::from_str::<UserIdentity>("\"\"").is_err());
        let id: UserIdentity = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(id.to_string(), "alice");
    }
}
