//! Identity types for relay sessions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::WireError;

/// One of the two fixed peer identities within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The initiating client. Only a desktop join can create a session.
    Desktop,
    /// The companion client. Joins a session a desktop already created.
    Mobile,
}

impl Role {
    /// The peer role on the other side of the session.
    pub fn opposite(self) -> Self {
        match self {
            Role::Desktop => Role::Mobile,
            Role::Mobile => Role::Desktop,
        }
    }

    /// Wire name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Desktop => "desktop",
            Role::Mobile => "mobile",
        }
    }
}

impl FromStr for Role {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(Role::Desktop),
            "mobile" => Ok(Role::Mobile),
            other => Err(WireError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, client-generated session identifier.
///
/// Anyone holding the token may join either role of the session, so the
/// `Debug` form only shows a prefix.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Create a token, rejecting the empty string.
    pub fn new(token: impl Into<String>) -> Result<Self, WireError> {
        let token = token.into();
        if token.is_empty() {
            return Err(WireError::EmptyToken);
        }
        Ok(Self(token))
    }

    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionToken {
    type Error = WireError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        if prefix.len() < self.0.len() {
            write!(f, "SessionToken({prefix}…)")
        } else {
            write!(f, "SessionToken({prefix})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_wire_names() {
        assert_eq!("desktop".parse::<Role>().unwrap(), Role::Desktop);
        assert_eq!("mobile".parse::<Role>().unwrap(), Role::Mobile);
    }

    #[test]
    fn role_parse_is_case_sensitive() {
        assert!("Desktop".parse::<Role>().is_err());
        assert!("tablet".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn role_opposite_is_involution() {
        assert_eq!(Role::Desktop.opposite(), Role::Mobile);
        assert_eq!(Role::Mobile.opposite().opposite(), Role::Mobile);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Mobile).unwrap(), "\"mobile\"");
    }

    #[test]
    fn empty_token_rejected() {
        assert!(matches!(SessionToken::new(""), Err(WireError::EmptyToken)));
        assert!(serde_json::from_str::<SessionToken>("\"\"").is_err());
    }

    #[test]
    fn token_debug_is_truncated() {
        let token = SessionToken::new("abcdefghijklmnop").unwrap();
        assert_eq!(format!("{:?}", token), "SessionToken(abcdefgh…)");
        assert_eq!(token.to_string(), "abcdefghijklmnop");

        let short = SessionToken::new("abc").unwrap();
        assert_eq!(format!("{:?}", short), "SessionToken(abc)");
    }
}
