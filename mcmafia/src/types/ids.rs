//! Identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a member within its group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Wrap an existing identifier
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for MemberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
