//! The (user, organization) pair whose HubSpot credentials are managed

use std::fmt;

use crate::constants::PROVIDER;

/// Caller-supplied identity. Both halves are opaque; no format is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityPair {
    pub user_id: String,
    pub org_id: String,
}

impl IdentityPair {
    pub fn new(user_id: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: org_id.into(),
        }
    }

    /// Credential store key: `hubspot:<user_id>:<org_id>`
    pub fn credential_key(&self) -> String {
        format!("{PROVIDER}:{}:{}", self.user_id, self.org_id)
    }
}

impl fmt::Display for IdentityPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.org_id)
    }
}
