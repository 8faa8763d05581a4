//! Common identifier types for domain models

use serde::{Deserialize, Serialize};

const MAX_IDENTIFIER_LEN: usize = 128;

/// Parse an opaque identifier taken from a credential claim.
///
/// Returns `None` for blank, oversized, or control-character values so that
/// callers treat them as "no identity" rather than as a match candidate.
fn parse_identifier(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value.len() > MAX_IDENTIFIER_LEN {
        return None;
    }
    if value.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return None;
    }
    Some(value.to_string())
}

/// Caller identity as carried in the credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Option<Self> {
        parse_identifier(raw).map(UserId)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Tenant boundary identifier.
///
/// Compared by exact equality only; there is no prefix or hierarchy notion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(raw: &str) -> Option<Self> {
        parse_identifier(raw).map(TenantId)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against an identifier taken from a route.
    pub fn matches(&self, route_value: &str) -> bool {
        self.0 == route_value
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
