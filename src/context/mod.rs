//! Credential context resolution.
//!
//! The credential has already been validated upstream (signature, expiry,
//! issuer, audience). This module only turns its claims into a typed,
//! request-scoped [`CredentialContext`]. Tenant identity comes from the
//! credential and nothing else.

use crate::config::CredentialConfig;
use crate::domain::{TenantId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Flat claim map: claim name to one or more string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawClaims(BTreeMap<String, Vec<String>>);

impl RawClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a claim name
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_all<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// First value of a single-valued claim
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten a decoded JSON claim object.
    ///
    /// Scalars become a single value, arrays of scalars become repeated
    /// values. Nested objects and nulls are dropped.
    pub fn from_json(claims: &serde_json::Map<String, Value>) -> Self {
        let mut out = BTreeMap::new();
        for (name, value) in claims {
            let values: Vec<String> = match value {
                Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
                other => scalar_to_string(other).into_iter().collect(),
            };
            if !values.is_empty() {
                out.insert(name.clone(), values);
            }
        }
        Self(out)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Identity, tenant, and grants of the current caller.
///
/// Built once per request and shared read-only; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialContext {
    user_id: Option<UserId>,
    tenant_id: Option<TenantId>,
    locale: String,
    timezone: String,
    granted_permissions: HashSet<String>,
    roles: HashSet<String>,
}

impl CredentialContext {
    pub fn new(user_id: Option<UserId>, tenant_id: Option<TenantId>) -> Self {
        let defaults = CredentialConfig::default();
        Self {
            user_id,
            tenant_id,
            locale: defaults.default_locale,
            timezone: defaults.default_timezone,
            granted_permissions: HashSet::new(),
            roles: HashSet::new(),
        }
    }

    /// Context with no identity, no tenant, and no grants
    pub fn anonymous() -> Self {
        Self::new(None, None)
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.granted_permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>, timezone: impl Into<String>) -> Self {
        self.locale = locale.into();
        self.timezone = timezone.into();
        self
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn granted_permissions(&self) -> &HashSet<String> {
        &self.granted_permissions
    }

    pub fn roles(&self) -> &HashSet<String> {
        &self.roles
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.granted_permissions.contains(permission)
    }

    pub fn has_any_permission<'a, I>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        permissions.into_iter().any(|p| self.has_permission(p))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Builds [`CredentialContext`] values from validated claims.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    config: CredentialConfig,
}

impl CredentialResolver {
    pub fn new(config: CredentialConfig) -> Self {
        Self { config }
    }

    /// Resolve a context from claims; never fails.
    ///
    /// Missing or unparsable user/tenant claims resolve to `None`, missing
    /// permission and role claims to empty sets.
    pub fn resolve(&self, claims: &RawClaims) -> CredentialContext {
        let user_id = claims
            .first(&self.config.user_id_claim)
            .and_then(UserId::parse);
        let tenant_id = claims
            .first(&self.config.tenant_id_claim)
            .and_then(TenantId::parse);

        let locale = claims
            .first(&self.config.locale_claim)
            .map(str::trim)
            .filter(|l| LOCALE_REGEX.is_match(l))
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_locale.clone());
        let timezone = claims
            .first(&self.config.timezone_claim)
            .map(str::trim)
            .filter(|tz| TIMEZONE_REGEX.is_match(tz))
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_timezone.clone());

        CredentialContext {
            user_id,
            tenant_id,
            locale,
            timezone,
            granted_permissions: collect_set(claims.values(&self.config.permissions_claim)),
            roles: collect_set(claims.values(&self.config.roles_claim)),
        }
    }
}

fn collect_set(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

lazy_static::lazy_static! {
    static ref LOCALE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").unwrap();
    static ref TIMEZONE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z][A-Za-z_]*(/[A-Za-z0-9_+\-]+)*$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver() -> CredentialResolver {
        CredentialResolver::new(CredentialConfig::default())
    }

    #[test]
    fn test_resolve_full_claims() {
        let claims = RawClaims::new()
            .with("sub", "user-1")
            .with("tenant_id", "T1")
            .with("locale", "de-DE")
            .with("zoneinfo", "Europe/Berlin")
            .with_all("permissions", ["sales:invoices:read", "sales:invoices:write"])
            .with_all("roles", ["member"]);

        let ctx = resolver().resolve(&claims);

        assert_eq!(ctx.user_id().unwrap().as_str(), "user-1");
        assert_eq!(ctx.tenant_id().unwrap().as_str(), "T1");
        assert_eq!(ctx.locale(), "de-DE");
        assert_eq!(ctx.timezone(), "Europe/Berlin");
        assert!(ctx.has_permission("sales:invoices:write"));
        assert!(!ctx.has_permission("sales:invoices:delete"));
        assert!(ctx.has_role("member"));
    }

    #[test]
    fn test_missing_fields_degrade_to_defaults() {
        let ctx = resolver().resolve(&RawClaims::new());

        assert!(ctx.user_id().is_none());
        assert!(ctx.tenant_id().is_none());
        assert_eq!(ctx.locale(), "en-US");
        assert_eq!(ctx.timezone(), "UTC");
        assert!(ctx.granted_permissions().is_empty());
        assert!(ctx.roles().is_empty());
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn test_unparsable_identifiers_resolve_to_none() {
        let claims = RawClaims::new().with("sub", "   ").with("tenant_id", "T 1");
        let ctx = resolver().resolve(&claims);

        assert!(ctx.user_id().is_none());
        assert!(ctx.tenant_id().is_none());
    }

    #[test]
    fn test_invalid_locale_and_timezone_fall_back() {
        let claims = RawClaims::new()
            .with("locale", "<script>")
            .with("zoneinfo", "../etc/passwd");
        let ctx = resolver().resolve(&claims);

        assert_eq!(ctx.locale(), "en-US");
        assert_eq!(ctx.timezone(), "UTC");
    }

    #[test]
    fn test_duplicate_and_blank_permissions_collapse() {
        let claims = RawClaims::new().with_all(
            "permissions",
            ["sales:invoices:read", " sales:invoices:read ", ""],
        );
        let ctx = resolver().resolve(&claims);
        assert_eq!(ctx.granted_permissions().len(), 1);
    }

    #[test]
    fn test_custom_claim_names() {
        let config = CredentialConfig {
            tenant_id_claim: "org".to_string(),
            permissions_claim: "scp".to_string(),
            ..CredentialConfig::default()
        };
        let claims = RawClaims::new()
            .with("org", "acme")
            .with("tenant_id", "ignored")
            .with("scp", "sales:invoices:read");
        let ctx = CredentialResolver::new(config).resolve(&claims);

        assert_eq!(ctx.tenant_id().unwrap().as_str(), "acme");
        assert!(ctx.has_permission("sales:invoices:read"));
    }

    #[test]
    fn test_from_json_flattens_values() {
        let value = json!({
            "sub": "user-1",
            "exp": 1700000000,
            "email_verified": true,
            "permissions": ["a:b:c", "d:e:f", 7, null, {"x": 1}],
            "address": {"city": "Berlin"},
            "nickname": null
        });
        let claims = RawClaims::from_json(value.as_object().unwrap());

        assert_eq!(claims.first("sub"), Some("user-1"));
        assert_eq!(claims.first("exp"), Some("1700000000"));
        assert_eq!(claims.first("email_verified"), Some("true"));
        assert_eq!(claims.values("permissions"), &["a:b:c", "d:e:f", "7"]);
        assert!(claims.values("address").is_empty());
        assert!(claims.first("nickname").is_none());
    }

    #[test]
    fn test_has_any_permission() {
        let ctx = CredentialContext::anonymous().with_permissions(["sales:invoices:manage"]);
        assert!(ctx.has_any_permission(["sales:invoices:read", "sales:invoices:manage"]));
        assert!(!ctx.has_any_permission(["sales:invoices:read"]));
    }
}
