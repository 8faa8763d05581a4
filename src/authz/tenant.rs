//! Tenant boundary guard.
//!
//! Blocks horizontal escalation when a route addresses a tenant by
//! identifier. Runs in addition to permission checks, never instead of them.

use super::guard::SuperAdminGuard;
use super::{AuthorizationDecision, DenyReason, MatchedGuard};
use crate::context::CredentialContext;

#[derive(Debug, Clone)]
pub struct TenantBoundaryGuard {
    super_admin: SuperAdminGuard,
}

impl TenantBoundaryGuard {
    pub fn new(full_access_permission: impl Into<String>) -> Self {
        Self {
            super_admin: SuperAdminGuard::new(full_access_permission),
        }
    }

    /// Compare the route's tenant identifier with the credential's tenant.
    pub fn check(&self, context: &CredentialContext, route_tenant_id: &str) -> AuthorizationDecision {
        if self.super_admin.holds_full_access(context) {
            return AuthorizationDecision::allow(MatchedGuard::SuperAdmin);
        }

        match context.tenant_id() {
            None => AuthorizationDecision::deny(DenyReason::MissingTenantContext),
            Some(tenant) if tenant.matches(route_tenant_id) => {
                AuthorizationDecision::allow(MatchedGuard::TenantBoundary)
            }
            Some(_) => AuthorizationDecision::deny(DenyReason::TenantMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TenantId, UserId};

    fn guard() -> TenantBoundaryGuard {
        TenantBoundaryGuard::new("*")
    }

    fn tenant_user(tenant: &str) -> CredentialContext {
        CredentialContext::new(UserId::parse("u-1"), TenantId::parse(tenant))
    }

    #[test]
    fn test_same_tenant_allows() {
        let decision = guard().check(&tenant_user("T1"), "T1");
        assert!(decision.allowed);
        assert_eq!(decision.matched_guard, MatchedGuard::TenantBoundary);
    }

    #[test]
    fn test_other_tenant_denies() {
        let decision = guard().check(&tenant_user("T1"), "T2");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(DenyReason::TenantMismatch));
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        assert!(!guard().check(&tenant_user("T1"), "T10").allowed);
        assert!(!guard().check(&tenant_user("T10"), "T1").allowed);
    }

    #[test]
    fn test_missing_tenant_denies_even_with_permission() {
        let ctx = CredentialContext::new(UserId::parse("u-1"), None)
            .with_permissions(["business:businesses:read"]);
        let decision = guard().check(&ctx, "T1");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(DenyReason::MissingTenantContext));
    }

    #[test]
    fn test_full_access_bypasses() {
        let ctx = CredentialContext::new(UserId::parse("support"), None).with_permissions(["*"]);
        let decision = guard().check(&ctx, "T2");
        assert!(decision.allowed);
        assert_eq!(decision.matched_guard, MatchedGuard::SuperAdmin);
    }
}
