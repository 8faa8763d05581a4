//! Authorization decision engine.
//!
//! Two decision modes share one result type:
//! - plain permission checks, decided by set membership
//! - ownership-aware checks, decided by a named guard chain
//!
//! The tenant boundary check is independent and must pass as well when a
//! route addresses a tenant.

pub mod guard;
pub mod policy;
pub mod tenant;

pub use guard::{
    ElevatedPermissionGuard, Guard, GuardInput, GuardOutcome, OwnershipGuard, RoleGuard,
    SuperAdminGuard,
};
pub use policy::{OwnershipPolicy, PolicyBuilder, PolicySet};
pub use tenant::TenantBoundaryGuard;

use crate::context::CredentialContext;
use crate::domain::UserId;
use crate::error::AppError;
use crate::telemetry::metrics::record_authz_decision;
use serde::Serialize;

/// Guard that produced a decision. `None` on deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedGuard {
    SuperAdmin,
    Ownership,
    ElevatedPermission,
    RbacPermission,
    TenantBoundary,
    None,
}

impl MatchedGuard {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchedGuard::SuperAdmin => "super_admin",
            MatchedGuard::Ownership => "ownership",
            MatchedGuard::ElevatedPermission => "elevated_permission",
            MatchedGuard::RbacPermission => "rbac_permission",
            MatchedGuard::TenantBoundary => "tenant_boundary",
            MatchedGuard::None => "none",
        }
    }
}

/// Coarse reason attached to a deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    InsufficientPermission,
    TenantMismatch,
    MissingTenantContext,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::InsufficientPermission => "insufficient permission",
            DenyReason::TenantMismatch => "tenant mismatch",
            DenyReason::MissingTenantContext => "no tenant context",
        }
    }
}

/// Outcome of one authorization evaluation. Never cached across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub matched_guard: MatchedGuard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl AuthorizationDecision {
    pub fn allow(guard: MatchedGuard) -> Self {
        Self {
            allowed: true,
            matched_guard: guard,
            reason: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            matched_guard: MatchedGuard::None,
            reason: Some(reason),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Map a deny onto a 403 carrying only the coarse reason.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.allowed {
            return Ok(());
        }
        let reason = self.reason.unwrap_or(DenyReason::InsufficientPermission);
        Err(AppError::Forbidden(reason.message().to_string()))
    }
}

/// Resources that record an owner.
pub trait Owned {
    fn owner_id(&self) -> Option<&UserId>;
}

/// Pairs an arbitrary resource with its owner for a single check.
#[derive(Debug, Clone)]
pub struct OwnershipClaim<T> {
    pub resource: T,
    pub owner_id: Option<UserId>,
}

impl<T> OwnershipClaim<T> {
    pub fn new(resource: T, owner_id: Option<UserId>) -> Self {
        Self { resource, owner_id }
    }
}

impl<T> Owned for OwnershipClaim<T> {
    fn owner_id(&self) -> Option<&UserId> {
        self.owner_id.as_ref()
    }
}

/// What a protected operation requires.
#[derive(Clone, Copy)]
pub enum Requirement<'a> {
    Permission(&'a str),
    Ownership {
        policy: &'a str,
        resource: &'a dyn Owned,
    },
}

/// Decides allow/deny for credential contexts. Built once per activation.
#[derive(Debug, Clone)]
pub struct AuthorizationEngine {
    super_admin: SuperAdminGuard,
    tenant_guard: TenantBoundaryGuard,
    policies: PolicySet,
}

impl AuthorizationEngine {
    pub fn new(full_access_permission: impl Into<String>, policies: PolicySet) -> Self {
        let full_access_permission = full_access_permission.into();
        Self {
            super_admin: SuperAdminGuard::new(full_access_permission.clone()),
            tenant_guard: TenantBoundaryGuard::new(full_access_permission),
            policies,
        }
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn has_full_access(&self, context: &CredentialContext) -> bool {
        self.super_admin.holds_full_access(context)
    }

    /// Plain permission check.
    pub fn check_permission(
        &self,
        context: &CredentialContext,
        permission: &str,
    ) -> AuthorizationDecision {
        let decision = if context.has_permission(permission) {
            AuthorizationDecision::allow(MatchedGuard::RbacPermission)
        } else if self.has_full_access(context) {
            AuthorizationDecision::allow(MatchedGuard::SuperAdmin)
        } else {
            AuthorizationDecision::deny(DenyReason::InsufficientPermission)
        };

        if !decision.allowed {
            tracing::debug!(
                user_id = ?context.user_id(),
                permission,
                "Permission check denied"
            );
        }
        record_authz_decision("permission", &decision);
        decision
    }

    /// Ownership-aware check through a named policy's guard chain.
    ///
    /// Guards run in chain order and the first allow wins. The result is a
    /// deny only when every guard abstains. An unknown policy denies.
    pub fn check_ownership(
        &self,
        context: &CredentialContext,
        policy: &str,
        resource: &dyn Owned,
    ) -> AuthorizationDecision {
        let Some(chain) = self.policies.get(policy) else {
            tracing::warn!(policy, "Ownership check against unknown policy");
            let decision = AuthorizationDecision::deny(DenyReason::InsufficientPermission);
            record_authz_decision("ownership", &decision);
            return decision;
        };

        let input = GuardInput {
            context,
            resource_owner: resource.owner_id(),
            policy,
        };

        let decision = chain
            .chain()
            .iter()
            .find_map(|guard| match guard.evaluate(&input) {
                GuardOutcome::Allow(matched) => Some(AuthorizationDecision::allow(matched)),
                GuardOutcome::Abstain => None,
            })
            .unwrap_or_else(|| {
                tracing::debug!(
                    user_id = ?context.user_id(),
                    policy,
                    guards = ?chain.guard_names(),
                    "All guards abstained"
                );
                AuthorizationDecision::deny(DenyReason::InsufficientPermission)
            });

        record_authz_decision("ownership", &decision);
        decision
    }

    /// Compare a route's tenant identifier with the caller's tenant.
    pub fn check_tenant_boundary(
        &self,
        context: &CredentialContext,
        route_tenant_id: &str,
    ) -> AuthorizationDecision {
        let decision = self.tenant_guard.check(context, route_tenant_id);
        if !decision.allowed {
            tracing::debug!(
                user_id = ?context.user_id(),
                tenant_id = ?context.tenant_id(),
                route_tenant_id,
                "Tenant boundary denied"
            );
        }
        record_authz_decision("tenant", &decision);
        decision
    }

    /// Permission (or ownership) check plus the tenant boundary when the
    /// route carries a tenant. Both must allow.
    pub fn authorize(
        &self,
        context: &CredentialContext,
        requirement: Requirement<'_>,
        route_tenant_id: Option<&str>,
    ) -> AuthorizationDecision {
        let decision = match requirement {
            Requirement::Permission(permission) => self.check_permission(context, permission),
            Requirement::Ownership { policy, resource } => {
                self.check_ownership(context, policy, resource)
            }
        };
        if !decision.allowed {
            return decision;
        }

        match route_tenant_id {
            Some(tenant) => {
                let boundary = self.check_tenant_boundary(context, tenant);
                if boundary.allowed {
                    decision
                } else {
                    boundary
                }
            }
            None => decision,
        }
    }
}
