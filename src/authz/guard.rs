//! Guards: single rules in an authorization chain.
//!
//! A guard either allows or abstains. It never denies on its own; the
//! engine denies only when every guard in a chain has abstained.

use super::MatchedGuard;
use crate::context::CredentialContext;
use crate::domain::UserId;
use std::collections::BTreeSet;
use std::fmt;

/// Result of a single guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow(MatchedGuard),
    Abstain,
}

/// Everything a guard may look at.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub context: &'a CredentialContext,
    /// Recorded owner of the target resource, when known
    pub resource_owner: Option<&'a UserId>,
    /// Policy being evaluated
    pub policy: &'a str,
}

/// One rule in an ownership-aware chain.
pub trait Guard: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn evaluate(&self, input: &GuardInput<'_>) -> GuardOutcome;
}

impl fmt::Debug for dyn Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("name", &self.name()).finish()
    }
}

/// Allows callers holding the reserved full-access grant.
#[derive(Debug, Clone)]
pub struct SuperAdminGuard {
    full_access_permission: String,
}

impl SuperAdminGuard {
    pub fn new(full_access_permission: impl Into<String>) -> Self {
        Self {
            full_access_permission: full_access_permission.into(),
        }
    }

    pub fn holds_full_access(&self, context: &CredentialContext) -> bool {
        context.has_permission(&self.full_access_permission)
    }
}

impl Guard for SuperAdminGuard {
    fn name(&self) -> &str {
        "super_admin"
    }

    fn evaluate(&self, input: &GuardInput<'_>) -> GuardOutcome {
        if self.holds_full_access(input.context) {
            GuardOutcome::Allow(MatchedGuard::SuperAdmin)
        } else {
            GuardOutcome::Abstain
        }
    }
}

/// Allows the recorded owner of the resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipGuard;

impl Guard for OwnershipGuard {
    fn name(&self) -> &str {
        "ownership"
    }

    fn evaluate(&self, input: &GuardInput<'_>) -> GuardOutcome {
        match (input.context.user_id(), input.resource_owner) {
            (Some(caller), Some(owner)) if caller == owner => {
                GuardOutcome::Allow(MatchedGuard::Ownership)
            }
            _ => GuardOutcome::Abstain,
        }
    }
}

/// Allows callers holding any of the policy's elevated permissions.
#[derive(Debug, Clone, Default)]
pub struct ElevatedPermissionGuard {
    permissions: BTreeSet<String>,
}

impl ElevatedPermissionGuard {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }
}

impl Guard for ElevatedPermissionGuard {
    fn name(&self) -> &str {
        "elevated_permission"
    }

    fn evaluate(&self, input: &GuardInput<'_>) -> GuardOutcome {
        if input
            .context
            .has_any_permission(self.permissions.iter().map(String::as_str))
        {
            GuardOutcome::Allow(MatchedGuard::ElevatedPermission)
        } else {
            GuardOutcome::Abstain
        }
    }
}

/// Allows callers holding a role. Modules attach it to policies where a
/// role stands in for a permission (e.g. a tenant accountant).
#[derive(Debug, Clone)]
pub struct RoleGuard {
    role: String,
}

impl RoleGuard {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

impl Guard for RoleGuard {
    fn name(&self) -> &str {
        "role"
    }

    fn evaluate(&self, input: &GuardInput<'_>) -> GuardOutcome {
        if input.context.has_role(&self.role) {
            GuardOutcome::Allow(MatchedGuard::RbacPermission)
        } else {
            GuardOutcome::Abstain
        }
    }
}
