//! Identity module: users and the permission catalog itself.

use crate::api::SuccessResponse;
use crate::authz::{AuthorizationDecision, DenyReason, Owned, PolicyBuilder, Requirement};
use crate::domain::{NavigationItem, PermissionDescriptor, TenantId, UiContext, UserId};
use crate::error::{AppError, Result};
use crate::middleware::Credential;
use crate::module::{ModuleDescriptor, Pipeline, ServiceCollection};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub const MODULE_ID: &str = "identity";
pub const USERS_READ: &str = "identity:users:read";
pub const USERS_WRITE: &str = "identity:users:write";
pub const PERMISSIONS_READ: &str = "identity:permissions:read";
pub const PROFILE_READ: &str = "identity:profile:read";
/// Users may read their own profile; `identity:users:read` reads anyone's.
pub const PROFILE_POLICY: &str = "identity.profile-owner";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub tenant_id: Option<TenantId>,
}

impl Owned for UserProfile {
    fn owner_id(&self) -> Option<&UserId> {
        Some(&self.id)
    }
}

/// Lookup of user profiles. The store behind it is external.
pub trait UserDirectory: Send + Sync {
    fn find(&self, id: &str) -> Option<UserProfile>;
}

/// Process-local directory
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryUserDirectory {
    pub fn insert(&self, profile: UserProfile) {
        let mut users = self
            .users
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        users.insert(profile.id.to_string(), profile);
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find(&self, id: &str) -> Option<UserProfile> {
        self.users
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

#[derive(Debug, Default)]
pub struct IdentityModule {
    directory: Arc<InMemoryUserDirectory>,
}

impl IdentityModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserProfile>) -> Self {
        let module = Self::default();
        for user in users {
            module.directory.insert(user);
        }
        module
    }
}

impl ModuleDescriptor for IdentityModule {
    fn id(&self) -> &str {
        MODULE_ID
    }

    fn display_name(&self) -> &str {
        "Identity"
    }

    fn register_services(&self, services: &mut ServiceCollection) -> anyhow::Result<()> {
        let directory: Arc<dyn UserDirectory> = self.directory.clone();
        services.add(directory)?;
        Ok(())
    }

    fn configure_pipeline(&self, pipeline: &mut Pipeline) -> anyhow::Result<()> {
        pipeline.merge(
            "identity-users",
            Router::new().route("/api/v1/users/{user_id}", get(get_user)),
        );
        Ok(())
    }

    fn configure_authorization(&self, policies: &mut PolicyBuilder) -> anyhow::Result<()> {
        policies.ownership(PROFILE_POLICY, [USERS_READ]);
        Ok(())
    }

    fn permissions(&self) -> Vec<PermissionDescriptor> {
        vec![
            PermissionDescriptor::new(USERS_READ, "View users", MODULE_ID)
                .default_roles(["admin"]),
            PermissionDescriptor::new(USERS_WRITE, "Manage users", MODULE_ID)
                .default_roles(["admin"])
                .sensitive(),
            PermissionDescriptor::new(PERMISSIONS_READ, "View permission catalog", MODULE_ID)
                .default_roles(["admin"]),
            PermissionDescriptor::new(PROFILE_READ, "View own profile", MODULE_ID)
                .default_roles(["admin", "member"])
                .self_data(),
        ]
    }

    fn navigation_items(&self) -> Vec<NavigationItem> {
        vec![
            NavigationItem::group("identity.admin", "Users & access", UiContext::Admin).order(90),
            NavigationItem::link("identity.users", "Users", "/admin/users", UiContext::Admin)
                .under("identity.admin")
                .order(10)
                .requires(USERS_READ),
            NavigationItem::link(
                "identity.permissions",
                "Permissions",
                "/admin/permissions",
                UiContext::Admin,
            )
            .under("identity.admin")
            .order(20)
            .requires(PERMISSIONS_READ),
            NavigationItem::link("identity.profile", "My profile", "/profile", UiContext::Operation)
                .order(100)
                .requires(PROFILE_READ),
        ]
    }
}

/// GET /api/v1/users/{user_id}
///
/// Callers who could not read the profile anyway get the same 403 whether
/// or not it exists.
async fn get_user(
    State(state): State<AppState>,
    credential: Credential,
    Path(user_id): Path<String>,
) -> Result<Json<SuccessResponse<UserProfile>>> {
    let snapshot = state.host.current();
    let directory = snapshot.services.require::<Arc<dyn UserDirectory>>()?;

    let Some(profile) = directory.find(&user_id) else {
        let is_self = credential
            .user_id()
            .is_some_and(|id| id.as_str() == user_id);
        if is_self
            || credential.has_permission(USERS_READ)
            || snapshot.engine.has_full_access(&credential)
        {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        return Err(AppError::Forbidden(
            DenyReason::InsufficientPermission.message().to_string(),
        ));
    };

    let requirement = Requirement::Ownership {
        policy: PROFILE_POLICY,
        resource: &profile,
    };
    let decision = match profile.tenant_id.as_ref() {
        Some(tenant) => snapshot
            .engine
            .authorize(&credential, requirement, Some(tenant.as_str())),
        // Profiles outside any tenant are reachable with full access only
        None if snapshot.engine.has_full_access(&credential) => {
            snapshot.engine.authorize(&credential, requirement, None)
        }
        None => AuthorizationDecision::deny(DenyReason::TenantMismatch),
    };
    decision.into_result()?;

    Ok(Json(SuccessResponse::new(profile)))
}
