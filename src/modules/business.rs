//! Business module: the tenant-scoped business profile.

use super::identity;
use crate::api::SuccessResponse;
use crate::authz::Requirement;
use crate::domain::{NavigationItem, PermissionDescriptor, UiContext};
use crate::error::{AppError, Result};
use crate::middleware::TenantScope;
use crate::module::{ModuleDescriptor, Pipeline, ServiceCollection};
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const MODULE_ID: &str = "business";
pub const BUSINESSES_READ: &str = "business:businesses:read";
pub const BUSINESSES_WRITE: &str = "business:businesses:write";

/// A business is the tenant: its id is the credential's tenant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub currency: String,
}

pub trait BusinessDirectory: Send + Sync {
    fn find(&self, id: &str) -> Option<Business>;
}

#[derive(Debug, Default)]
pub struct InMemoryBusinessDirectory {
    businesses: RwLock<HashMap<String, Business>>,
}

impl InMemoryBusinessDirectory {
    pub fn insert(&self, business: Business) {
        self.businesses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(business.id.clone(), business);
    }
}

impl BusinessDirectory for InMemoryBusinessDirectory {
    fn find(&self, id: &str) -> Option<Business> {
        self.businesses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

#[derive(Debug, Default)]
pub struct BusinessModule {
    directory: Arc<InMemoryBusinessDirectory>,
}

impl BusinessModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_businesses(businesses: impl IntoIterator<Item = Business>) -> Self {
        let module = Self::default();
        for business in businesses {
            module.directory.insert(business);
        }
        module
    }
}

impl ModuleDescriptor for BusinessModule {
    fn id(&self) -> &str {
        MODULE_ID
    }

    fn display_name(&self) -> &str {
        "Business"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![identity::MODULE_ID.to_string()]
    }

    fn register_services(&self, services: &mut ServiceCollection) -> anyhow::Result<()> {
        let directory: Arc<dyn BusinessDirectory> = self.directory.clone();
        services.add(directory)?;
        Ok(())
    }

    fn configure_pipeline(&self, pipeline: &mut Pipeline) -> anyhow::Result<()> {
        pipeline.merge_tenant_scoped(
            "business-profile",
            Router::new().route("/api/v1/businesses/{business_id}", get(get_business)),
        );
        Ok(())
    }

    fn permissions(&self) -> Vec<PermissionDescriptor> {
        vec![
            PermissionDescriptor::new(BUSINESSES_READ, "View business profile", MODULE_ID)
                .default_roles(["admin", "member", "accountant"]),
            PermissionDescriptor::new(BUSINESSES_WRITE, "Edit business profile", MODULE_ID)
                .default_roles(["admin"])
                .sensitive(),
        ]
    }

    fn navigation_items(&self) -> Vec<NavigationItem> {
        vec![
            NavigationItem::link("business.overview", "Overview", "/", UiContext::Operation)
                .order(0)
                .requires(BUSINESSES_READ),
            NavigationItem::link(
                "business.settings",
                "Business settings",
                "/admin/business",
                UiContext::Admin,
            )
            .order(10)
            .requires(BUSINESSES_WRITE),
        ]
    }
}

/// GET /api/v1/businesses/{business_id}
async fn get_business(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<SuccessResponse<Business>>> {
    let snapshot = state.host.current();
    snapshot
        .engine
        .authorize(
            &scope.credential,
            Requirement::Permission(BUSINESSES_READ),
            Some(&scope.tenant_id),
        )
        .into_result()?;

    let directory = snapshot.services.require::<Arc<dyn BusinessDirectory>>()?;
    let business = directory
        .find(&scope.tenant_id)
        .ok_or_else(|| AppError::NotFound(format!("Business {} not found", scope.tenant_id)))?;

    Ok(Json(SuccessResponse::new(business)))
}
