//! Module, catalog, navigation, and caller introspection

use super::SuccessResponse;
use crate::catalog::NavigationNode;
use crate::domain::{PermissionDescriptor, UiContext};
use crate::error::{AppError, Result};
use crate::middleware::Credential;
use crate::module::{ModuleSummary, PipelineStage};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Permission required to read the full catalog
pub const CATALOG_READ_PERMISSION: &str = "identity:permissions:read";

#[derive(Debug, Serialize)]
pub struct ModulesResponse {
    pub generation: u64,
    pub activated_at: DateTime<Utc>,
    pub modules: Vec<ModuleSummary>,
    pub pipeline: Vec<PipelineStage>,
}

/// GET /api/v1/modules
pub async fn list_modules(
    State(state): State<AppState>,
    _credential: Credential,
) -> Json<SuccessResponse<ModulesResponse>> {
    let snapshot = state.host.current();
    Json(SuccessResponse::new(ModulesResponse {
        generation: snapshot.generation,
        activated_at: snapshot.activated_at,
        modules: snapshot.modules.clone(),
        pipeline: snapshot.pipeline_stages.clone(),
    }))
}

/// GET /api/v1/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    credential: Credential,
) -> Result<Json<SuccessResponse<Vec<PermissionDescriptor>>>> {
    let snapshot = state.host.current();
    snapshot
        .engine
        .check_permission(&credential, CATALOG_READ_PERMISSION)
        .into_result()?;

    Ok(Json(SuccessResponse::new(
        snapshot.catalog.iter().cloned().collect(),
    )))
}

#[derive(Debug, Deserialize)]
pub struct NavigationQuery {
    pub context: Option<String>,
}

/// GET /api/v1/navigation?context=admin|operation
pub async fn navigation(
    State(state): State<AppState>,
    credential: Credential,
    Query(query): Query<NavigationQuery>,
) -> Result<Json<SuccessResponse<Vec<NavigationNode>>>> {
    let ui_context = query
        .context
        .as_deref()
        .map(str::parse::<UiContext>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let snapshot = state.host.current();
    let full_access = snapshot.engine.has_full_access(&credential);
    let nodes = snapshot
        .navigation
        .filter(ui_context, |p| full_access || credential.has_permission(p));

    Ok(Json(SuccessResponse::new(nodes)))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    pub locale: String,
    pub timezone: String,
    pub permissions: BTreeSet<String>,
    pub roles: BTreeSet<String>,
}

/// GET /api/v1/me
pub async fn me(credential: Credential) -> Json<SuccessResponse<MeResponse>> {
    Json(SuccessResponse::new(MeResponse {
        user_id: credential.user_id().map(|u| u.to_string()),
        tenant_id: credential.tenant_id().map(|t| t.to_string()),
        locale: credential.locale().to_string(),
        timezone: credential.timezone().to_string(),
        permissions: credential.granted_permissions().iter().cloned().collect(),
        roles: credential.roles().iter().cloned().collect(),
    }))
}
