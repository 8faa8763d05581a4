//! Tenant boundary enforcement for routes that address a tenant by id.

use super::auth::Credential;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{FromRequestParts, RawPathParams},
    http::{request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Tenant addressed by the route, already checked against the caller.
#[derive(Debug, Clone)]
pub struct TenantScope {
    pub tenant_id: String,
    pub credential: Credential,
}

/// First configured tenant parameter present in the matched route.
fn route_tenant_id(params: &RawPathParams, names: &[String]) -> Option<String> {
    names.iter().find_map(|name| {
        params
            .iter()
            .find(|(key, _)| *key == name.as_str())
            .map(|(_, value)| value.to_string())
    })
}

impl FromRequestParts<AppState> for TenantScope {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(scope) = parts.extensions.get::<TenantScope>() {
            return Ok(scope.clone());
        }

        let credential = Credential::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let params = RawPathParams::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let tenant_id = route_tenant_id(&params, &state.config.authorization.tenant_route_params)
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("route has no tenant parameter")).into_response()
            })?;

        state
            .host
            .current()
            .engine
            .check_tenant_boundary(&credential, &tenant_id)
            .into_result()
            .map_err(IntoResponse::into_response)?;

        let scope = Self {
            tenant_id,
            credential,
        };
        parts.extensions.insert(scope.clone());
        Ok(scope)
    }
}

/// Route layer: reject with 403 unless the caller may address the tenant.
/// Handlers extracting [`TenantScope`] afterwards reuse this check.
pub async fn tenant_boundary_middleware(
    _scope: TenantScope,
    request: Request<Body>,
    next: Next,
) -> Response {
    next.run(request).await
}
