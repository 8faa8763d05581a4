//! Unified error handling for Modgate Core
//!
//! Two families live here:
//! - [`AppError`], the per-request error surface mapped to HTTP responses
//! - [`RegistryError`], the fatal startup failures raised while discovering
//!   and activating modules

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {:?}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "jwt_error",
                    "Invalid or expired token".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Fatal errors raised while discovering, validating, or activating modules.
///
/// Any of these aborts startup; no partially activated host is ever published.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Cyclic module dependency among: {}", members.join(", "))]
    CyclicDependency { members: Vec<String> },

    #[error("Module '{module}' depends on unknown module '{dependency}'")]
    UnknownDependency { module: String, dependency: String },

    #[error("Module '{0}' is registered more than once")]
    DuplicateModule(String),

    #[error("Permission '{key}' declared by module '{second}' is already declared by '{first}'")]
    DuplicatePermission {
        key: String,
        first: String,
        second: String,
    },

    #[error("Navigation item '{key}' declared by module '{second}' is already declared by '{first}'")]
    DuplicateNavigationItem {
        key: String,
        first: String,
        second: String,
    },

    #[error("Module '{module}' declares invalid permission key '{key}'")]
    InvalidPermissionKey { module: String, key: String },

    #[error("Module '{module}' declares permission '{key}' outside its own namespace")]
    ForeignPermission { module: String, key: String },

    #[error("Module '{module}' declares navigation item '{key}' outside its own namespace")]
    ForeignNavigationItem { module: String, key: String },

    #[error("Navigation item '{item}' requires unknown permission '{permission}'")]
    UnknownNavigationPermission { item: String, permission: String },

    #[error("Navigation item '{item}' has unknown parent '{parent}'")]
    UnknownNavigationParent { item: String, parent: String },

    #[error("Navigation items form a parent cycle through '{0}'")]
    NavigationCycle(String),

    #[error("Policy '{policy}' declared by module '{second}' is already declared by '{first}'")]
    DuplicatePolicy {
        policy: String,
        first: String,
        second: String,
    },

    #[error("Module '{module}' attaches a guard to unknown policy '{policy}'")]
    UnknownPolicy { module: String, policy: String },

    #[error("Policy '{policy}' elevates through unknown permission '{permission}'")]
    UnknownPolicyPermission { policy: String, permission: String },

    #[error("Module '{module}' failed in {hook}: {source}")]
    ModuleHook {
        module: String,
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },
}
