//! Credential extraction.
//!
//! [`credential_middleware`] verifies the bearer token on protected routes
//! and stores the flat claims in request extensions. The [`Credential`]
//! extractor resolves them into a [`CredentialContext`] the first time a
//! handler or layer asks for it and caches the result for the rest of the
//! request.

use crate::context::{CredentialContext, RawClaims};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Verified claims for the current request
#[derive(Debug, Clone)]
pub struct VerifiedClaims(pub Arc<RawClaims>);

/// Resolved credential context for the current request.
#[derive(Debug, Clone)]
pub struct Credential(pub Arc<CredentialContext>);

impl std::ops::Deref for Credential {
    type Target = CredentialContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader(String),
    /// Token validation failed
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidHeader(_) => "Invalid authorization header",
            AuthError::InvalidToken => "Invalid or expired token",
        };

        let body = serde_json::json!({
            "error": message,
            "code": "UNAUTHORIZED"
        });

        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Invalid header encoding".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AuthError::InvalidHeader("Authorization header must use Bearer scheme".to_string())
        })
}

/// Reject requests without a valid bearer token; keep the claims otherwise.
pub async fn credential_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(request.headers()) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let claims = match state.jwt_verifier.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Bearer token rejected");
            return AuthError::InvalidToken.into_response();
        }
    };

    request
        .extensions_mut()
        .insert(VerifiedClaims(Arc::new(claims)));
    next.run(request).await
}

impl FromRequestParts<AppState> for Credential {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<Credential>() {
            return Ok(cached.clone());
        }

        let claims = parts
            .extensions
            .get::<VerifiedClaims>()
            .ok_or(AuthError::MissingToken)?;
        let credential = Credential(Arc::new(state.resolver.resolve(&claims.0)));

        parts.extensions.insert(credential.clone());
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ActivationOptions, HostHandle, ModuleRegistry};
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            extract_bearer_token(&HeaderMap::new()).unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn test_wrong_scheme() {
        assert!(matches!(
            extract_bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::InvalidHeader(_))
        ));
        assert!(matches!(
            extract_bearer_token(&headers("Bearer ")),
            Err(AuthError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_auth_error_is_401() {
        let response = AuthError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    fn test_state() -> AppState {
        let (host, _) = HostHandle::start(ModuleRegistry::new(), ActivationOptions::default()).unwrap();
        AppState::new(crate::config::tests::test_config(), host, None)
    }

    fn parts_with_claims(claims: RawClaims) -> Parts {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(VerifiedClaims(Arc::new(claims)));
        parts
    }

    #[test]
    fn test_credential_is_resolved_once_and_cached() {
        let state = test_state();
        let mut parts = parts_with_claims(
            RawClaims::new()
                .with("sub", "user-1")
                .with("tenant_id", "T1")
                .with("permissions", "sales:invoices:read"),
        );

        let first = tokio_test::block_on(Credential::from_request_parts(&mut parts, &state)).unwrap();
        assert_eq!(first.tenant_id().unwrap().as_str(), "T1");
        assert!(first.has_permission("sales:invoices:read"));

        let second = tokio_test::block_on(Credential::from_request_parts(&mut parts, &state)).unwrap();
        assert!(Arc::ptr_eq(&first.0, &second.0));
    }

    #[test]
    fn test_credential_without_verified_claims_is_rejected() {
        let state = test_state();
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();

        let err = tokio_test::block_on(Credential::from_request_parts(&mut parts, &state)).unwrap_err();
        assert_eq!(err, AuthError::MissingToken);
    }
}
