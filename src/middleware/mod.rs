//! HTTP middleware for Modgate Core
//!
//! - bearer verification and the lazily resolved `Credential` extractor
//! - tenant boundary route layer and `TenantScope` extractor
//! - request id and HTTP metrics

pub mod auth;
pub mod metrics;
pub mod tenant;

pub use auth::{credential_middleware, AuthError, Credential, VerifiedClaims};
pub use metrics::ObservabilityLayer;
pub use tenant::{tenant_boundary_middleware, TenantScope};
