//! Common test utilities
//!
//! Builds the production router over the built-in modules seeded with
//! in-memory fixtures. No external services are involved.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use modgate_core::config::{
    AuthorizationConfig, Config, CredentialConfig, JwtConfig, ModulesConfig, ServerConfig,
    TelemetryConfig,
};
use modgate_core::domain::{TenantId, UserId};
use modgate_core::module::{ActivationOptions, HostHandle, ModuleRegistry};
use modgate_core::modules::business::Business;
use modgate_core::modules::identity::UserProfile;
use modgate_core::modules::sales::Invoice;
use modgate_core::modules::{BusinessModule, IdentityModule, SalesModule};
use modgate_core::server::build_router;
use modgate_core::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-http-testing";
pub const TEST_ISSUER: &str = "https://modgate.test";

pub fn create_test_config() -> Config {
    Config {
        environment: "test".to_string(),
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        server: ServerConfig::default(),
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            issuer: TEST_ISSUER.to_string(),
            audience: None,
            leeway_secs: 0,
        },
        credential: CredentialConfig::default(),
        authorization: AuthorizationConfig::default(),
        modules: ModulesConfig::default(),
        telemetry: TelemetryConfig::default(),
    }
}

pub fn user_id(raw: &str) -> UserId {
    UserId::parse(raw).unwrap()
}

pub fn tenant_id(raw: &str) -> TenantId {
    TenantId::parse(raw).unwrap()
}

pub fn invoice(id: &str, business_id: &str, created_by: &str) -> Invoice {
    Invoice {
        id: id.to_string(),
        business_id: business_id.to_string(),
        number: format!("INV-{}", id),
        amount_cents: 12_500,
        created_by: user_id(created_by),
        created_at: Utc::now(),
    }
}

/// Identity, business, and sales seeded with two tenants.
///
/// - T1: business `T1`, users `alice` and `bob`, invoice `inv-1` created by `alice`
/// - T2: business `T2`, user `carol`, invoice `inv-2` created by `carol`
/// - `dave` belongs to no tenant
pub fn fixture_registry() -> ModuleRegistry {
    let users = [
        ("alice", Some("T1")),
        ("bob", Some("T1")),
        ("carol", Some("T2")),
        ("dave", None),
    ]
    .map(|(id, tenant)| UserProfile {
        id: user_id(id),
        display_name: id.to_string(),
        email: format!("{}@example.com", id),
        tenant_id: tenant.map(tenant_id),
    });

    let businesses = [("T1", "Acme"), ("T2", "Globex")].map(|(id, name)| Business {
        id: id.to_string(),
        name: name.to_string(),
        currency: "EUR".to_string(),
    });

    ModuleRegistry::new()
        .register(SalesModule::with_invoices([
            invoice("inv-1", "T1", "alice"),
            invoice("inv-2", "T2", "carol"),
        ]))
        .register(BusinessModule::with_businesses(businesses))
        .register(IdentityModule::with_users(users))
}

pub fn start_host() -> HostHandle {
    let (host, _pipeline) =
        HostHandle::start(fixture_registry(), ActivationOptions::default()).unwrap();
    host
}

pub struct TestApp {
    pub router: Router,
    pub host: HostHandle,
}

impl TestApp {
    pub fn new() -> Self {
        let (host, pipeline) =
            HostHandle::start(fixture_registry(), ActivationOptions::default()).unwrap();
        let state = AppState::new(create_test_config(), host.clone(), None);
        Self {
            router: build_router(state, pipeline),
            host,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> (StatusCode, Option<Value>) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();

        if body_bytes.is_empty() {
            return (status, None);
        }
        (status, serde_json::from_slice(&body_bytes).ok())
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Option<Value>) {
        self.send(Method::GET, path, token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Option<Value>) {
        self.send(Method::DELETE, path, token).await
    }
}

/// Claims for a signed test token.
pub struct TokenBuilder {
    claims: serde_json::Map<String, Value>,
}

impl TokenBuilder {
    pub fn new(sub: &str) -> Self {
        let now = Utc::now().timestamp();
        let mut claims = serde_json::Map::new();
        claims.insert("sub".to_string(), json!(sub));
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("iat".to_string(), json!(now));
        claims.insert("exp".to_string(), json!(now + 3600));
        Self { claims }
    }

    pub fn tenant(mut self, tenant: &str) -> Self {
        self.claims.insert("tenant_id".to_string(), json!(tenant));
        self
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.claims
            .insert("permissions".to_string(), json!(permissions));
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.claims.insert("roles".to_string(), json!(roles));
        self
    }

    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn sign(self) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &Value::Object(self.claims),
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }
}
