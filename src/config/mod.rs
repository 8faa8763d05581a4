//! Configuration management for Modgate Core

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment name (development, staging, production, test)
    pub environment: String,
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Server behaviour
    pub server: ServerConfig,
    /// Bearer token validation
    pub jwt: JwtConfig,
    /// Claim names and defaults used to build the credential context
    pub credential: CredentialConfig,
    /// Authorization engine settings
    pub authorization: AuthorizationConfig,
    /// Module selection
    pub modules: ModulesConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    /// Expected `aud`; audience validation is skipped when unset
    pub audience: Option<String>,
    /// Clock skew tolerance in seconds
    pub leeway_secs: u64,
}

/// Names of the claims read from a validated credential.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    pub user_id_claim: String,
    pub tenant_id_claim: String,
    pub locale_claim: String,
    pub timezone_claim: String,
    pub permissions_claim: String,
    pub roles_claim: String,
    pub default_locale: String,
    pub default_timezone: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            user_id_claim: "sub".to_string(),
            tenant_id_claim: "tenant_id".to_string(),
            locale_claim: "locale".to_string(),
            timezone_claim: "zoneinfo".to_string(),
            permissions_claim: "permissions".to_string(),
            roles_claim: "roles".to_string(),
            default_locale: "en-US".to_string(),
            default_timezone: "UTC".to_string(),
        }
    }
}

impl CredentialConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            user_id_claim: env::var("CLAIM_USER_ID").unwrap_or(defaults.user_id_claim),
            tenant_id_claim: env::var("CLAIM_TENANT_ID").unwrap_or(defaults.tenant_id_claim),
            locale_claim: env::var("CLAIM_LOCALE").unwrap_or(defaults.locale_claim),
            timezone_claim: env::var("CLAIM_TIMEZONE").unwrap_or(defaults.timezone_claim),
            permissions_claim: env::var("CLAIM_PERMISSIONS")
                .unwrap_or(defaults.permissions_claim),
            roles_claim: env::var("CLAIM_ROLES").unwrap_or(defaults.roles_claim),
            default_locale: env::var("DEFAULT_LOCALE").unwrap_or(defaults.default_locale),
            default_timezone: env::var("DEFAULT_TIMEZONE").unwrap_or(defaults.default_timezone),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    /// Reserved grant that bypasses every guard (support/audit access)
    pub full_access_permission: String,
    /// Route parameters that carry a tenant identifier
    pub tenant_route_params: Vec<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            full_access_permission: "*".to_string(),
            tenant_route_params: vec!["tenant_id".to_string(), "business_id".to_string()],
        }
    }
}

impl AuthorizationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let full_access_permission = env::var("FULL_ACCESS_PERMISSION")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.full_access_permission);
        let tenant_route_params = env::var("TENANT_ROUTE_PARAMS")
            .map(|s| split_list(&s))
            .ok()
            .filter(|params| !params.is_empty())
            .unwrap_or(defaults.tenant_route_params);

        Self {
            full_access_permission,
            tenant_route_params,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModulesConfig {
    /// Module ids left out of discovery
    pub disabled: Vec<String>,
}

impl ModulesConfig {
    pub fn from_env() -> Self {
        Self {
            disabled: env::var("MODULES_DISABLED")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
        }
    }

    pub fn is_enabled(&self, module_id: &str) -> bool {
        !self.disabled.iter().any(|id| id == module_id)
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `pretty` or `json`
    pub log_format: String,
    pub metrics_enabled: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            service_name: "modgate-core".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self {
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            metrics_enabled: env::var("METRICS_ENABLED")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "modgate-core".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            server: ServerConfig {
                request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid REQUEST_TIMEOUT_SECS")?,
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,
                issuer: env::var("JWT_ISSUER")
                    .unwrap_or_else(|_| "https://modgate.local".to_string()),
                audience: env::var("JWT_AUDIENCE").ok().filter(|s| !s.is_empty()),
                leeway_secs: env::var("JWT_LEEWAY_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            credential: CredentialConfig::from_env(),
            authorization: AuthorizationConfig::from_env(),
            modules: ModulesConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
