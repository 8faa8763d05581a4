//! Shared application state handed to every handler.

use crate::config::Config;
use crate::context::CredentialResolver;
use crate::jwt::JwtVerifier;
use crate::module::HostHandle;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Active module snapshot; swapped on rebuild
    pub host: HostHandle,
    pub jwt_verifier: JwtVerifier,
    pub resolver: Arc<CredentialResolver>,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, host: HostHandle, prometheus: Option<PrometheusHandle>) -> Self {
        let jwt_verifier = JwtVerifier::new(config.jwt.clone());
        let resolver = Arc::new(CredentialResolver::new(config.credential.clone()));
        Self {
            config: Arc::new(config),
            host,
            jwt_verifier,
            resolver,
            prometheus,
        }
    }
}
