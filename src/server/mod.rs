//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::middleware::{credential_middleware, tenant_boundary_middleware, ObservabilityLayer};
use crate::module::{ActivationOptions, HostHandle, Pipeline};
use crate::modules;
use crate::state::AppState;
use anyhow::Result;
use axum::{http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// Build the HTTP router from host routes and the modules' pipeline.
///
/// Layering, outermost first: timeout, trace, observability, then per-route
/// credential verification and, for tenant-scoped routes, the tenant
/// boundary check.
pub fn build_router(state: AppState, pipeline: Pipeline) -> Router {
    let parts = pipeline.into_parts();

    let mut protected = Router::new()
        .route("/api/v1/modules", get(api::host::list_modules))
        .route("/api/v1/permissions", get(api::host::list_permissions))
        .route("/api/v1/navigation", get(api::host::navigation))
        .route("/api/v1/me", get(api::host::me))
        .merge(parts.protected);
    if let Some(tenant_scoped) = parts.tenant_scoped {
        protected = protected.merge(
            tenant_scoped.route_layer(from_fn_with_state(state.clone(), tenant_boundary_middleware)),
        );
    }
    let protected =
        protected.route_layer(from_fn_with_state(state.clone(), credential_middleware));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(api::health::health))
        .route("/metrics", get(api::health::metrics_handler))
        .merge(parts.public)
        .merge(protected)
        .layer(ObservabilityLayer)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .with_state(state)
}

/// Activate the built-in modules and serve until a shutdown signal.
pub async fn run(config: Config, prometheus: Option<PrometheusHandle>) -> Result<()> {
    let registry = modules::builtin_registry(&config.modules);
    let (host, pipeline) =
        HostHandle::start(registry, ActivationOptions::from(&config.authorization))?;

    let addr = config.http_addr();
    let state = AppState::new(config, host.clone(), prometheus);
    let app = build_router(state, pipeline);

    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(host.clone()));

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    host.stop();
    Ok(())
}

/// Rebuild the module snapshot on SIGHUP. Routes stay as they are.
#[cfg(unix)]
async fn reload_on_hangup(host: HostHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "SIGHUP handler unavailable, hot reload disabled");
            return;
        }
    };
    while hangup.recv().await.is_some() {
        match host.rebuild() {
            Ok(snapshot) => info!(generation = snapshot.generation, "Reloaded modules"),
            Err(e) => tracing::error!(error = %e, "Module reload failed, keeping previous snapshot"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
