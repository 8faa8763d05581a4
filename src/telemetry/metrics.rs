//! Prometheus metrics setup and metric definitions

use crate::authz::AuthorizationDecision;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    let buckets = vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets(&buckets)?
        .install_recorder()?;
    Ok(handle)
}

/// Register metric descriptions and emit initial zero values so Prometheus
/// output includes HELP/TYPE lines from startup.
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!("modgate_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "modgate_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "modgate_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Module host
    describe_counter!(
        "modgate_modules_activated_total",
        "Total number of module activations"
    );
    describe_histogram!(
        "modgate_module_activation_duration_seconds",
        "Time to discover and activate all modules"
    );
    describe_gauge!(
        "modgate_catalog_permissions",
        "Number of permissions in the active catalog"
    );

    // Authorization
    describe_counter!(
        "modgate_authz_decisions_total",
        "Authorization decisions by mode, outcome, and matched guard"
    );

    counter!("modgate_authz_decisions_total", "mode" => "permission", "outcome" => "allow", "guard" => "rbac_permission").absolute(0);
    counter!("modgate_authz_decisions_total", "mode" => "permission", "outcome" => "deny", "guard" => "none").absolute(0);
    gauge!("modgate_http_requests_in_flight").set(0.0);
}

/// Count one authorization decision.
pub fn record_authz_decision(mode: &'static str, decision: &AuthorizationDecision) {
    let outcome = if decision.allowed { "allow" } else { "deny" };
    counter!(
        "modgate_authz_decisions_total",
        "mode" => mode,
        "outcome" => outcome,
        "guard" => decision.matched_guard.as_str()
    )
    .increment(1);
}

/// Record a completed activation pass.
pub fn record_activation(modules: usize, permissions: usize, elapsed_secs: f64) {
    counter!("modgate_modules_activated_total").increment(modules as u64);
    histogram!("modgate_module_activation_duration_seconds").record(elapsed_secs);
    gauge!("modgate_catalog_permissions").set(permissions as f64);
}
