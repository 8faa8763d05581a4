//! HTTP pipeline assembled by modules in activation order.

use crate::state::AppState;
use axum::Router;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    MergePublic,
    Merge,
    MergeTenantScoped,
    Nest,
    Map,
}

/// One recorded pipeline contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStage {
    pub module: String,
    pub kind: StageKind,
    pub label: String,
}

/// Router under construction.
///
/// Public routes skip credential extraction; protected routes run behind it.
/// Tenant-scoped routes additionally pass the tenant boundary check on their
/// tenant path parameter. Every call is recorded so the effective order can
/// be inspected.
#[derive(Default)]
pub struct Pipeline {
    current_module: String,
    public: Router<AppState>,
    protected: Router<AppState>,
    tenant_scoped: Router<AppState>,
    has_tenant_scoped: bool,
    stages: Vec<PipelineStage>,
}

/// Routers split by protection level, ready for the server.
pub(crate) struct PipelineParts {
    pub public: Router<AppState>,
    pub protected: Router<AppState>,
    /// `None` when no module added tenant-scoped routes
    pub tenant_scoped: Option<Router<AppState>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_module(&mut self, module_id: &str) {
        self.current_module = module_id.to_string();
    }

    fn record(&mut self, kind: StageKind, label: impl Into<String>) {
        self.stages.push(PipelineStage {
            module: self.current_module.clone(),
            kind,
            label: label.into(),
        });
    }

    /// Routes reachable without a credential.
    pub fn merge_public(&mut self, label: &str, routes: Router<AppState>) -> &mut Self {
        self.public = std::mem::take(&mut self.public).merge(routes);
        self.record(StageKind::MergePublic, label);
        self
    }

    /// Routes behind credential extraction.
    pub fn merge(&mut self, label: &str, routes: Router<AppState>) -> &mut Self {
        self.protected = std::mem::take(&mut self.protected).merge(routes);
        self.record(StageKind::Merge, label);
        self
    }

    /// Protected routes whose path carries a tenant identifier.
    pub fn merge_tenant_scoped(&mut self, label: &str, routes: Router<AppState>) -> &mut Self {
        self.tenant_scoped = std::mem::take(&mut self.tenant_scoped).merge(routes);
        self.has_tenant_scoped = true;
        self.record(StageKind::MergeTenantScoped, label);
        self
    }

    pub fn nest(&mut self, path: &str, routes: Router<AppState>) -> &mut Self {
        self.protected = std::mem::take(&mut self.protected).nest(path, routes);
        self.record(StageKind::Nest, path);
        self
    }

    /// Transform the protected router, e.g. to add a layer. Layers only wrap
    /// routes added before them.
    pub fn map<F>(&mut self, label: &str, f: F) -> &mut Self
    where
        F: FnOnce(Router<AppState>) -> Router<AppState>,
    {
        self.protected = f(std::mem::take(&mut self.protected));
        self.record(StageKind::Map, label);
        self
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub(crate) fn into_parts(self) -> PipelineParts {
        PipelineParts {
            public: self.public,
            protected: self.protected,
            tenant_scoped: self.has_tenant_scoped.then_some(self.tenant_scoped),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("stages", &self.stages).finish()
    }
}
