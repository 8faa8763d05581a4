//! Frozen activation results and the handle that publishes them.

use super::pipeline::PipelineStage;
use super::registry::{activate, ActivationOptions, ModuleRegistry, OrderedModules};
use super::{Pipeline, Services};
use crate::authz::AuthorizationEngine;
use crate::catalog::{NavigationForest, PermissionCatalog};
use crate::error::RegistryError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Per-module activation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub id: String,
    pub display_name: String,
    pub version: String,
    pub dependencies: Vec<String>,
    pub permissions: usize,
    pub navigation_items: usize,
}

/// Everything one activation produced. Read-only once published.
#[derive(Debug)]
pub struct HostSnapshot {
    pub generation: u64,
    pub activated_at: DateTime<Utc>,
    /// Summaries in activation order
    pub modules: Vec<ModuleSummary>,
    pub ordered: OrderedModules,
    pub catalog: PermissionCatalog,
    pub navigation: NavigationForest,
    pub services: Services,
    pub engine: AuthorizationEngine,
    pub pipeline_stages: Vec<PipelineStage>,
}

impl HostSnapshot {
    pub fn module_ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id.as_str()).collect()
    }
}

struct HostInner {
    registry: ModuleRegistry,
    options: ActivationOptions,
    current: RwLock<Arc<HostSnapshot>>,
    /// Last published generation; held for the whole of a rebuild
    rebuild: Mutex<u64>,
}

/// Shared handle to the active snapshot.
///
/// Readers clone the current `Arc` and keep a consistent view for as long as
/// they hold it. A rebuild activates from scratch and swaps the pointer only
/// when it succeeded.
#[derive(Clone)]
pub struct HostHandle {
    inner: Arc<HostInner>,
}

impl HostHandle {
    /// Discover and activate the registry's modules.
    ///
    /// Returns the pipeline as well; routes are fixed for the process
    /// lifetime, only the snapshot is swapped by [`HostHandle::rebuild`].
    pub fn start(
        registry: ModuleRegistry,
        options: ActivationOptions,
    ) -> Result<(Self, Pipeline), RegistryError> {
        let ordered = registry.discover()?;
        let activation = activate(&ordered, &options)?;
        let mut snapshot = activation.snapshot;
        snapshot.generation = 1;

        tracing::info!(
            modules = ?snapshot.module_ids(),
            permissions = snapshot.catalog.len(),
            navigation_items = snapshot.navigation.len(),
            "Module host started"
        );

        let handle = Self {
            inner: Arc::new(HostInner {
                registry,
                options,
                current: RwLock::new(Arc::new(snapshot)),
                rebuild: Mutex::new(1),
            }),
        };
        Ok((handle, activation.pipeline))
    }

    pub fn current(&self) -> Arc<HostSnapshot> {
        let guard = self
            .inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Re-run discovery and activation, then swap atomically.
    ///
    /// Rebuilds are serialized, so generations are published in order. On
    /// failure the previous snapshot stays active.
    pub fn rebuild(&self) -> Result<Arc<HostSnapshot>, RegistryError> {
        let mut last_generation = self
            .inner
            .rebuild
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let ordered = self.inner.registry.discover()?;
        let mut snapshot = activate(&ordered, &self.inner.options)?.snapshot;
        snapshot.generation = *last_generation + 1;

        let snapshot = Arc::new(snapshot);
        {
            let mut guard = self
                .inner
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&snapshot);
        }
        *last_generation = snapshot.generation;

        tracing::info!(generation = snapshot.generation, "Module host rebuilt");
        Ok(snapshot)
    }

    /// Run `on_stopping` in reverse activation order. Failures are logged.
    pub fn stop(&self) {
        let snapshot = self.current();
        for module in snapshot.ordered.iter().rev() {
            if let Err(e) = module.on_stopping() {
                tracing::warn!(module = module.id(), error = %e, "Module failed to stop cleanly");
            }
        }
        tracing::info!("Module host stopped");
    }
}

impl std::fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHandle")
            .field("generation", &self.current().generation)
            .finish()
    }
}
