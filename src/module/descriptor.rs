//! Contract every pluggable module implements.

use super::{Pipeline, ServiceCollection};
use crate::authz::PolicyBuilder;
use crate::domain::{NavigationItem, PermissionDescriptor};

/// A self-contained module: identity, dependencies, and contributions.
///
/// Descriptors are constructed once at startup and handed to the registry,
/// which owns them from then on. Hooks run once per activation, in
/// dependency order.
pub trait ModuleDescriptor: Send + Sync {
    /// Stable unique id; also the permission and navigation namespace
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// Ids of modules that must activate first
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    fn register_services(&self, _services: &mut ServiceCollection) -> anyhow::Result<()> {
        Ok(())
    }

    fn configure_pipeline(&self, _pipeline: &mut Pipeline) -> anyhow::Result<()> {
        Ok(())
    }

    fn configure_authorization(&self, _policies: &mut PolicyBuilder) -> anyhow::Result<()> {
        Ok(())
    }

    fn permissions(&self) -> Vec<PermissionDescriptor> {
        Vec::new()
    }

    fn navigation_items(&self) -> Vec<NavigationItem> {
        Vec::new()
    }

    /// Runs after every module's contributions validated.
    fn on_started(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs at shutdown, in reverse activation order.
    fn on_stopping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("id", &self.id())
            .field("version", &self.version())
            .finish()
    }
}
