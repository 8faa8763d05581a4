//! Built-in modules shipped with the host.

pub mod business;
pub mod identity;
pub mod sales;

use crate::config::ModulesConfig;
use crate::module::{ModuleDescriptor, ModuleRegistry};
use std::sync::Arc;

pub use business::BusinessModule;
pub use identity::IdentityModule;
pub use sales::SalesModule;

/// Registry of built-in modules minus the disabled ones.
///
/// Disabling a module that others depend on fails discovery.
pub fn builtin_registry(config: &ModulesConfig) -> ModuleRegistry {
    let modules: Vec<Arc<dyn ModuleDescriptor>> = vec![
        Arc::new(IdentityModule::new()),
        Arc::new(BusinessModule::new()),
        Arc::new(SalesModule::new()),
    ];

    modules
        .into_iter()
        .filter(|m| {
            let enabled = config.is_enabled(m.id());
            if !enabled {
                tracing::info!(module = m.id(), "Module disabled by configuration");
            }
            enabled
        })
        .fold(ModuleRegistry::new(), ModuleRegistry::register_arc)
}
