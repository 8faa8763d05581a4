//! Permission catalog and navigation forest.
//!
//! Both are assembled once while modules activate and are read-only
//! afterwards. Builders are crate-private; consumers only see the frozen
//! structures.

pub mod navigation;

pub use navigation::{NavigationForest, NavigationNode};

use crate::domain::PermissionDescriptor;
use crate::error::RegistryError;
use std::collections::{BTreeMap, BTreeSet};
use validator::Validate;

/// Frozen set of every permission contributed by activated modules.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    entries: BTreeMap<String, PermissionDescriptor>,
}

impl PermissionCatalog {
    pub fn get(&self, key: &str) -> Option<&PermissionDescriptor> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors ordered by key
    pub fn iter(&self) -> impl Iterator<Item = &PermissionDescriptor> {
        self.entries.values()
    }

    pub fn by_module<'a>(
        &'a self,
        module_id: &'a str,
    ) -> impl Iterator<Item = &'a PermissionDescriptor> + 'a {
        self.entries
            .values()
            .filter(move |p| p.owning_module_id == module_id)
    }

    pub fn sensitive(&self) -> impl Iterator<Item = &PermissionDescriptor> {
        self.entries.values().filter(|p| p.is_sensitive)
    }

    pub fn self_data(&self) -> impl Iterator<Item = &PermissionDescriptor> {
        self.entries.values().filter(|p| p.is_self_data)
    }

    /// Keys a role receives by default, for seeding the permission store.
    pub fn default_grants(&self, role: &str) -> BTreeSet<&str> {
        self.entries
            .values()
            .filter(|p| p.default_roles.contains(role))
            .map(|p| p.key.as_str())
            .collect()
    }
}

/// Collects permission contributions during activation.
#[derive(Debug, Default)]
pub(crate) struct CatalogBuilder {
    entries: BTreeMap<String, PermissionDescriptor>,
}

impl CatalogBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(
        &mut self,
        module_id: &str,
        descriptor: PermissionDescriptor,
    ) -> Result<(), RegistryError> {
        if descriptor.validate().is_err() {
            return Err(RegistryError::InvalidPermissionKey {
                module: module_id.to_string(),
                key: descriptor.key,
            });
        }
        if descriptor.owning_module_id != module_id || descriptor.module_segment() != module_id {
            return Err(RegistryError::ForeignPermission {
                module: module_id.to_string(),
                key: descriptor.key,
            });
        }
        if let Some(existing) = self.entries.get(&descriptor.key) {
            return Err(RegistryError::DuplicatePermission {
                key: descriptor.key,
                first: existing.owning_module_id.clone(),
                second: module_id.to_string(),
            });
        }

        self.entries.insert(descriptor.key.clone(), descriptor);
        Ok(())
    }

    pub(crate) fn finish(self) -> PermissionCatalog {
        PermissionCatalog {
            entries: self.entries,
        }
    }
}
