//! Named ownership policies contributed by modules.

use super::guard::{ElevatedPermissionGuard, Guard, OwnershipGuard, SuperAdminGuard};
use crate::catalog::PermissionCatalog;
use crate::error::RegistryError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// A named guard chain for ownership-aware checks.
///
/// The chain always starts with super-admin, ownership, and elevated
/// permission guards, followed by guards other modules attached.
#[derive(Debug, Clone)]
pub struct OwnershipPolicy {
    name: String,
    owning_module_id: String,
    elevated_permissions: BTreeSet<String>,
    chain: Vec<Arc<dyn Guard>>,
}

impl OwnershipPolicy {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owning_module_id(&self) -> &str {
        &self.owning_module_id
    }

    pub fn elevated_permissions(&self) -> &BTreeSet<String> {
        &self.elevated_permissions
    }

    pub fn chain(&self) -> &[Arc<dyn Guard>] {
        &self.chain
    }

    pub fn guard_names(&self) -> Vec<&str> {
        self.chain.iter().map(|g| g.name()).collect()
    }
}

/// Frozen set of policies, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    policies: HashMap<String, OwnershipPolicy>,
}

impl PolicySet {
    pub fn get(&self, name: &str) -> Option<&OwnershipPolicy> {
        self.policies.get(name)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }
}

struct PolicyDeclaration {
    module_id: String,
    elevated_permissions: BTreeSet<String>,
}

struct GuardAttachment {
    module_id: String,
    policy: String,
    guard: Arc<dyn Guard>,
}

/// Passed to each module's authorization hook during activation.
///
/// Declarations are only validated when activation finishes, so a module may
/// attach guards to a policy declared by a module that activates later.
pub struct PolicyBuilder {
    current_module: String,
    declarations: BTreeMap<String, PolicyDeclaration>,
    duplicate: Option<RegistryError>,
    attachments: Vec<GuardAttachment>,
}

impl PolicyBuilder {
    pub(crate) fn new() -> Self {
        Self {
            current_module: String::new(),
            declarations: BTreeMap::new(),
            duplicate: None,
            attachments: Vec::new(),
        }
    }

    pub(crate) fn begin_module(&mut self, module_id: &str) {
        self.current_module = module_id.to_string();
    }

    /// Declare an ownership policy elevated by any of `elevated_permissions`.
    pub fn ownership<I, S>(&mut self, name: &str, elevated_permissions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(existing) = self.declarations.get(name) {
            if self.duplicate.is_none() {
                self.duplicate = Some(RegistryError::DuplicatePolicy {
                    policy: name.to_string(),
                    first: existing.module_id.clone(),
                    second: self.current_module.clone(),
                });
            }
            return self;
        }
        self.declarations.insert(
            name.to_string(),
            PolicyDeclaration {
                module_id: self.current_module.clone(),
                elevated_permissions: elevated_permissions.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Append a guard to a policy's chain.
    pub fn guard(&mut self, policy: &str, guard: Arc<dyn Guard>) -> &mut Self {
        self.attachments.push(GuardAttachment {
            module_id: self.current_module.clone(),
            policy: policy.to_string(),
            guard,
        });
        self
    }

    pub(crate) fn finish(
        self,
        catalog: &PermissionCatalog,
        full_access_permission: &str,
    ) -> Result<PolicySet, RegistryError> {
        if let Some(err) = self.duplicate {
            return Err(err);
        }

        let mut policies = HashMap::new();
        for (name, declaration) in self.declarations {
            if let Some(permission) = declaration
                .elevated_permissions
                .iter()
                .find(|p| !catalog.contains(p.as_str()))
            {
                return Err(RegistryError::UnknownPolicyPermission {
                    policy: name,
                    permission: permission.clone(),
                });
            }

            let chain: Vec<Arc<dyn Guard>> = vec![
                Arc::new(SuperAdminGuard::new(full_access_permission)),
                Arc::new(OwnershipGuard),
                Arc::new(ElevatedPermissionGuard::new(
                    declaration.elevated_permissions.iter().cloned(),
                )),
            ];
            policies.insert(
                name.clone(),
                OwnershipPolicy {
                    name,
                    owning_module_id: declaration.module_id,
                    elevated_permissions: declaration.elevated_permissions,
                    chain,
                },
            );
        }

        for attachment in self.attachments {
            match policies.get_mut(&attachment.policy) {
                Some(policy) => policy.chain.push(attachment.guard),
                None => {
                    return Err(RegistryError::UnknownPolicy {
                        module: attachment.module_id,
                        policy: attachment.policy,
                    })
                }
            }
        }

        Ok(PolicySet { policies })
    }
}
