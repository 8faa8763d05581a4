//! Navigation forest keyed by `parent_key`, filtered per request.

use super::PermissionCatalog;
use crate::domain::{NavigationItem, UiContext};
use crate::error::RegistryError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A visible navigation entry with its visible children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationNode {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub ui_context: UiContext,
    pub order: i32,
    pub is_group: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationNode>,
}

/// Frozen navigation forest.
#[derive(Debug, Clone, Default)]
pub struct NavigationForest {
    items: BTreeMap<String, NavigationItem>,
    roots: Vec<String>,
    children: HashMap<String, Vec<String>>,
}

impl NavigationForest {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&NavigationItem> {
        self.items.get(key)
    }

    /// Root keys in display order
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Visible subtree for a caller.
    ///
    /// An item is visible when every required permission is granted. A group
    /// is dropped when none of its children survive.
    pub fn filter<F>(&self, ui_context: Option<UiContext>, is_granted: F) -> Vec<NavigationNode>
    where
        F: Fn(&str) -> bool,
    {
        self.roots
            .iter()
            .filter_map(|key| self.visible_node(key, ui_context, &is_granted))
            .collect()
    }

    fn visible_node<F>(
        &self,
        key: &str,
        ui_context: Option<UiContext>,
        is_granted: &F,
    ) -> Option<NavigationNode>
    where
        F: Fn(&str) -> bool,
    {
        let item = self.items.get(key)?;
        if ui_context.is_some_and(|ctx| ctx != item.ui_context) {
            return None;
        }
        if !item.required_permissions.iter().all(|p| is_granted(p.as_str())) {
            return None;
        }

        let children: Vec<NavigationNode> = self
            .children
            .get(key)
            .map(|keys| {
                keys.iter()
                    .filter_map(|child| self.visible_node(child, ui_context, is_granted))
                    .collect()
            })
            .unwrap_or_default();

        if item.is_group && children.is_empty() {
            return None;
        }

        Some(NavigationNode {
            key: item.key.clone(),
            label: item.label.clone(),
            route: item.route.clone(),
            ui_context: item.ui_context,
            order: item.order,
            is_group: item.is_group,
            children,
        })
    }
}

/// Collects navigation contributions during activation.
#[derive(Debug, Default)]
pub(crate) struct NavigationBuilder {
    items: BTreeMap<String, (String, NavigationItem)>,
}

impl NavigationBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, module_id: &str, item: NavigationItem) -> Result<(), RegistryError> {
        if !item.belongs_to(module_id) {
            return Err(RegistryError::ForeignNavigationItem {
                module: module_id.to_string(),
                key: item.key,
            });
        }
        if let Some((first, _)) = self.items.get(&item.key) {
            return Err(RegistryError::DuplicateNavigationItem {
                key: item.key,
                first: first.clone(),
                second: module_id.to_string(),
            });
        }
        self.items
            .insert(item.key.clone(), (module_id.to_string(), item));
        Ok(())
    }

    /// Validate references and freeze the forest.
    pub(crate) fn finish(self, catalog: &PermissionCatalog) -> Result<NavigationForest, RegistryError> {
        let items: BTreeMap<String, NavigationItem> = self
            .items
            .into_iter()
            .map(|(key, (_, item))| (key, item))
            .collect();

        for item in items.values() {
            if let Some(permission) = item
                .required_permissions
                .iter()
                .find(|p| !catalog.contains(p.as_str()))
            {
                return Err(RegistryError::UnknownNavigationPermission {
                    item: item.key.clone(),
                    permission: permission.clone(),
                });
            }
            if let Some(parent) = &item.parent_key {
                if !items.contains_key(parent) {
                    return Err(RegistryError::UnknownNavigationParent {
                        item: item.key.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        detect_parent_cycle(&items)?;

        let mut roots: Vec<&NavigationItem> = Vec::new();
        let mut children: HashMap<String, Vec<&NavigationItem>> = HashMap::new();
        for item in items.values() {
            match &item.parent_key {
                Some(parent) => children.entry(parent.clone()).or_default().push(item),
                None => roots.push(item),
            }
        }

        let roots = sorted_keys(roots);
        let children = children
            .into_iter()
            .map(|(parent, siblings)| (parent, sorted_keys(siblings)))
            .collect();

        Ok(NavigationForest {
            items,
            roots,
            children,
        })
    }
}

fn sorted_keys(mut siblings: Vec<&NavigationItem>) -> Vec<String> {
    siblings.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.key.cmp(&b.key)));
    siblings.into_iter().map(|item| item.key.clone()).collect()
}

fn detect_parent_cycle(items: &BTreeMap<String, NavigationItem>) -> Result<(), RegistryError> {
    // Parents already resolved; a chain that never reaches a root loops.
    for start in items.values() {
        let mut seen = HashSet::new();
        let mut current = start;
        while let Some(parent) = &current.parent_key {
            if !seen.insert(parent.as_str()) {
                return Err(RegistryError::NavigationCycle(start.key.clone()));
            }
            match items.get(parent) {
                Some(next) => current = next,
                None => break,
            }
        }
    }
    Ok(())
}
