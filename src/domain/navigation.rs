//! Navigation items contributed by modules

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// UI shell a navigation item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiContext {
    /// Tenant administration console
    Admin,
    /// Day-to-day operation shell
    Operation,
}

impl FromStr for UiContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UiContext::Admin),
            "operation" => Ok(UiContext::Operation),
            other => Err(format!("unknown ui context '{}'", other)),
        }
    }
}

/// One entry in the navigation forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationItem {
    /// Unique key, prefixed by the owning module id (`sales.invoices`)
    pub key: String,
    pub label: String,
    /// Groups usually carry no route
    pub route: Option<String>,
    pub ui_context: UiContext,
    pub parent_key: Option<String>,
    pub order: i32,
    /// All of these must be granted for the item to be visible
    pub required_permissions: Vec<String>,
    pub is_group: bool,
}

impl NavigationItem {
    pub fn link(
        key: impl Into<String>,
        label: impl Into<String>,
        route: impl Into<String>,
        ui_context: UiContext,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            route: Some(route.into()),
            ui_context,
            parent_key: None,
            order: 0,
            required_permissions: Vec::new(),
            is_group: false,
        }
    }

    pub fn group(key: impl Into<String>, label: impl Into<String>, ui_context: UiContext) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            route: None,
            ui_context,
            parent_key: None,
            order: 0,
            required_permissions: Vec::new(),
            is_group: true,
        }
    }

    pub fn under(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn requires(mut self, permission: impl Into<String>) -> Self {
        self.required_permissions.push(permission.into());
        self
    }

    /// Whether the key sits in the module's namespace (`{module}.` prefix)
    pub fn belongs_to(&self, module_id: &str) -> bool {
        self.key
            .strip_prefix(module_id)
            .is_some_and(|rest| rest.starts_with('.') && rest.len() > 1)
    }
}
