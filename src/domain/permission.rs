//! Permission descriptors contributed by modules

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

/// A permission a module contributes to the catalog.
///
/// Keys follow `{module}:{resource}:{action}`, e.g. `sales:invoices:write`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PermissionDescriptor {
    #[validate(length(min = 5, max = 150), custom(function = "validate_permission_key"))]
    pub key: String,
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
    pub owning_module_id: String,
    /// Roles that receive this permission when a tenant is provisioned
    pub default_roles: BTreeSet<String>,
    /// Grants access to data that should be audited or masked
    pub is_sensitive: bool,
    /// Scoped to the caller's own records
    pub is_self_data: bool,
}

impl PermissionDescriptor {
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        owning_module_id: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            owning_module_id: owning_module_id.into(),
            default_roles: BTreeSet::new(),
            is_sensitive: false,
            is_self_data: false,
        }
    }

    pub fn default_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.is_sensitive = true;
        self
    }

    pub fn self_data(mut self) -> Self {
        self.is_self_data = true;
        self
    }

    /// Module segment of the key (`sales` in `sales:invoices:write`)
    pub fn module_segment(&self) -> &str {
        self.key.split(':').next().unwrap_or_default()
    }

    /// Resource segment of the key (`invoices` in `sales:invoices:write`)
    pub fn resource(&self) -> &str {
        self.key.split(':').nth(1).unwrap_or_default()
    }

    /// Action segment of the key (`write` in `sales:invoices:write`)
    pub fn action(&self) -> &str {
        self.key.split(':').nth(2).unwrap_or_default()
    }
}

/// Validate permission key format
fn validate_permission_key(key: &str) -> Result<(), validator::ValidationError> {
    if PERMISSION_KEY_REGEX.is_match(key) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_permission_key"))
    }
}

lazy_static::lazy_static! {
    pub static ref PERMISSION_KEY_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-z][a-z0-9_-]*:[a-z][a-z0-9_-]*:[a-z][a-z0-9_-]*$").unwrap();
}
