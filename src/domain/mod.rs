//! Domain models shared by the module host and the authorization engine

pub mod common;
pub mod navigation;
pub mod permission;

pub use common::{TenantId, UserId};
pub use navigation::{NavigationItem, UiContext};
pub use permission::{PermissionDescriptor, PERMISSION_KEY_REGEX};
