//! Modgate Core - module host and authorization engine
//!
//! Modules announce themselves to a registry, are activated once in
//! dependency order, and contribute services, routes, permissions,
//! navigation, and ownership policies. Every protected operation is decided
//! by the authorization engine from the request's credential context.

pub mod api;
pub mod authz;
pub mod catalog;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod module;
pub mod modules;
pub mod server;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, RegistryError, Result};
