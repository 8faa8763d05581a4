//! Module host: descriptors, discovery, activation, and the published snapshot.

pub mod descriptor;
pub mod host;
pub mod pipeline;
pub mod registry;
pub mod services;

pub use descriptor::ModuleDescriptor;
pub use host::{HostHandle, HostSnapshot, ModuleSummary};
pub use pipeline::{Pipeline, PipelineStage, StageKind};
pub use registry::{activate, discover, Activation, ActivationOptions, ModuleRegistry, OrderedModules};
pub use services::{ServiceCollection, Services};
