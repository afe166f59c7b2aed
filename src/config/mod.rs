//! Model configuration
//!
//! YAML-backed definitions of providers, base models and deep models, plus
//! the validated read-only registry the rest of the gateway resolves against.

pub mod model;
pub mod registry;

pub use model::{BaseModel, DeepModel, ModelFile, Provider, ProviderKind};
pub use registry::{ModelRegistry, ResolvedDeepModel, UpstreamTarget};
