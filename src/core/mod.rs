//! Core data model: recipes, the recipe registry, and the dependency graph.

pub mod graph;
pub mod recipe;
pub mod registry;

pub use graph::{install_order, GraphError};
pub use recipe::{ArchiveKind, Recipe, Registry, StaticRegistry, Step};
pub use registry::{RegistryError, TomlRegistry};
