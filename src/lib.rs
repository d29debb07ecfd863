//! Keelson - a source bootstrap installer for foundational build tools
//!
//! This crate provides the core library functionality for Keelson:
//! recipe registries, dependency ordering, artifact retrieval with
//! checksum verification, and the build orchestrator that installs
//! packages from source into an isolated prefix.

pub mod build;
pub mod core;
pub mod fetch;
pub mod util;

pub use build::ledger::InstallLedger;
pub use build::toolchain::ToolchainContext;
pub use build::{BuildConfig, BuildError, Orchestrator};
pub use self::core::recipe::{Recipe, Registry, Step};
pub use self::core::registry::TomlRegistry;
pub use fetch::Fetcher;
pub use util::context::GlobalContext;
