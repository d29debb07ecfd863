//! Shared utilities: filesystem, hashing, subprocesses, shell output.

pub mod context;
pub mod fs;
pub mod hash;
pub mod process;
pub mod shell;

pub use context::GlobalContext;
pub use process::ProcessBuilder;
pub use shell::{Shell, Status, Verbosity};
