//! Command implementations

pub mod completions;
pub mod exec;
pub mod install;
pub mod list;
