//! Per-run ephemeral workspace.
//!
//! One session directory per orchestrator run, with one subdirectory per
//! package being built. Torn down when the run ends unless the caller
//! asked to keep it (useful for debugging failed builds).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::build::toolchain::ToolchainContext;
use crate::util::fs::{ensure_dir, write_string};

/// Filename of the toolchain description written into the session root.
pub const TOOLCHAIN_FILE: &str = "toolchain.toml";

/// The session directory tree owned by one orchestrator run.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Create the session root and write the toolchain description.
    pub fn create(root: PathBuf, toolchain: &ToolchainContext, keep: bool) -> Result<Workspace> {
        ensure_dir(&root)
            .with_context(|| format!("failed to create session directory {}", root.display()))?;
        write_string(&root.join(TOOLCHAIN_FILE), &toolchain.describe())?;
        Ok(Workspace { root, keep })
    }

    /// The session root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The private directory for one package.
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// The extracted-source directory for one package.
    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.package_dir(name).join("src")
    }

    /// Create and return the source directory for a package.
    pub fn create_source_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.source_dir(name);
        ensure_dir(&dir)?;
        Ok(dir)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            tracing::info!("keeping session directory {}", self.root.display());
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            tracing::warn!(
                "failed to remove session directory {}: {}",
                self.root.display(),
                e
            );
        }
    }
}
