//! Global context for keelson operations.
//!
//! Centralizes the directory layout: install prefix, download cache,
//! per-run session root, and the recipe catalog directory. Every path can
//! be overridden from the CLI; defaults live under the keelson home.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Project directories for keelson.
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("sh", "keelson", "keelson"));

/// Global context containing the resolved directory layout.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Home directory for keelson data (~/.keelson/ fallback).
    home: PathBuf,

    /// Isolated installation prefix.
    prefix: PathBuf,

    /// Cross-run download cache.
    downloads: PathBuf,

    /// Per-run session (workspace) root.
    session: PathBuf,

    /// Recipe catalog directory.
    recipes: PathBuf,
}

impl GlobalContext {
    /// Create a context with default paths.
    pub fn new() -> Result<Self> {
        let home = if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.data_dir().to_path_buf()
        } else {
            dirs_fallback()?
        };

        Ok(GlobalContext {
            prefix: home.join("prefix"),
            downloads: home.join("downloads"),
            session: home.join(format!("session-{}", std::process::id())),
            recipes: home.join("recipes"),
            home,
        })
    }

    /// Override the installation prefix.
    pub fn with_prefix(mut self, prefix: Option<PathBuf>) -> Self {
        if let Some(prefix) = prefix {
            self.prefix = prefix;
        }
        self
    }

    /// Override the download cache directory.
    pub fn with_downloads(mut self, downloads: Option<PathBuf>) -> Self {
        if let Some(downloads) = downloads {
            self.downloads = downloads;
        }
        self
    }

    /// Override the session root.
    pub fn with_session(mut self, session: Option<PathBuf>) -> Self {
        if let Some(session) = session {
            self.session = session;
        }
        self
    }

    /// Override the recipe catalog directory.
    pub fn with_recipes(mut self, recipes: Option<PathBuf>) -> Self {
        if let Some(recipes) = recipes {
            self.recipes = recipes;
        }
        self
    }

    /// Get the keelson home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the installation prefix.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Get the download cache directory.
    pub fn downloads(&self) -> &Path {
        &self.downloads
    }

    /// Get the session root for this run.
    pub fn session(&self) -> &Path {
        &self.session
    }

    /// Get the recipe catalog directory.
    pub fn recipes(&self) -> &Path {
        &self.recipes
    }
}

fn dirs_fallback() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".keelson"))
        .context("cannot determine home directory")
}
