//! Install ledger: the per-package proof of successful installation.
//!
//! One TOML file per package directly under the install root. Presence of
//! the file is the sole source of truth for "already installed"; it is
//! written atomically and only after every build step of the package has
//! succeeded, so a ledger entry never describes a partial install.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::recipe::Recipe;
use crate::util::fs::write_string_atomic;

/// Provenance recorded for one installed package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub name: String,
    pub version: String,
    pub source: String,
    #[serde(default)]
    pub mirror: Option<String>,
    pub sha256: String,
    pub dependencies: Vec<String>,
    pub build_summary: String,
    pub installed_at: DateTime<Utc>,
    pub installed_by: String,
}

impl LedgerEntry {
    /// Build an entry for a just-installed recipe.
    pub fn for_recipe(recipe: &Recipe) -> LedgerEntry {
        LedgerEntry {
            name: recipe.name.clone(),
            version: recipe.version.clone(),
            source: recipe.source.clone(),
            mirror: recipe.mirror.clone(),
            sha256: recipe.sha256.clone(),
            dependencies: recipe.dependencies.clone(),
            build_summary: recipe.build_summary(),
            installed_at: Utc::now(),
            installed_by: format!("keelson {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The ledger for one install root.
#[derive(Debug, Clone)]
pub struct InstallLedger {
    prefix: PathBuf,
}

impl InstallLedger {
    /// Create a ledger view over an install root.
    pub fn new(prefix: impl Into<PathBuf>) -> InstallLedger {
        InstallLedger {
            prefix: prefix.into(),
        }
    }

    /// Path of the ledger file for a package.
    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.prefix.join(format!("{name}.toml"))
    }

    /// Cheap existence test: is the package installed under this root?
    pub fn has(&self, name: &str) -> bool {
        self.entry_path(name).is_file()
    }

    /// Record a successful installation. Must only be called after every
    /// build step of the package has completed.
    pub fn record(&self, entry: &LedgerEntry) -> Result<()> {
        let text = toml::to_string_pretty(entry)
            .with_context(|| format!("failed to serialize ledger entry for {}", entry.name))?;
        write_string_atomic(&self.entry_path(&entry.name), &text)
    }

    /// Read back an entry, if present.
    pub fn read(&self, name: &str) -> Result<Option<LedgerEntry>> {
        let path = self.entry_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        let text = crate::util::fs::read_to_string(&path)?;
        let entry = toml::from_str(&text)
            .with_context(|| format!("corrupt ledger entry: {}", path.display()))?;
        Ok(Some(entry))
    }
}
