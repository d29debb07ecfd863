//! Recipe data model.
//!
//! A recipe describes how to obtain and build one package: where its
//! source archive lives, what it depends on, and the short sequence of
//! typed steps that patch, build, and tweak it. Recipes are immutable
//! input; the orchestrator never mutates them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single typed build operation.
///
/// Steps are data, not shell text, so they can be unit-tested against a
/// fake command runner without touching real subprocesses. `${prefix}`,
/// `${src}`, and `${jobs}` placeholders are expanded at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Run an external command with arguments.
    Run {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Apply a unified diff with the `patch` utility.
    Patch {
        file: PathBuf,
        #[serde(default = "default_strip_level")]
        strip: u32,
    },
    /// Create a symbolic link at `link` pointing to `target`.
    Symlink { target: PathBuf, link: PathBuf },
    /// Write a file with the given contents.
    Write { path: PathBuf, contents: String },
}

fn default_strip_level() -> u32 {
    1
}

impl Step {
    /// One-line rendering for diagnostics and ledger summaries.
    pub fn render(&self) -> String {
        match self {
            Step::Run { program, args } => {
                let mut parts = vec![program.clone()];
                parts.extend(args.iter().cloned());
                parts.join(" ")
            }
            Step::Patch { file, strip } => format!("patch -p{} {}", strip, file.display()),
            Step::Symlink { target, link } => {
                format!("ln -s {} {}", target.display(), link.display())
            }
            Step::Write { path, .. } => format!("write {}", path.display()),
        }
    }
}

/// A package recipe: source locator, dependencies, and build steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    /// Unique package name.
    pub name: String,

    /// Upstream version, informational.
    pub version: String,

    /// Primary source archive URL.
    pub source: String,

    /// Optional mirror URL; a default mirror is derived when absent.
    #[serde(default)]
    pub mirror: Option<String>,

    /// Expected SHA256 of the source archive.
    pub sha256: String,

    /// Dependency package names; declared order is build order.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Steps applied to the extracted source before building.
    #[serde(default)]
    pub patch: Vec<Step>,

    /// Required build-and-install steps.
    #[serde(default)]
    pub build: Vec<Step>,

    /// Steps run after installation with the prefix as working directory.
    #[serde(default)]
    pub post_install: Vec<Step>,
}

impl Recipe {
    /// One-line summary of the build steps for ledger provenance.
    pub fn build_summary(&self) -> String {
        self.build
            .iter()
            .map(Step::render)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Archive type inferred from a source URL's filename.
///
/// Determines the download cache suffix and the decompressor used at
/// extraction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    TarXz,
}

impl ArchiveKind {
    /// Infer the archive kind from a URL or filename.
    pub fn from_url(url: &str) -> Option<ArchiveKind> {
        let name = url.rsplit('/').next().unwrap_or(url);
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(ArchiveKind::TarXz)
        } else {
            None
        }
    }

    /// Cache filename suffix for this kind.
    pub fn ext(&self) -> &'static str {
        match self {
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::TarXz => "tar.xz",
        }
    }
}

impl Recipe {
    /// Filename of this recipe's archive in the download cache, derived
    /// from its checksum and inferred archive type.
    pub fn cache_filename(&self) -> Option<String> {
        ArchiveKind::from_url(&self.source).map(|kind| format!("{}.{}", self.sha256, kind.ext()))
    }
}

/// A source of recipes, injected into the orchestrator.
pub trait Registry {
    /// Look up a recipe by package name.
    fn lookup(&self, name: &str) -> Option<&Recipe>;

    /// All known package names, sorted.
    fn names(&self) -> Vec<&str>;
}

/// In-memory registry, used by tests and embedders.
///
/// Unlike [`TomlRegistry`](crate::core::registry::TomlRegistry), it performs
/// no validation; the orchestrator still rejects cycles and empty build
/// step lists at install time.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    recipes: BTreeMap<String, Recipe>,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        StaticRegistry::default()
    }

    /// Add a recipe, replacing any existing one with the same name.
    pub fn add(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.name.clone(), recipe);
    }
}

impl Registry for StaticRegistry {
    fn lookup(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    fn names(&self) -> Vec<&str> {
        self.recipes.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recipe() -> Recipe {
        Recipe {
            name: "gm4".to_string(),
            version: "1.4.19".to_string(),
            source: "https://ftp.gnu.org/gnu/m4/m4-1.4.19.tar.gz".to_string(),
            mirror: None,
            sha256: "ab".repeat(32),
            dependencies: vec![],
            patch: vec![],
            build: vec![
                Step::Run {
                    program: "sh".to_string(),
                    args: vec!["configure".to_string(), "--prefix=${prefix}".to_string()],
                },
                Step::Run {
                    program: "make".to_string(),
                    args: vec!["install".to_string()],
                },
            ],
            post_install: vec![],
        }
    }

    #[test]
    fn test_build_summary() {
        let recipe = sample_recipe();
        assert_eq!(
            recipe.build_summary(),
            "sh configure --prefix=${prefix}; make install"
        );
    }

    #[test]
    fn test_step_render() {
        let step = Step::Patch {
            file: PathBuf::from("fix-glibc.diff"),
            strip: 0,
        };
        assert_eq!(step.render(), "patch -p0 fix-glibc.diff");
    }

    #[test]
    fn test_recipe_toml_roundtrip() {
        let text = r#"
            name = "gm4"
            version = "1.4.19"
            source = "https://ftp.gnu.org/gnu/m4/m4-1.4.19.tar.gz"
            sha256 = "deadbeef"

            [[build]]
            [build.run]
            program = "make"
            args = ["install"]
        "#;

        let recipe: Recipe = toml::from_str(text).unwrap();
        assert_eq!(recipe.name, "gm4");
        assert_eq!(recipe.dependencies.len(), 0);
        assert_eq!(
            recipe.build,
            vec![Step::Run {
                program: "make".to_string(),
                args: vec!["install".to_string()],
            }]
        );
    }

    #[test]
    fn test_archive_kind_inference() {
        assert_eq!(
            ArchiveKind::from_url("https://example.org/m4-1.4.19.tar.gz"),
            Some(ArchiveKind::TarGz)
        );
        assert_eq!(
            ArchiveKind::from_url("https://example.org/perl-5.40.0.tar.xz"),
            Some(ArchiveKind::TarXz)
        );
        assert_eq!(ArchiveKind::from_url("https://example.org/pkg.zip"), None);
    }

    #[test]
    fn test_cache_filename() {
        let recipe = sample_recipe();
        assert_eq!(
            recipe.cache_filename().unwrap(),
            format!("{}.tar.gz", "ab".repeat(32))
        );
    }

    #[test]
    fn test_static_registry_lookup() {
        let mut registry = StaticRegistry::new();
        registry.add(sample_recipe());

        assert!(registry.lookup("gm4").is_some());
        assert!(registry.lookup("perl").is_none());
        assert_eq!(registry.names(), vec!["gm4"]);
    }
}
