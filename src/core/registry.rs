//! TOML-backed recipe registry.
//!
//! Recipes are authored as one `<name>.toml` file per package in a catalog
//! directory. The whole catalog is loaded and validated eagerly: unknown
//! dependency names, dependency cycles, empty build step lists,
//! unsupported archive types, and conflicting checksum-derived cache
//! filenames are all rejected at load time rather than surfacing midway
//! through a build.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::graph::{detect_cycles, GraphError};
use crate::core::recipe::{ArchiveKind, Recipe, Registry};
use crate::util::fs::read_to_string;

/// Error loading or validating a recipe catalog.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("recipe directory not found: {0}")]
    MissingCatalog(PathBuf),

    #[error("failed to parse recipe {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("recipe file `{path}` declares package `{name}`; file name and package name must match")]
    NameMismatch { path: PathBuf, name: String },

    #[error("recipe `{name}` depends on unknown package `{dependency}`")]
    UnknownDependency { name: String, dependency: String },

    #[error("recipe `{name}` has no build steps; every recipe must define how to install")]
    MissingBuildStep { name: String },

    #[error("recipe `{name}` has an unsupported archive type: {source_url}")]
    UnsupportedArchive { name: String, source_url: String },

    #[error(
        "recipes `{first}` and `{second}` both map to cache file `{filename}`; \
         identical checksums must describe the same archive"
    )]
    ChecksumCollision {
        first: String,
        second: String,
        filename: String,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// A validated recipe catalog loaded from a directory of TOML files.
#[derive(Debug)]
pub struct TomlRegistry {
    recipes: BTreeMap<String, Recipe>,
}

impl TomlRegistry {
    /// Load and validate every `*.toml` recipe under `dir`.
    pub fn load(dir: &Path) -> Result<Self, RegistryError> {
        if !dir.is_dir() {
            return Err(RegistryError::MissingCatalog(dir.to_path_buf()));
        }

        let mut recipes = BTreeMap::new();
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| RegistryError::Io(anyhow::Error::new(e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        entries.sort();

        for path in entries {
            let text = read_to_string(&path)?;
            let recipe: Recipe =
                toml::from_str(&text).map_err(|e| RegistryError::Parse {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if recipe.name != stem {
                return Err(RegistryError::NameMismatch {
                    path,
                    name: recipe.name,
                });
            }

            recipes.insert(recipe.name.clone(), recipe);
        }

        let registry = TomlRegistry { recipes };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        // Per-recipe checks first; they produce the most precise errors.
        for recipe in self.recipes.values() {
            if recipe.build.is_empty() {
                return Err(RegistryError::MissingBuildStep {
                    name: recipe.name.clone(),
                });
            }
            if ArchiveKind::from_url(&recipe.source).is_none() {
                return Err(RegistryError::UnsupportedArchive {
                    name: recipe.name.clone(),
                    source_url: recipe.source.clone(),
                });
            }
            for dep in &recipe.dependencies {
                if !self.recipes.contains_key(dep) {
                    return Err(RegistryError::UnknownDependency {
                        name: recipe.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Two recipes sharing a checksum-derived cache filename must be
        // describing the same bytes; different source filenames for one
        // checksum would make the content-addressed cache ambiguous.
        let mut by_filename: HashMap<String, &Recipe> = HashMap::new();
        for recipe in self.recipes.values() {
            let Some(filename) = recipe.cache_filename() else {
                continue;
            };
            if let Some(existing) = by_filename.get(filename.as_str()) {
                if existing.source.rsplit('/').next() != recipe.source.rsplit('/').next() {
                    return Err(RegistryError::ChecksumCollision {
                        first: existing.name.clone(),
                        second: recipe.name.clone(),
                        filename,
                    });
                }
            } else {
                by_filename.insert(filename, recipe);
            }
        }

        let closure: HashMap<&str, &Recipe> = self
            .recipes
            .values()
            .map(|r| (r.name.as_str(), r))
            .collect();
        detect_cycles(&closure)?;

        Ok(())
    }
}

impl Registry for TomlRegistry {
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
    use tempfile::TempDir;

    fn write_recipe(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(format!("{name}.toml")), body).unwrap();
    }

    fn minimal(name: &str, sha256: &str, deps: &str) -> String {
        format!(
            r#"
            name = "{name}"
            version = "1.0"
            source = "https://example.org/{name}-1.0.tar.gz"
            sha256 = "{sha256}"
            dependencies = [{deps}]

            [[build]]
            [build.run]
            program = "make"
            args = ["install"]
            "#
        )
    }

    #[test]
    fn test_load_and_lookup() {
        let tmp = TempDir::new().unwrap();
        write_recipe(tmp.path(), "gm4", &minimal("gm4", &"11".repeat(32), ""));
        write_recipe(
            tmp.path(),
            "autoconf",
            &minimal("autoconf", &"22".repeat(32), "\"gm4\""),
        );

        let registry = TomlRegistry::load(tmp.path()).unwrap();
        assert_eq!(registry.names(), vec!["autoconf", "gm4"]);
        assert_eq!(
            registry.lookup("autoconf").unwrap().dependencies,
            vec!["gm4"]
        );
    }

    #[test]
    fn test_missing_catalog() {
        let tmp = TempDir::new().unwrap();
        let err = TomlRegistry::load(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, RegistryError::MissingCatalog(_)));
    }

    #[test]
    fn test_name_mismatch_rejected() {
        let tmp = TempDir::new().unwrap();
        write_recipe(tmp.path(), "wrong", &minimal("gm4", &"11".repeat(32), ""));

        let err = TomlRegistry::load(tmp.path()).unwrap_err();
        assert!(matches!(err, RegistryError::NameMismatch { .. }));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let tmp = TempDir::new().unwrap();
        write_recipe(
            tmp.path(),
            "autoconf",
            &minimal("autoconf", &"22".repeat(32), "\"gm4\""),
        );

        let err = TomlRegistry::load(tmp.path()).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDependency { .. }));
    }

    #[test]
    fn test_empty_build_rejected() {
        let tmp = TempDir::new().unwrap();
        write_recipe(
            tmp.path(),
            "gm4",
            r#"
            name = "gm4"
            version = "1.0"
            source = "https://example.org/gm4-1.0.tar.gz"
            sha256 = "deadbeef"
            "#,
        );

        let err = TomlRegistry::load(tmp.path()).unwrap_err();
        assert!(matches!(err, RegistryError::MissingBuildStep { .. }));
    }

    #[test]
    fn test_unsupported_archive_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut body = minimal("gm4", &"11".repeat(32), "");
        body = body.replace("gm4-1.0.tar.gz", "gm4-1.0.zip");
        write_recipe(tmp.path(), "gm4", &body);

        let err = TomlRegistry::load(tmp.path()).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedArchive { .. }));
    }

    #[test]
    fn test_cycle_rejected_at_load() {
        let tmp = TempDir::new().unwrap();
        write_recipe(tmp.path(), "a", &minimal("a", &"11".repeat(32), "\"b\""));
        write_recipe(tmp.path(), "b", &minimal("b", &"22".repeat(32), "\"a\""));

        let err = TomlRegistry::load(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Graph(GraphError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_checksum_collision_rejected() {
        let tmp = TempDir::new().unwrap();
        let sha = "33".repeat(32);
        write_recipe(tmp.path(), "a", &minimal("a", &sha, ""));
        write_recipe(tmp.path(), "b", &minimal("b", &sha, ""));

        // Same checksum but different source filenames (a-1.0 vs b-1.0)
        let err = TomlRegistry::load(tmp.path()).unwrap_err();
        assert!(matches!(err, RegistryError::ChecksumCollision { .. }));
    }
}
