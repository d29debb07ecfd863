//! Dependency-aware build orchestration.
//!
//! Drives the whole install pipeline for a package and its transitive
//! dependencies: resolve the leaf-first order, fetch each source archive
//! into the download cache, extract it into a private workspace, run the
//! recipe's patch/build/post-install steps inside a per-package
//! environment overlay, and record the result in the install ledger.
//!
//! Execution is strictly sequential and fail-fast: the first error aborts
//! the run with no rollback. A package's dependencies are always
//! ledger-recorded before its own build step begins, and rerunning after
//! an interrupted build is safe because no ledger entry exists for the
//! package that was in flight.

pub mod env;
pub mod extract;
pub mod ledger;
pub mod step;
pub mod toolchain;
pub mod workspace;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::graph::{install_order, GraphError};
use crate::core::recipe::{ArchiveKind, Recipe, Registry};
use crate::fetch::{Destination, FetchError, Fetcher};
use crate::util::fs::ensure_dir;
use crate::util::shell::{Shell, Status};

use env::EnvironmentOverlay;
use ledger::{InstallLedger, LedgerEntry};
use step::{run_steps, CommandRunner, StepContext, SystemRunner};
use toolchain::ToolchainContext;
use workspace::Workspace;

/// Error during an install run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("recipe for `{package}` defines no install step")]
    MissingInstallStep { package: String },

    #[error("unsupported archive type for `{package}`: {source_url}")]
    UnsupportedArchive { package: String, source_url: String },

    #[error("failed to fetch source for `{package}`")]
    Fetch {
        package: String,
        #[source]
        source: FetchError,
    },

    #[error("build step failed for `{package}`")]
    Step {
        package: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Tooling(#[from] FetchError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Directory layout and retention policy for one run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Isolated installation prefix.
    pub prefix: PathBuf,
    /// Cross-run, checksum-addressed download cache.
    pub downloads: PathBuf,
    /// Session (workspace) root for this run.
    pub session: PathBuf,
    /// Keep the session directory after the run.
    pub keep_session: bool,
}

/// The single-run build orchestrator.
///
/// Owns the session workspace; dropping the orchestrator tears the
/// session down (unless retention was requested).
pub struct Orchestrator<'r> {
    registry: &'r dyn Registry,
    toolchain: ToolchainContext,
    downloads: PathBuf,
    prefix: PathBuf,
    ledger: InstallLedger,
    fetcher: Fetcher,
    runner: Box<dyn CommandRunner>,
    shell: Shell,
    workspace: Workspace,
}

impl<'r> Orchestrator<'r> {
    /// Create an orchestrator with host defaults: probed retrieval
    /// strategy and real subprocess execution.
    ///
    /// The retrieval probe runs first; a host with no download tool fails
    /// here, before any workspace directory is created.
    pub fn new(
        registry: &'r dyn Registry,
        toolchain: ToolchainContext,
        config: &BuildConfig,
        shell: Shell,
    ) -> Result<Self, BuildError> {
        let fetcher = Fetcher::detect()?;
        Self::with_parts(
            registry,
            toolchain,
            config,
            fetcher,
            Box::new(SystemRunner),
            shell,
        )
    }

    /// Create an orchestrator from explicit parts (tests, embedders).
    pub fn with_parts(
        registry: &'r dyn Registry,
        toolchain: ToolchainContext,
        config: &BuildConfig,
        fetcher: Fetcher,
        runner: Box<dyn CommandRunner>,
        shell: Shell,
    ) -> Result<Self, BuildError> {
        ensure_dir(&config.prefix)?;
        ensure_dir(&config.downloads)?;
        let workspace =
            Workspace::create(config.session.clone(), &toolchain, config.keep_session)?;

        Ok(Orchestrator {
            registry,
            toolchain,
            downloads: config.downloads.clone(),
            prefix: config.prefix.clone(),
            ledger: InstallLedger::new(&config.prefix),
            fetcher,
            runner,
            shell,
            workspace,
        })
    }

    /// The ledger for this orchestrator's install root.
    pub fn ledger(&self) -> &InstallLedger {
        &self.ledger
    }

    /// Install one package and its transitive dependencies.
    pub fn install(&self, name: &str) -> Result<(), BuildError> {
        self.install_many(&[name])
    }

    /// Install several packages, sharing one dependency resolution.
    pub fn install_many(&self, names: &[&str]) -> Result<(), BuildError> {
        let order = install_order(self.registry, names)?;

        for recipe in order {
            if self.ledger.has(&recipe.name) {
                self.shell.status(
                    Status::Cached,
                    format!("{} {} (already installed)", recipe.name, recipe.version),
                );
                continue;
            }
            self.build_one(recipe)?;
        }

        Ok(())
    }

    fn build_one(&self, recipe: &Recipe) -> Result<(), BuildError> {
        // Rejected at registry load for TomlRegistry; injected registries
        // are checked here, after the dependencies were installed.
        if recipe.build.is_empty() {
            return Err(BuildError::MissingInstallStep {
                package: recipe.name.clone(),
            });
        }

        let kind = ArchiveKind::from_url(&recipe.source).ok_or_else(|| {
            BuildError::UnsupportedArchive {
                package: recipe.name.clone(),
                source_url: recipe.source.clone(),
            }
        })?;

        let pkg_dir = self.workspace.package_dir(&recipe.name);
        let overlay = EnvironmentOverlay::for_package(&self.toolchain, &self.prefix, &pkg_dir);

        self.shell.status(
            Status::Fetching,
            format!("{} {}", recipe.name, recipe.version),
        );
        let cache_path = self
            .downloads
            .join(format!("{}.{}", recipe.sha256, kind.ext()));
        let archive = self
            .fetcher
            .fetch(
                &recipe.source,
                recipe.mirror.as_deref(),
                Some(&recipe.sha256),
                &Destination::File(cache_path),
            )
            .map_err(|source| BuildError::Fetch {
                package: recipe.name.clone(),
                source,
            })?;

        let src_dir = self.workspace.create_source_dir(&recipe.name)?;
        self.shell.status(
            Status::Extracting,
            format!("{} {}", recipe.name, recipe.version),
        );
        let spinner = self
            .shell
            .spinner(format!("extracting {}", recipe.name));
        let extracted = extract::extract_archive(&archive, kind, &src_dir);
        spinner.finish_and_clear();
        extracted?;

        let step_error = |source: anyhow::Error| BuildError::Step {
            package: recipe.name.clone(),
            source,
        };

        if !recipe.patch.is_empty() {
            self.shell
                .status(Status::Patching, recipe.name.clone());
            let cx = StepContext {
                cwd: &src_dir,
                source_dir: &src_dir,
                prefix: &self.prefix,
                jobs: self.toolchain.jobs,
                overlay: &overlay,
            };
            run_steps(&recipe.patch, &cx, self.runner.as_ref()).map_err(step_error)?;
        }

        self.shell.status(
            Status::Building,
            format!("{} {}", recipe.name, recipe.version),
        );
        let cx = StepContext {
            cwd: &src_dir,
            source_dir: &src_dir,
            prefix: &self.prefix,
            jobs: self.toolchain.jobs,
            overlay: &overlay,
        };
        run_steps(&recipe.build, &cx, self.runner.as_ref()).map_err(step_error)?;

        if !recipe.post_install.is_empty() {
            let cx = StepContext {
                cwd: &self.prefix,
                source_dir: &src_dir,
                prefix: &self.prefix,
                jobs: self.toolchain.jobs,
                overlay: &overlay,
            };
            run_steps(&recipe.post_install, &cx, self.runner.as_ref()).map_err(step_error)?;
        }

        self.ledger.record(&LedgerEntry::for_recipe(recipe))?;
        self.shell.status(
            Status::Installed,
            format!("{} {}", recipe.name, recipe.version),
        );

        Ok(())
    }
}
