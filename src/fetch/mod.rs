//! Artifact retrieval: multi-source fetch with mirror fallback, content
//! verification, and atomic materialization.
//!
//! Downloads go to a temporary staging path in the destination directory,
//! are verified there, and only then renamed into place — an interrupted
//! or corrupt transfer never leaves a partial file at the final path.

pub mod checksum;
pub mod strategy;

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::util::fs::ensure_dir;
use crate::util::process::ProcessBuilder;

pub use strategy::{select_strategy, DownloadTarget, RetrievalStrategy, CA_BUNDLE_ENV};

/// Environment variable naming an executable invoked on every URL before
/// use; its stdout replaces the URL.
pub const URL_REWRITER_ENV: &str = "KEELSON_URL_REWRITER";

/// Fallback mirror templated from the primary URL's filename when a recipe
/// supplies no explicit mirror.
pub const DEFAULT_MIRROR_BASE: &str = "https://ftp.netbsd.org/pub/pkgsrc/distfiles/";

/// Error retrieving an artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no retrieval tool found; install curl, wget, or fetch")]
    NoRetrievalTool,

    #[error("all sources failed for {primary} (mirror: {mirror})")]
    AllSourcesFailed { primary: String, mirror: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("cannot derive a filename from URL: {0}")]
    NoFilename(String),

    #[error("URL rewrite hook failed: {0}")]
    RewriteHook(String),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Where a fetched artifact should be materialized.
#[derive(Debug, Clone)]
pub enum Destination {
    /// A literal file path.
    File(PathBuf),
    /// A directory; the filename is derived from the URL's last segment.
    Dir(PathBuf),
    /// The caller's standard output stream. No caching, no verification.
    Stdout,
}

/// Retrieves remote artifacts using one strategy selected for the run.
pub struct Fetcher {
    strategy: Box<dyn RetrievalStrategy>,
}

impl Fetcher {
    /// Probe the host for a retrieval tool.
    ///
    /// Fails with [`FetchError::NoRetrievalTool`] before any other side
    /// effect if none is available.
    pub fn detect() -> Result<Self, FetchError> {
        Ok(Fetcher {
            strategy: select_strategy()?,
        })
    }

    /// Use an explicit strategy (tests, embedders).
    pub fn with_strategy(strategy: Box<dyn RetrievalStrategy>) -> Self {
        Fetcher { strategy }
    }

    /// Name of the selected retrieval tool.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Fetch an artifact with staging (the default).
    pub fn fetch(
        &self,
        primary: &str,
        mirror: Option<&str>,
        expected_sha256: Option<&str>,
        destination: &Destination,
    ) -> Result<PathBuf, FetchError> {
        self.fetch_impl(primary, mirror, expected_sha256, destination, true)
    }

    /// Fetch writing directly to the destination, skipping the staging
    /// rename. Only for disposable targets where a partial file is
    /// acceptable.
    pub fn fetch_unstaged(
        &self,
        primary: &str,
        mirror: Option<&str>,
        expected_sha256: Option<&str>,
        destination: &Destination,
    ) -> Result<PathBuf, FetchError> {
        self.fetch_impl(primary, mirror, expected_sha256, destination, false)
    }

    fn fetch_impl(
        &self,
        primary: &str,
        mirror: Option<&str>,
        expected_sha256: Option<&str>,
        destination: &Destination,
        staged: bool,
    ) -> Result<PathBuf, FetchError> {
        let primary = rewrite_url(primary)?;
        let mirror = match mirror {
            Some(m) => rewrite_url(m)?,
            None => derive_default_mirror(&primary)?,
        };

        let final_path = match destination {
            Destination::File(path) => path.clone(),
            Destination::Dir(dir) => dir.join(filename_from_url(&primary)?),
            Destination::Stdout => {
                self.download_with_fallback(&primary, &mirror, &DownloadTarget::Stdout)?;
                return Ok(PathBuf::from("-"));
            }
        };

        // Cache-hit fast path: a verified file at the destination means no
        // network access at all.
        if let Some(expected) = expected_sha256 {
            if checksum::matches(&final_path, expected) {
                tracing::debug!("cache hit for {}", final_path.display());
                return Ok(final_path);
            }
        }

        let parent = final_path
            .parent()
            .ok_or_else(|| FetchError::NoFilename(primary.clone()))?;
        ensure_dir(parent).map_err(FetchError::Io)?;

        if staged {
            let staging = tempfile::Builder::new()
                .prefix(".fetch-")
                .suffix(".part")
                .tempfile_in(parent)
                .map_err(|e| FetchError::Io(anyhow::Error::new(e)))?
                .into_temp_path();

            self.download_with_fallback(&primary, &mirror, &DownloadTarget::File(&staging))?;

            if let Some(expected) = expected_sha256 {
                // The staging path is dropped (and removed) on error; the
                // final path is never touched.
                checksum::verify(&staging, expected)?;
            }

            staging
                .persist(&final_path)
                .map_err(|e| FetchError::Io(anyhow::Error::new(e)))?;
        } else {
            self.download_with_fallback(&primary, &mirror, &DownloadTarget::File(&final_path))?;

            if let Some(expected) = expected_sha256 {
                if let Err(err) = checksum::verify(&final_path, expected) {
                    let _ = std::fs::remove_file(&final_path);
                    return Err(err);
                }
            }
        }

        Ok(final_path)
    }

    fn download_with_fallback(
        &self,
        primary: &str,
        mirror: &str,
        target: &DownloadTarget<'_>,
    ) -> Result<(), FetchError> {
        match self.strategy.download(primary, target) {
            Ok(()) => Ok(()),
            Err(primary_err) => {
                tracing::warn!(
                    "download of {} via {} failed ({}); trying mirror {}",
                    primary,
                    self.strategy.name(),
                    primary_err,
                    mirror
                );
                self.strategy
                    .download(mirror, target)
                    .map_err(|_| FetchError::AllSourcesFailed {
                        primary: primary.to_string(),
                        mirror: mirror.to_string(),
                    })
            }
        }
    }
}

/// Derive the final filename from a URL's last path segment.
pub fn filename_from_url(url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::NoFilename(url.to_string()))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FetchError::NoFilename(url.to_string()))
}

/// Template the default mirror from the primary URL's filename.
fn derive_default_mirror(primary: &str) -> Result<String, FetchError> {
    Ok(format!("{}{}", DEFAULT_MIRROR_BASE, filename_from_url(primary)?))
}

/// Run the URL rewrite hook, if configured.
fn rewrite_url(url: &str) -> Result<String, FetchError> {
    let Some(hook) = std::env::var_os(URL_REWRITER_ENV).filter(|v| !v.is_empty()) else {
        return Ok(url.to_string());
    };

    let output = ProcessBuilder::new(&hook)
        .arg(url)
        .exec_and_check()
        .map_err(|e| FetchError::RewriteHook(format!("{e:#}")))?;

    let rewritten = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if rewritten.is_empty() {
        return Err(FetchError::RewriteHook(format!(
            "hook produced no output for {url}"
        )));
    }
    if rewritten != url {
        tracing::debug!("rewrote {} -> {}", url, rewritten);
    }
    Ok(rewritten)
}
