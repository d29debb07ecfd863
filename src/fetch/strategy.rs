//! Retrieval strategies wrapping external network clients.
//!
//! One strategy is selected per run: the first available tool in a fixed
//! preference order (`curl`, `wget`, `fetch`). The selected strategy is
//! used for every artifact; mirror fallback retries the same strategy
//! against a different URL, never a different tool. Retry and timeout
//! policy is per-tool, expressed through its command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::util::process::{find_executable, ProcessBuilder};

use super::FetchError;

/// Environment variable naming an SSL certificate bundle handed to the
/// underlying client.
pub const CA_BUNDLE_ENV: &str = "KEELSON_CA_BUNDLE";

/// Where a strategy should write the downloaded bytes.
#[derive(Debug)]
pub enum DownloadTarget<'a> {
    /// Write to the given file path.
    File(&'a Path),
    /// Stream to the calling process's stdout.
    Stdout,
}

/// A single external download client.
pub trait RetrievalStrategy {
    /// Tool name for diagnostics.
    fn name(&self) -> &'static str;

    /// Download `url` into `target`, blocking until the transfer ends.
    fn download(&self, url: &str, target: &DownloadTarget<'_>) -> Result<()>;
}

/// Probe for the first available retrieval tool, in preference order.
pub fn select_strategy() -> Result<Box<dyn RetrievalStrategy>, FetchError> {
    if let Some(bin) = find_executable("curl") {
        tracing::debug!("using curl at {}", bin.display());
        return Ok(Box::new(CurlStrategy { bin }));
    }
    if let Some(bin) = find_executable("wget") {
        tracing::debug!("using wget at {}", bin.display());
        return Ok(Box::new(WgetStrategy { bin }));
    }
    if let Some(bin) = find_executable("fetch") {
        tracing::debug!("using fetch at {}", bin.display());
        return Ok(Box::new(FetchCmdStrategy { bin }));
    }
    Err(FetchError::NoRetrievalTool)
}

fn ca_bundle() -> Option<String> {
    std::env::var(CA_BUNDLE_ENV).ok().filter(|v| !v.is_empty())
}

/// curl(1), the preferred client.
pub struct CurlStrategy {
    bin: PathBuf,
}

impl RetrievalStrategy for CurlStrategy {
    fn name(&self) -> &'static str {
        "curl"
    }

    fn download(&self, url: &str, target: &DownloadTarget<'_>) -> Result<()> {
        let mut cmd = ProcessBuilder::new(&self.bin).args([
            "--fail",
            "--location",
            "--connect-timeout",
            "30",
            "--retry",
            "3",
            "--show-error",
        ]);
        if let Some(bundle) = ca_bundle() {
            cmd = cmd.arg("--cacert").arg(bundle);
        }
        cmd = match target {
            DownloadTarget::File(path) => cmd.arg("--progress-bar").arg("--output").arg(path),
            DownloadTarget::Stdout => cmd.arg("--silent").arg("--output").arg("-"),
        };
        cmd.arg(url).status_and_check()
    }
}

/// wget(1) fallback.
pub struct WgetStrategy {
    bin: PathBuf,
}

impl RetrievalStrategy for WgetStrategy {
    fn name(&self) -> &'static str {
        "wget"
    }

    fn download(&self, url: &str, target: &DownloadTarget<'_>) -> Result<()> {
        let mut cmd = ProcessBuilder::new(&self.bin).args(["--tries=3", "--timeout=30"]);
        if let Some(bundle) = ca_bundle() {
            cmd = cmd.arg(format!("--ca-certificate={bundle}"));
        }
        cmd = match target {
            DownloadTarget::File(path) => cmd.arg("--output-document").arg(path),
            DownloadTarget::Stdout => cmd.arg("--quiet").arg("--output-document").arg("-"),
        };
        cmd.arg(url).status_and_check()
    }
}

/// BSD fetch(1), last resort.
pub struct FetchCmdStrategy {
    bin: PathBuf,
}

impl RetrievalStrategy for FetchCmdStrategy {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn download(&self, url: &str, target: &DownloadTarget<'_>) -> Result<()> {
        let mut cmd = ProcessBuilder::new(&self.bin);
        if let Some(bundle) = ca_bundle() {
            cmd = cmd.arg("--ca-cert").arg(bundle);
        }
        cmd = match target {
            DownloadTarget::File(path) => cmd.arg("-o").arg(path),
            DownloadTarget::Stdout => cmd.arg("-o").arg("-"),
        };
        cmd.arg(url).status_and_check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names() {
        let curl = CurlStrategy {
            bin: PathBuf::from("curl"),
        };
        let wget = WgetStrategy {
            bin: PathBuf::from("wget"),
        };
        let fetch = FetchCmdStrategy {
            bin: PathBuf::from("fetch"),
        };
        assert_eq!(curl.name(), "curl");
        assert_eq!(wget.name(), "wget");
        assert_eq!(fetch.name(), "fetch");
    }
}
