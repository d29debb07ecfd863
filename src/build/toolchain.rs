//! Toolchain context: compiler, archiver, flags, and run-wide build policy.
//!
//! Resolved once per run and immutable afterwards; every package's build
//! sees a derived view through the environment overlay, never a mutated
//! global.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::util::process::find_executable;

/// Error during toolchain discovery.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error(
        "no C compiler found\n\
         \n\
         keelson requires a C compiler (cc, gcc, or clang).\n\
         Set the CC environment variable or install a compiler."
    )]
    NoCompiler,

    #[error("no archiver (ar) found; set the AR environment variable")]
    NoArchiver,
}

/// Build profile for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Debug,
    Release,
}

/// Caller-supplied knobs for toolchain resolution.
#[derive(Debug, Clone, Default)]
pub struct ToolchainOptions {
    pub profile: Option<Profile>,
    pub jobs: Option<usize>,
    pub strip: Option<bool>,
    pub lto: bool,
}

/// The resolved, immutable toolchain configuration for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ToolchainContext {
    /// C compiler path.
    pub cc: PathBuf,

    /// C++ compiler path, when one exists on the host.
    pub cxx: Option<PathBuf>,

    /// Archiver path.
    pub ar: PathBuf,

    /// Target operating system.
    pub os: String,

    /// Target architecture.
    pub arch: String,

    /// Base compiler flags.
    pub cflags: Vec<String>,

    /// Base linker flags.
    pub ldflags: Vec<String>,

    /// Job-parallelism count passed to package build tools.
    pub jobs: usize,

    /// Optimization profile.
    pub profile: Profile,

    /// Whether installed binaries should be stripped.
    pub strip: bool,

    /// Whether link-time optimization is enabled.
    pub lto: bool,
}

impl ToolchainContext {
    /// Discover the host toolchain.
    ///
    /// Environment overrides (`CC`, `CXX`, `AR`, `CFLAGS`, `LDFLAGS`) win
    /// over PATH probing. Fails before any network or build activity when
    /// no usable compiler exists.
    pub fn detect(opts: &ToolchainOptions) -> Result<Self, ToolchainError> {
        let cc = env_tool("CC")
            .or_else(|| find_first(&["cc", "gcc", "clang"]))
            .ok_or(ToolchainError::NoCompiler)?;

        let cxx = env_tool("CXX").or_else(|| find_first(&["c++", "g++", "clang++"]));

        let ar = env_tool("AR")
            .or_else(|| find_first(&["ar", "llvm-ar"]))
            .ok_or(ToolchainError::NoArchiver)?;

        let profile = opts.profile.unwrap_or(Profile::Release);
        let strip = opts.strip.unwrap_or(profile == Profile::Release);

        let mut cflags = match std::env::var("CFLAGS") {
            Ok(flags) => split_flags(&flags),
            Err(_) => match profile {
                Profile::Release => vec!["-O2".to_string()],
                Profile::Debug => vec!["-O0".to_string(), "-g".to_string()],
            },
        };
        let mut ldflags = match std::env::var("LDFLAGS") {
            Ok(flags) => split_flags(&flags),
            Err(_) => Vec::new(),
        };

        if opts.lto {
            cflags.push("-flto".to_string());
            ldflags.push("-flto".to_string());
        }
        if strip && std::env::consts::OS == "linux" {
            ldflags.push("-s".to_string());
        }

        let jobs = opts.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        });

        tracing::info!(
            "toolchain: cc={} ar={} jobs={}",
            cc.display(),
            ar.display(),
            jobs
        );

        Ok(ToolchainContext {
            cc,
            cxx,
            ar,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cflags,
            ldflags,
            jobs,
            profile,
            strip,
            lto: opts.lto,
        })
    }

    /// Render the context as TOML for the session's toolchain description
    /// file.
    pub fn describe(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Resolve a tool named by an environment variable, if set and usable.
fn env_tool(var: &str) -> Option<PathBuf> {
    let value = std::env::var(var).ok().filter(|v| !v.is_empty())?;
    let path = PathBuf::from(&value);
    if path.is_absolute() && path.exists() {
        Some(path)
    } else {
        find_executable(&value)
    }
}

fn find_first(names: &[&str]) -> Option<PathBuf> {
    names.iter().find_map(|name| find_executable(name))
}

fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}
