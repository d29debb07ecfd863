//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Keelson - bootstrap build tools from source into an isolated prefix
#[derive(Parser)]
#[command(name = "keelson")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags and directory overrides shared by every command.
#[derive(Args)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Installation prefix (defaults to the keelson home)
    #[arg(long, global = true, env = "KEELSON_PREFIX")]
    pub prefix: Option<PathBuf>,

    /// Download cache directory
    #[arg(long, global = true, env = "KEELSON_DOWNLOADS")]
    pub downloads: Option<PathBuf>,

    /// Recipe catalog directory
    #[arg(long, global = true, env = "KEELSON_RECIPES")]
    pub recipes: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install packages (and their dependencies) from source
    Install(InstallArgs),

    /// List the packages the recipe catalog can install
    LsAvailable(LsAvailableArgs),

    /// Run a command inside the prefix environment
    Exec(ExecArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InstallArgs {
    /// Packages to install
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Build without optimization, with debug info
    #[arg(long)]
    pub debug: bool,

    /// Number of parallel jobs for package build tools
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Do not strip installed binaries
    #[arg(long)]
    pub no_strip: bool,

    /// Enable link-time optimization
    #[arg(long)]
    pub lto: bool,

    /// Session directory for this run (defaults to a per-pid directory)
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Keep the session directory after the run
    #[arg(long)]
    pub keep_session: bool,
}

#[derive(Args)]
pub struct LsAvailableArgs {
    /// Show version, source URL and dependencies for each package
    #[arg(short = 'v', long)]
    pub detailed: bool,
}

#[derive(Args)]
pub struct ExecArgs {
    /// Command and arguments to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
