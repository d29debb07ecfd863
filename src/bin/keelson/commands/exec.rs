//! `keelson exec` command
//!
//! Runs an arbitrary command with the prefix environment layered in, so
//! freshly installed tools resolve ahead of the host's.

use anyhow::{Context, Result};

use crate::cli::{ExecArgs, GlobalArgs};
use keelson::build::env::EnvironmentOverlay;
use keelson::util::{GlobalContext, ProcessBuilder};

pub fn execute(global: &GlobalArgs, args: ExecArgs) -> Result<()> {
    let ctx = GlobalContext::new()?.with_prefix(global.prefix.clone());

    let overlay = EnvironmentOverlay::for_prefix(ctx.prefix());
    let (program, rest) = args
        .command
        .split_first()
        .context("no command given")?;

    let cmd = overlay.apply(ProcessBuilder::new(program)).args(rest);
    let status = cmd
        .status()
        .with_context(|| format!("failed to run {}", cmd.display_command()))?;

    std::process::exit(status.code().unwrap_or(1));
}
