//! `keelson install` command

use anyhow::Result;

use crate::cli::{GlobalArgs, InstallArgs};
use keelson::build::toolchain::{Profile, ToolchainContext, ToolchainOptions};
use keelson::build::{BuildConfig, Orchestrator};
use keelson::core::registry::TomlRegistry;
use keelson::util::shell::{Shell, Status, Verbosity};
use keelson::util::GlobalContext;

pub fn execute(global: &GlobalArgs, args: InstallArgs) -> Result<()> {
    let ctx = GlobalContext::new()?
        .with_prefix(global.prefix.clone())
        .with_downloads(global.downloads.clone())
        .with_recipes(global.recipes.clone())
        .with_session(args.session.clone());

    let registry = TomlRegistry::load(ctx.recipes())?;

    let opts = ToolchainOptions {
        profile: args.debug.then_some(Profile::Debug),
        jobs: args.jobs,
        strip: args.no_strip.then_some(false),
        lto: args.lto,
    };
    let toolchain = ToolchainContext::detect(&opts)?;
    tracing::debug!("toolchain:\n{}", toolchain.describe());

    let config = BuildConfig {
        prefix: ctx.prefix().to_path_buf(),
        downloads: ctx.downloads().to_path_buf(),
        session: ctx.session().to_path_buf(),
        keep_session: args.keep_session,
    };

    let verbosity = if global.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let mut shell = Shell::new(verbosity);
    if global.no_color {
        shell = shell.with_color(false);
    }
    let orchestrator = Orchestrator::new(&registry, toolchain, &config, shell.clone())?;

    let names: Vec<&str> = args.names.iter().map(String::as_str).collect();
    orchestrator.install_many(&names)?;

    shell.status(
        Status::Finished,
        format!("{} package(s) into {}", names.len(), ctx.prefix().display()),
    );
    Ok(())
}
