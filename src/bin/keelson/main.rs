//! Keelson CLI - bootstrap build tools from source into an isolated prefix

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.global.verbose {
        EnvFilter::new("keelson=debug")
    } else {
        EnvFilter::new("keelson=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.global.no_color)
        .init();

    // Execute command
    match cli.command {
        Commands::Install(args) => commands::install::execute(&cli.global, args),
        Commands::LsAvailable(args) => commands::list::execute(&cli.global, args),
        Commands::Exec(args) => commands::exec::execute(&cli.global, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
