//! `keelson ls-available` command

use anyhow::Result;

use crate::cli::{GlobalArgs, LsAvailableArgs};
use keelson::build::ledger::InstallLedger;
use keelson::core::recipe::Registry;
use keelson::core::registry::TomlRegistry;
use keelson::util::GlobalContext;

pub fn execute(global: &GlobalArgs, args: LsAvailableArgs) -> Result<()> {
    let ctx = GlobalContext::new()?
        .with_prefix(global.prefix.clone())
        .with_recipes(global.recipes.clone());

    let registry = TomlRegistry::load(ctx.recipes())?;
    let ledger = InstallLedger::new(ctx.prefix());

    for name in registry.names() {
        // names() only yields loaded recipes
        let Some(recipe) = registry.lookup(name) else {
            continue;
        };
        let installed = if ledger.has(name) { " (installed)" } else { "" };

        if args.detailed {
            println!("{} {}{}", recipe.name, recipe.version, installed);
            println!("    source: {}", recipe.source);
            if let Some(mirror) = &recipe.mirror {
                println!("    mirror: {}", mirror);
            }
            if !recipe.dependencies.is_empty() {
                println!("    depends: {}", recipe.dependencies.join(", "));
            }
        } else {
            println!("{}{}", recipe.name, installed);
        }
    }

    Ok(())
}
