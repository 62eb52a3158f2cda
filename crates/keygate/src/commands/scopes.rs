//! Scopes command - prints the scope catalog.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use keygate_oauth::scope;

use super::Context;

/// Arguments for the scopes command.
#[derive(Args, Debug)]
pub struct ScopesArgs {}

/// Run the scopes command. Reads the built-in catalog; no server needed.
pub async fn run(_args: ScopesArgs, ctx: &Context) -> Result<()> {
    let catalog = scope::all();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(catalog)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Scopes").bold());
    println!("{}", dim.apply_to("─".repeat(60)));
    for def in catalog {
        println!(
            "  {:<18} {:<7} {}",
            def.name,
            dim.apply_to(def.category),
            def.description
        );
    }

    Ok(())
}
