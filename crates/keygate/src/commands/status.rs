//! Status command - shows whether the server is up.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;
use crate::client::Client;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    running: bool,
    version: Option<String>,
    server_url: String,
}

/// Run the status command.
pub async fn run(_args: StatusArgs, ctx: &Context) -> Result<()> {
    let client = Client::new(&ctx.server_url)?;
    let health = client.health().await;

    if ctx.json_output {
        let output = StatusOutput {
            running: health.is_ok(),
            version: health.as_ref().ok().map(|h| h.version.clone()),
            server_url: ctx.server_url.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();

    println!();
    println!("{}", style("Keygate Server Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();

    match health {
        Ok(health) => {
            let green = Style::new().green();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                green.apply_to("● running")
            );
            println!("  {} {}", dim.apply_to("Version:"), health.version);
            println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);
        }
        Err(e) => {
            let red = Style::new().red();
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                red.apply_to("● not running")
            );
            println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);

            if ctx.verbose {
                println!();
                println!("  {} {}", dim.apply_to("Error:"), e);
            }

            println!();
            println!("  {}", dim.apply_to("Start the server with: keygate start"));
        }
    }

    println!();
    Ok(())
}
