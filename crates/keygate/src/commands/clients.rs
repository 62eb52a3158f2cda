//! Clients command - register and manage third-party applications.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};

use super::Context;
use crate::client::{Client, ClientInfo};

/// Arguments for the clients command.
#[derive(Args, Debug)]
pub struct ClientsArgs {
    /// Admin token (or set KEYGATE_ADMIN_TOKEN)
    #[arg(long, global = true, env = "KEYGATE_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ClientsCommand {
    /// Register a new client and print its secret (shown only once)
    Register {
        /// Display name
        name: String,

        /// Allowed redirect URI (repeatable; matched exactly)
        #[arg(short, long = "redirect-uri", required = true)]
        redirect_uris: Vec<String>,

        /// Allowed scope (repeatable, or space-separated)
        #[arg(short, long = "scope")]
        scopes: Vec<String>,
    },

    /// List registered clients
    List,

    /// Show a client
    Show {
        /// Client ID
        id: String,
    },

    /// Deactivate a client; existing codes and refreshes stop working
    Deactivate {
        /// Client ID
        id: String,
    },
}

/// Build the API client, preferring an explicit token over the environment.
pub(crate) fn api_client(ctx: &Context, admin_token: Option<String>) -> Result<Client> {
    match admin_token {
        Some(token) => Client::with_token(&ctx.server_url, token),
        None => Client::new(&ctx.server_url),
    }
}

/// Run the clients command.
pub async fn run(args: ClientsArgs, ctx: &Context) -> Result<()> {
    let client = api_client(ctx, args.admin_token)?;

    match args.command {
        ClientsCommand::Register {
            name,
            redirect_uris,
            scopes,
        } => {
            let registered = client
                .register_client(&name, &redirect_uris, &scopes)
                .await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&registered)?);
            } else {
                let green = Style::new().green();
                let yellow = Style::new().yellow();
                println!("{} Client registered", green.apply_to("✓"));
                println!();
                print_client(&registered);
                if let Some(secret) = &registered.client_secret {
                    println!();
                    println!("  {:<14} {}", "Client secret:", style(secret).bold());
                    println!(
                        "  {}",
                        yellow.apply_to("Store the secret now; it cannot be shown again.")
                    );
                }
            }
        }
        ClientsCommand::List => {
            let list = client.list_clients().await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                let dim = Style::new().dim();
                println!("{}", style("Clients").bold());
                println!("{}", dim.apply_to("─".repeat(60)));

                if list.clients.is_empty() {
                    println!("{}", dim.apply_to("No clients registered"));
                }
                for c in &list.clients {
                    let status = if c.active {
                        Style::new().green().apply_to("active")
                    } else {
                        Style::new().red().apply_to("inactive")
                    };
                    println!("  {}  {}  {}", dim.apply_to(&c.client_id), c.name, status);
                }
            }
        }
        ClientsCommand::Show { id } => {
            let info = client.get_client(&id).await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_client(&info);
            }
        }
        ClientsCommand::Deactivate { id } => {
            client.deactivate_client(&id).await?;
            if ctx.json_output {
                println!(
                    "{}",
                    serde_json::json!({ "client_id": id, "active": false })
                );
            } else {
                println!("{} Client {} deactivated", Style::new().green().apply_to("✓"), id);
            }
        }
    }

    Ok(())
}

fn print_client(info: &ClientInfo) {
    let dim = Style::new().dim();
    println!("  {:<14} {}", dim.apply_to("Client ID:"), info.client_id);
    println!("  {:<14} {}", dim.apply_to("Name:"), info.name);
    println!("  {:<14} {}", dim.apply_to("Active:"), info.active);
    println!("  {:<14} {}", dim.apply_to("Created:"), info.created_at);
    println!(
        "  {:<14} {}",
        dim.apply_to("Scopes:"),
        if info.allowed_scopes.is_empty() {
            "(none)".to_string()
        } else {
            info.allowed_scopes.join(" ")
        }
    );
    for uri in &info.redirect_uris {
        println!("  {:<14} {}", dim.apply_to("Redirect URI:"), uri);
    }
}
