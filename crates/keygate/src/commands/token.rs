//! Token command - introspect or revoke issued tokens.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;

use super::Context;
use super::clients::api_client;

/// Arguments for the token command.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Admin token (or set KEYGATE_ADMIN_TOKEN)
    #[arg(long, global = true, env = "KEYGATE_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Show what an access token grants (admin)
    Inspect {
        /// Access token
        token: String,
    },

    /// Revoke an access or refresh token
    Revoke {
        /// Token to revoke
        token: String,
    },
}

/// Run the token command.
pub async fn run(args: TokenArgs, ctx: &Context) -> Result<()> {
    let client = api_client(ctx, args.admin_token)?;
    let dim = Style::new().dim();

    match args.command {
        TokenCommand::Inspect { token } => {
            let info = client.introspect(&token).await?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else if info["active"].as_bool() != Some(true) {
                println!("{}", Style::new().red().apply_to("● inactive"));
            } else {
                println!("{}", Style::new().green().apply_to("● active"));
                for field in ["sub", "client_id", "scope"] {
                    if let Some(value) = info[field].as_str() {
                        println!("  {:<10} {}", dim.apply_to(field), value);
                    }
                }
                if let Some(exp) = info["exp"]
                    .as_i64()
                    .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                {
                    println!("  {:<10} {}", dim.apply_to("expires"), exp.to_rfc3339());
                }
            }
        }
        TokenCommand::Revoke { token } => {
            client.revoke(&token).await?;
            if ctx.json_output {
                println!("{}", serde_json::json!({ "revoked": true }));
            } else {
                println!("{} Token revoked", Style::new().green().apply_to("✓"));
            }
        }
    }

    Ok(())
}
