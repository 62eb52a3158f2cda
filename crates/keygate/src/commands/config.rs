//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use keygate_config::{self, KeygateConfig, OAuthSection, ServerConfig};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./keygate.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(),
        ConfigCommand::Init { local } => cmd_init(local),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = keygate_config::load_config(None)?;
    let config = &loaded.config;

    if ctx.json_output {
        let resolved = KeygateConfig {
            server: Some(config.server()),
            oauth: Some(config.oauth()),
        };
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    println!("# Keygate Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let server = config.server();
    println!("Server:");
    println!("  bind: {}:{}", server.bind, server.port);
    println!("  user header: {}", server.user_header);
    if let Some(issuer) = &server.issuer {
        println!("  issuer: {}", issuer);
    }
    if server.rate_limiting {
        println!("  rate limit: {} req/min", server.api_rpm);
    } else {
        println!("  rate limit: off");
    }
    println!();

    let oauth = config.oauth();
    println!("OAuth:");
    println!("  code ttl: {}s", oauth.code_ttl_secs);
    println!("  access token ttl: {}s", oauth.access_token_ttl_secs);
    println!("  refresh token ttl: {}s", oauth.refresh_token_ttl_secs);
    println!("  rotate refresh tokens: {}", oauth.rotate_refresh_tokens);
    println!("  require scope: {}", oauth.require_scope);
    println!("  reaper interval: {}s", oauth.reaper_interval_secs);
    println!();

    if let Err(e) = config.validate() {
        println!("Invalid: {}\n", e);
    }

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_which() -> Result<()> {
    let loaded = keygate_config::load_config(None)?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'keygate config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("keygate.toml")
    } else {
        keygate_config::xdg_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let defaults = KeygateConfig {
        server: Some(ServerConfig::default()),
        oauth: Some(OAuthSection::default()),
    };
    keygate_config::save_config(&defaults, &path)?;

    println!("✓ Created {}", path.display());
    println!("  The admin token is never read from this file; set KEYGATE_ADMIN_TOKEN.");
    Ok(())
}

fn cmd_path() -> Result<()> {
    match keygate_config::xdg_config_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("Could not determine config directory"),
    }
    Ok(())
}
