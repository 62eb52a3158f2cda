//! Start command - launches the Keygate server.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;

use keygate_config::{self, LoadedConfig, OAuthSection};
use keygate_oauth::{AuthorizationService, OAuthConfig};
use keygate_server::{Server, ServerConfig};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Admin token for the admin API and introspection (or set KEYGATE_ADMIN_TOKEN)
    #[arg(long, env = "KEYGATE_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Public issuer URL advertised in discovery (overrides config)
    #[arg(long)]
    pub issuer: Option<String>,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Engine settings from the `[oauth]` section.
fn oauth_config(section: &OAuthSection) -> OAuthConfig {
    OAuthConfig::default()
        .with_code_ttl(section.code_ttl_secs)
        .with_access_token_ttl(section.access_token_ttl_secs)
        .with_refresh_token_ttl(section.refresh_token_ttl_secs)
        .with_rotation(section.rotate_refresh_tokens)
        .with_require_scope(section.require_scope)
}

/// Server settings from the `[server]` section and CLI overrides.
fn server_config(loaded: &LoadedConfig, args: &StartArgs) -> Result<ServerConfig> {
    let file = loaded.config.server();

    let bind = args.bind.as_deref().unwrap_or(&file.bind);
    let ip: IpAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;
    let port = args.port.unwrap_or(file.port);

    let mut config = ServerConfig::new(args.admin_token.clone().filter(|t| !t.is_empty()))
        .with_bind_address(SocketAddr::new(ip, port))
        .with_user_header(file.user_header)
        .with_rate_limiting(file.rate_limiting)
        .with_api_rpm(file.api_rpm)
        .with_request_logging(file.request_logging);

    if let Some(issuer) = args.issuer.clone().or(file.issuer) {
        config = config.with_issuer(issuer);
    }

    Ok(config)
}

/// An explicit `--config` file, or the discovered layers.
fn load(args: &StartArgs) -> Result<LoadedConfig> {
    let loaded = match &args.config {
        Some(path) => keygate_config::load_explicit_config(path)?,
        None => keygate_config::load_config(None)?,
    };
    Ok(loaded)
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    // ── Load configuration ──────────────────────────────────────────────

    let loaded = load(&args)?;

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }
    loaded.config.validate()?;

    if ctx.verbose {
        for path in loaded.loaded_from() {
            tracing::debug!(path = %path.display(), "Loaded config file");
        }
    }

    // ── Build the engine ────────────────────────────────────────────────

    let oauth = loaded.config.oauth();
    let service = AuthorizationService::new(
        oauth_config(&oauth),
        keygate_oauth::Stores::in_memory(),
    )
    .context("Failed to initialize the authorization engine")?;

    let reaper = (oauth.reaper_interval_secs > 0)
        .then(|| service.spawn_reaper(Duration::from_secs(oauth.reaper_interval_secs)));

    // ── Serve ───────────────────────────────────────────────────────────

    let config = server_config(&loaded, &args)?;
    let addr = config.bind_address;
    let admin_enabled = config.admin_token.is_some();
    let issuer = config.issuer();

    if !ctx.json_output {
        let dim = Style::new().dim();
        let yellow = Style::new().yellow();
        println!("Keygate listening on {}", addr);
        println!("  {} {}", dim.apply_to("Issuer:"), issuer);
        if !admin_enabled {
            println!(
                "  {} admin API disabled (no --admin-token / KEYGATE_ADMIN_TOKEN)",
                yellow.apply_to("!")
            );
        }
    }

    let server = Server::new(service, config);
    let result = server
        .run_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await;

    if let Some(handle) = reaper {
        handle.abort();
    }

    result.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_config::KeygateConfig;

    fn args() -> StartArgs {
        StartArgs {
            port: None,
            bind: None,
            admin_token: None,
            issuer: None,
            config: None,
        }
    }

    fn loaded(toml: &str) -> LoadedConfig {
        LoadedConfig {
            config: KeygateConfig::from_toml(toml).unwrap(),
            sources: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_server_config_from_file() {
        let loaded = loaded(
            r#"
[server]
port = 9100
bind = "0.0.0.0"
api_rpm = 30
issuer = "https://auth.example.com"
"#,
        );
        let config = server_config(&loaded, &args()).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:9100".parse::<SocketAddr>().unwrap());
        assert_eq!(config.api_rpm, 30);
        assert_eq!(config.issuer(), "https://auth.example.com");
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_cli_overrides_file() {
        let loaded = loaded("[server]\nport = 9100\n");
        let mut args = args();
        args.port = Some(7000);
        args.bind = Some("127.0.0.1".to_string());
        args.admin_token = Some("s3cret".to_string());

        let config = server_config(&loaded, &args).unwrap();
        assert_eq!(config.bind_address.port(), 7000);
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_empty_admin_token_disables_admin() {
        let mut args = args();
        args.admin_token = Some(String::new());
        let config = server_config(&loaded(""), &args).unwrap();
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_invalid_bind_address() {
        let mut args = args();
        args.bind = Some("not-an-ip".to_string());
        assert!(server_config(&loaded(""), &args).is_err());
    }

    #[test]
    fn test_explicit_config_reports_admin_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keygate.toml");
        std::fs::write(&path, "[server]\nport = 9200\nadmin_token = \"from-file\"\n").unwrap();

        let mut args = args();
        args.config = Some(path);
        let loaded = load(&args).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("KEYGATE_ADMIN_TOKEN"));

        // The file's token never reaches the server.
        let config = server_config(&loaded, &args).unwrap();
        assert_eq!(config.bind_address.port(), 9200);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_oauth_config_from_section() {
        let section = loaded("[oauth]\ncode_ttl_secs = 60\nrotate_refresh_tokens = false\n")
            .config
            .oauth();
        let config = oauth_config(&section);
        assert_eq!(config.code_ttl_secs, 60);
        assert!(!config.rotate_refresh_tokens);
        assert_eq!(config.access_token_ttl_secs, 3600);
    }
}
