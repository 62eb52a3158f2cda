//! Configuration system for the Keygate authorization server.
//!
//! Provides TOML-based configuration with:
//! - `[server]`: listener, rate limiting, trusted user header, issuer URL
//! - `[oauth]`: credential lifetimes, refresh rotation, reaper interval
//! - Config file layering (user config dir + project-local overrides)
//!
//! The admin token is deliberately not part of the file format; it comes
//! from the command line or the environment.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_explicit_config, load_config_with_options, log_dir, save_config,
    xdg_config_dir, xdg_config_path, ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;
