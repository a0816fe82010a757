//! Config command — get/set/list persisted settings.

use anyhow::Result;
use clap::Subcommand;

use crate::application::ports::ConfigStore;
use crate::domain::config::{VALID_CONFIG_KEYS, validate_config_key, validate_config_value};
use crate::infra::config::YamlConfigStore;
use crate::output::OutputContext;

/// Subcommands of `atelier config`.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Read one setting.
    Get { key: String },
    /// Write one setting.
    Set { key: String, value: String },
    /// Show all settings.
    List,
}

/// Entry point for `atelier config`.
///
/// # Errors
///
/// Returns an error for unknown keys or invalid values.
pub fn run(ctx: &OutputContext, command: &ConfigCommand) -> Result<()> {
    let store = YamlConfigStore;
    match command {
        ConfigCommand::Get { key } => {
            validate_config_key(key)?;
            let config = store.load()?;
            if let Some(value) = config.get(key) {
                println!("{value}");
            }
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            validate_config_key(key)?;
            validate_config_value(key, value)?;
            let mut config = store.load()?;
            config.set(key, value);
            store.save(&config)?;
            ctx.success(&format!("{key} = {value}"));
            Ok(())
        }
        ConfigCommand::List => {
            let config = store.load()?;
            for key in VALID_CONFIG_KEYS {
                if let Some(value) = config.get(key) {
                    ctx.kv(&format!("{key}:"), &value);
                }
            }
            Ok(())
        }
    }
}
