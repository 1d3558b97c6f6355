//! Configuration commands.
//!
//! Keys are dot paths into `config.toml`, e.g. `quick_start.rounds`.

use breathwork_core::{Config, ConfigError};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value
    Get {
        /// Dot path (e.g. "notifications.bell", "quick_start.rounds")
        key: String,
    },
    /// Change one value and save
    Set {
        /// Dot path
        key: String,
        /// New value, parsed as the field's current type
        value: String,
    },
    /// Print the whole configuration as TOML
    List,
    /// Overwrite the configuration with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("{key} = {}", config.get(&key).unwrap_or(value));
        }
        ConfigAction::List => {
            print!("{}", toml::to_string_pretty(&Config::load()?)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("Configuration reset to defaults.");
        }
    }
    Ok(())
}
