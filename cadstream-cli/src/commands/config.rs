//! `config get|set|reset|list|path` commands.

use clap::Subcommand;
use cadstream::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one setting
    Get {
        /// Key as section.key (e.g. streaming.detailed_budget)
        key: String,
    },

    /// Change one setting
    Set {
        /// Key as section.key (e.g. decode.workers)
        key: String,

        /// New value
        value: String,
    },

    /// Restore one setting to its default
    Reset {
        /// Key as section.key
        key: String,
    },

    /// Print every setting
    List,

    /// Print the configuration file path
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            let value = key.get(&ConfigFile::load()?);
            println!("{}", if value.is_empty() { "(not set)" } else { &value });
            Ok(())
        }
        ConfigCommands::Set { key, value } => store(parse_key(&key)?, &value),
        ConfigCommands::Reset { key } => {
            let key = parse_key(&key)?;
            store(key, &key.get(&ConfigFile::default()))
        }
        ConfigCommands::List => list(),
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Run 'cadstream config list' for the available keys.",
            key
        ))
    })
}

fn store(key: ConfigKey, value: &str) -> Result<(), CliError> {
    let mut config = ConfigFile::load()?;
    key.set(&mut config, value)?;
    config.save()?;
    println!("{} = {}", key, key.get(&config));
    Ok(())
}

fn list() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    println!("# {}", config_file_path().display());

    let mut section = "";
    for key in ConfigKey::all() {
        if key.section() != section {
            section = key.section();
            println!();
            println!("[{}]", section);
        }
        let value = key.get(&config);
        if value.is_empty() {
            println!("{} = (not set)", key.key_name());
        } else {
            println!("{} = {}", key.key_name(), value);
        }
    }
    Ok(())
}
