//! Config command - read and edit `config.ini`.

use clap::Subcommand;
use fixsync::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value
    Get {
        /// Key as section.key (e.g. paths.download_dir)
        key: String,
    },

    /// Change one value; an empty string clears optional settings
    Set {
        /// Key as section.key (e.g. automation.auto_download)
        key: String,

        value: String,
    },

    /// Print every setting
    List,

    /// Print the config file location
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            let value = key.get(&ConfigFile::load()?);
            println!("{}", display_value(&value));
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load()?;
            key.set(&mut config, &value)?;
            config.save()?;
            println!("{} = {}", key.name(), display_value(&key.get(&config)));
        }
        ConfigCommands::List => {
            let config = ConfigFile::load()?;
            let mut section = "";
            for key in ConfigKey::all() {
                if key.section() != section {
                    if !section.is_empty() {
                        println!();
                    }
                    section = key.section();
                    println!("[{}]", section);
                }
                println!("{} = {}", key.key_name(), display_value(&key.get(&config)));
            }
        }
        ConfigCommands::Path => println!("{}", config_file_path().display()),
    }
    Ok(())
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown key '{}'. Run 'fixsync config list' for the available keys.",
            key
        ))
    })
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_rejects_unknown() {
        assert!(parse_key("paths.download_dir").is_ok());
        let err = parse_key("paths.nowhere").unwrap_err();
        assert!(err.to_string().contains("paths.nowhere"));
    }

    #[test]
    fn test_display_value_marks_empty() {
        assert_eq!(display_value(""), "(not set)");
        assert_eq!(display_value("fns"), "fns");
    }
}
