use anyhow::Result;
use clap::Subcommand;
use config_loader::{ConfigError, ConfigManager};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate a console config file against its schema
    Validate {
        /// Path to config JSON
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub fn run(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Validate { file } => validate(file),
    }
}

fn validate(file: PathBuf) -> Result<()> {
    let manager = ConfigManager::with_path(&file);
    match manager.validate_config_file(&file) {
        Ok(()) => {
            println!("✓ Valid console config: {}", file.display());
            Ok(())
        }
        Err(ConfigError::ValidationFailed { errors }) => {
            eprintln!("✗ Invalid console config '{}':", file.display());
            for error in &errors {
                let pointer = if error.json_pointer.is_empty() {
                    "/"
                } else {
                    error.json_pointer.as_str()
                };
                eprintln!("  {}: {}", pointer, error.message);
            }
            Err(ConfigError::ValidationFailed { errors }.into())
        }
        Err(e) => Err(e.into()),
    }
}
