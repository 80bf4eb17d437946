use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use crate::config::{Config, CONFIG_FILE_NAME};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write the default configuration")]
    Init {
        #[arg(long, help = "Overwrite an existing configuration")]
        force: bool,
    },
    #[command(about = "Print the effective configuration")]
    Show,
}

pub async fn process_config_command(
    command: ConfigCommand,
    dir: &Path,
    config: &Config,
) -> Result<()> {
    match command {
        ConfigCommand::Init { force } => {
            let existing = dir.join(CONFIG_FILE_NAME);
            if !force && tokio::fs::try_exists(&existing).await? {
                println!(
                    "Configuration already exists at {}. Use --force to overwrite",
                    existing.display()
                );
                return Ok(());
            }
            let path = Config::default().save(dir).await?;
            println!("Configuration written to {}", path.display());
        }
        ConfigCommand::Show => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
