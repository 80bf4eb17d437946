use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Subcommand;

use crate::{
    config::Config,
    security::crypt::{
        generate_key, load_key, BatchReport, FileCrypt, FileStatus, KeySource, KEY_FILE_NAME,
    },
};

use super::password::read_secret;

#[derive(Debug, Subcommand)]
pub enum CryptCommand {
    #[command(about = "Create the key file, keeping an existing one")]
    GenerateKey {
        #[arg(long, help = "Key file. key.key in the application directory by default")]
        key: Option<PathBuf>,
    },
    #[command(about = "Encrypt files and directories in place")]
    Encrypt {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        key: KeyArgs,
    },
    #[command(about = "Decrypt files and directories in place")]
    Decrypt {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        key: KeyArgs,
    },
}

#[derive(Debug, clap::Args)]
pub struct KeyArgs {
    #[arg(long, help = "Key file. key.key in the application directory by default")]
    key: Option<PathBuf>,
    #[arg(long, help = "Ask for a password instead of using the key file", conflicts_with = "key")]
    password: bool,
}

async fn key_source(args: KeyArgs, dir: &Path) -> Result<KeySource> {
    if args.password {
        return Ok(KeySource::Password(read_secret("Password: ")?));
    }
    let path = args.key.unwrap_or_else(|| dir.join(KEY_FILE_NAME));
    Ok(KeySource::KeyFile(load_key(&path).await?))
}

fn print_report(report: &BatchReport) {
    for outcome in &report.results {
        let icon = match outcome.status {
            FileStatus::Success => "✅",
            FileStatus::Skipped => "⏭️",
            FileStatus::Error => "❌",
        };
        println!("{icon} {}: {}", outcome.path.display(), outcome.message);
    }
    for path in &report.unsupported {
        println!("⚠️ Unsupported file type: {}", path.display());
    }
    for error in &report.path_errors {
        println!("❌ {error}");
    }
    println!(
        "{} {}: {} successful, {} skipped, {} errors out of {} supported files",
        report.operation,
        report.status,
        report.successful(),
        report.skipped(),
        report.errors(),
        report.supported_count
    );
}

pub async fn process_crypt_command(command: CryptCommand, dir: &Path, config: &Config) -> Result<()> {
    match command {
        CryptCommand::GenerateKey { key } => {
            let path = key.unwrap_or_else(|| dir.join(KEY_FILE_NAME));
            generate_key(&path).await?;
            println!("Key file: {}", path.display());
            println!("Keep it safe, files can't be decrypted without it");
        }
        CryptCommand::Encrypt { paths, key } => {
            let crypt = FileCrypt::new(key_source(key, dir).await?, &config.encryption);
            print_report(&crypt.encrypt_files(&paths).await);
        }
        CryptCommand::Decrypt { paths, key } => {
            let crypt = FileCrypt::new(key_source(key, dir).await?, &config.encryption);
            print_report(&crypt.decrypt_files(&paths).await);
        }
    }
    Ok(())
}
