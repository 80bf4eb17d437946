use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::data::convert::{compare, convert, preview, validate};

#[derive(Debug, Subcommand)]
pub enum DataCommand {
    #[command(about = "Convert between CSV, JSON and TXT based on the file extensions")]
    Convert { input: PathBuf, output: PathBuf },
    #[command(about = "Check that a file parses")]
    Validate {
        path: PathBuf,
        #[arg(long, value_delimiter = ',', help = "Columns the file must have, comma separated")]
        columns: Vec<String>,
    },
    #[command(about = "Compare the records of two files")]
    Compare { first: PathBuf, second: PathBuf },
    #[command(about = "Show the first records and a summary of every column")]
    Preview {
        path: PathBuf,
        #[arg(short = 'n', long, default_value_t = 5)]
        rows: usize,
    },
}

pub async fn process_data_command(command: DataCommand) -> Result<()> {
    match command {
        DataCommand::Convert { input, output } => {
            let count = convert(&input, &output).await?;
            println!(
                "Converted {count} records from {} to {}",
                input.display(),
                output.display()
            );
        }
        DataCommand::Validate { path, columns } => {
            let validation = validate(&path, &columns).await?;
            let icon = if validation.valid { "✅" } else { "❌" };
            println!("{icon} {}", validation.message);
        }
        DataCommand::Compare { first, second } => {
            let comparison = compare(&first, &second).await?;
            println!("{}", comparison.reason);
            if let Some((_, a, b)) = comparison.difference {
                println!("  {}: {}", first.display(), serde_json::Value::Object(a));
                println!("  {}: {}", second.display(), serde_json::Value::Object(b));
            }
        }
        DataCommand::Preview { path, rows } => println!("{}", preview(&path, rows).await?),
    }
    Ok(())
}
