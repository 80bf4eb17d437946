use anyhow::Result;
use clap::Subcommand;

use crate::calculators::units::{best_unit, convert, convert_all, format_value, ratio, Category};

#[derive(Debug, Subcommand)]
pub enum UnitsCommand {
    #[command(about = "Convert a value between two units", allow_negative_numbers = true)]
    Convert {
        value: f64,
        from: String,
        to: String,
        #[arg(short, long, help = "Detected from the units when not given")]
        category: Option<Category>,
    },
    #[command(
        about = "Convert a value into several units of its category",
        allow_negative_numbers = true
    )]
    Multiple {
        value: f64,
        from: String,
        category: Category,
        #[arg(long, value_delimiter = ',', help = "Target units, comma separated. All by default")]
        to: Vec<String>,
    },
    #[command(
        about = "Express a value in the most readable unit",
        allow_negative_numbers = true
    )]
    Smart { value: f64, unit: String },
    #[command(about = "List the unit categories")]
    Categories,
    #[command(about = "List the units of a category")]
    List { category: Category },
    #[command(about = "How many times the second quantity fits into the first")]
    Ratio {
        first_value: f64,
        first_unit: String,
        second_value: f64,
        second_unit: String,
        category: Category,
    },
}

pub async fn process_units_command(command: UnitsCommand) -> Result<()> {
    match command {
        UnitsCommand::Convert {
            value,
            from,
            to,
            category,
        } => println!("{}", convert(value, &from, &to, category)?),
        UnitsCommand::Multiple {
            value,
            from,
            category,
            to,
        } => {
            let conversions = convert_all(value, &from, category, &to)?;
            let Some(first) = conversions.first() else {
                println!("Nothing to convert into");
                return Ok(());
            };
            println!(
                "{} {} ({}) in {category}:",
                format_value(value),
                first.from.name,
                first.from.symbol
            );
            for conversion in &conversions {
                println!(
                    "  {:>16} {} ({})",
                    format_value(conversion.result),
                    conversion.to.name,
                    conversion.to.symbol
                );
            }
        }
        UnitsCommand::Smart { value, unit } => println!("{}", best_unit(value, &unit)?),
        UnitsCommand::Categories => {
            for category in Category::ALL {
                println!("{category:<12} {} units", category.units().len());
            }
        }
        UnitsCommand::List { category } => {
            println!("{category}:");
            for unit in category.units() {
                println!("  {:<8} {}", unit.symbol, unit.name);
            }
        }
        UnitsCommand::Ratio {
            first_value,
            first_unit,
            second_value,
            second_unit,
            category,
        } => {
            let result = ratio(
                (first_value, &first_unit),
                (second_value, &second_unit),
                category,
            )?;
            println!(
                "{} {first_unit} is {} times {} {second_unit}",
                format_value(first_value),
                format_value(result),
                format_value(second_value)
            );
        }
    }
    Ok(())
}
