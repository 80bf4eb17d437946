use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Subcommand;

use crate::productivity::expenses::{ExpenseTracker, Period, EXPENSES_FILE_NAME};

#[derive(Debug, Subcommand)]
pub enum ExpenseCommand {
    #[command(about = "Record an expense")]
    Add {
        category: String,
        amount: f64,
        #[arg(short, long, help = "Date as YYYY-MM-DD. Today by default")]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        note: Option<String>,
    },
    #[command(about = "List expenses, both bounds inclusive")]
    List {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    #[command(about = "Totals per category for a day, week or month")]
    Summary {
        #[arg(value_enum, default_value_t = Period::Month)]
        period: Period,
        #[arg(short, long, help = "Any date inside the period. Today by default")]
        date: Option<NaiveDate>,
    },
}

pub async fn process_expense_command(command: ExpenseCommand, dir: &Path) -> Result<()> {
    let tracker = ExpenseTracker::new(dir.join(EXPENSES_FILE_NAME));
    let today = Local::now().date_naive();
    match command {
        ExpenseCommand::Add {
            category,
            amount,
            date,
            note,
        } => {
            let expense = tracker
                .add(&category, amount, date.unwrap_or(today), note)
                .await?;
            println!(
                "Added {:.2} to {} on {}",
                expense.amount, expense.category, expense.date
            );
        }
        ExpenseCommand::List { from, to } => {
            let expenses = tracker.list(from, to).await?;
            if expenses.is_empty() {
                println!("No expenses");
            }
            for expense in expenses {
                println!(
                    "{} {:<15} {:>10.2} {}",
                    expense.date,
                    expense.category,
                    expense.amount,
                    expense.note.unwrap_or_default()
                );
            }
        }
        ExpenseCommand::Summary { period, date } => {
            let summary = tracker.summarize(period, date.unwrap_or(today)).await?;
            println!(
                "{} to {}: {:.2} in {} expenses",
                summary.start, summary.end, summary.total, summary.count
            );
            for (category, total) in &summary.categories {
                println!("  {category:<15} {total:>10.2}");
            }
        }
    }
    Ok(())
}
