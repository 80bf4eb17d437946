use std::cmp::Ordering;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Subcommand;

use crate::calculators::age::{compare, milestones, parse_date, Age, Zodiac};

#[derive(Debug, Subcommand)]
pub enum AgeCommand {
    #[command(about = "Show an age in every unit and the next birthday")]
    Show {
        #[arg(value_parser = parse_date)]
        birth_date: NaiveDate,
        #[arg(long, value_parser = parse_date, help = "Calculate the age on this date instead of today")]
        on: Option<NaiveDate>,
    },
    #[command(about = "Life milestones, passed and upcoming")]
    Milestones {
        #[arg(value_parser = parse_date)]
        birth_date: NaiveDate,
    },
    #[command(about = "Compare the ages of two people")]
    Compare {
        #[arg(value_parser = parse_date)]
        first: NaiveDate,
        #[arg(value_parser = parse_date)]
        second: NaiveDate,
        #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
        names: Option<Vec<String>>,
    },
    #[command(about = "Western and Chinese zodiac signs")]
    Zodiac {
        #[arg(value_parser = parse_date)]
        birth_date: NaiveDate,
    },
}

pub async fn process_age_command(command: AgeCommand) -> Result<()> {
    let today = Local::now().date_naive();
    match command {
        AgeCommand::Show { birth_date, on } => {
            let age = Age::calculate(birth_date, on.unwrap_or(today))?;
            println!("{age}");
            println!("{}", Zodiac::of(birth_date));
        }
        AgeCommand::Milestones { birth_date } => {
            for milestone in milestones(birth_date, today) {
                let when = if milestone.passed() {
                    format!("{} days ago", -milestone.days_from_today)
                } else {
                    format!("in {} days", milestone.days_from_today)
                };
                let icon = if milestone.passed() { "✅" } else { "⏳" };
                println!(
                    "{icon} {:>3} {:<24} {} ({when})",
                    milestone.age,
                    milestone.description,
                    milestone.date.format("%Y-%m-%d")
                );
            }
        }
        AgeCommand::Compare {
            first,
            second,
            names,
        } => {
            let (first_name, second_name) = match names.as_deref() {
                Some([a, b]) => (a.clone(), b.clone()),
                _ => ("Person 1".to_string(), "Person 2".to_string()),
            };
            let comparison = compare(first, second, today)?;
            println!("{first_name}: {} years", comparison.first.years());
            println!("{second_name}: {} years", comparison.second.years());
            match comparison.order {
                Ordering::Equal => println!("Born on the same day"),
                order => {
                    let older = if order == Ordering::Less {
                        &first_name
                    } else {
                        &second_name
                    };
                    println!(
                        "{older} is older by {} days ({:.1} years)",
                        comparison.difference_days,
                        comparison.difference_years()
                    );
                }
            }
        }
        AgeCommand::Zodiac { birth_date } => println!("{}", Zodiac::of(birth_date)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use clap::Parser;

    use super::AgeCommand;

    #[derive(Parser)]
    struct Wrapper {
        #[command(subcommand)]
        command: AgeCommand,
    }

    #[test]
    fn dates_accept_several_formats() {
        let parsed = Wrapper::parse_from(["age", "show", "March 5, 1990", "--on", "05/03/2020"]);
        let AgeCommand::Show { birth_date, on } = parsed.command else {
            panic!("expected show");
        };
        assert_eq!(birth_date, NaiveDate::from_ymd_opt(1990, 3, 5).unwrap());
        assert_eq!(on, NaiveDate::from_ymd_opt(2020, 3, 5));

        assert!(Wrapper::try_parse_from(["age", "zodiac", "someday"]).is_err());
    }

    #[test]
    fn comparison_takes_two_names() {
        let parsed = Wrapper::parse_from([
            "age", "compare", "1990-01-01", "1991-01-01", "--names", "Ada", "Linus",
        ]);
        let AgeCommand::Compare { names, .. } = parsed.command else {
            panic!("expected compare");
        };
        assert_eq!(names, Some(vec!["Ada".to_string(), "Linus".to_string()]));
    }
}
