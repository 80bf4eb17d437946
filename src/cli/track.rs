use std::path::Path;

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;

use crate::{
    productivity::tracker::{CategoryShare, TimeTracker},
    utils::{
        percentage::Percentage,
        time::{format_clock_duration, from_epoch_seconds},
    },
};

#[derive(Debug, Subcommand)]
pub enum TrackCommand {
    #[command(about = "Start an activity, stopping the current one")]
    Start {
        name: String,
        #[arg(short, long, help = "Category of the activity. General by default")]
        category: Option<String>,
    },
    #[command(about = "Stop the current activity")]
    Stop,
    #[command(about = "Show the current activity")]
    Status,
    #[command(about = "Summary of today")]
    Today {
        #[arg(short = 'p', long = "percentage", help = "Hide categories below the share", default_value_t = Percentage::zero())]
        min_percentage: Percentage,
    },
    #[command(about = "Summary of the current week")]
    Week {
        #[arg(short = 'p', long = "percentage", help = "Hide categories below the share", default_value_t = Percentage::zero())]
        min_percentage: Percentage,
    },
    #[command(about = "Hours per category and day over the last days")]
    Report {
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },
    #[command(about = "List known categories")]
    Categories,
}

fn print_categories(categories: &[CategoryShare], min_percentage: Percentage) {
    for share in categories.iter().filter(|v| v.share >= min_percentage) {
        println!(
            "  {:<20} {} ({})",
            share.category,
            format_clock_duration(share.seconds),
            share.share
        );
    }
}

pub async fn process_track_command(command: TrackCommand, dir: &Path) -> Result<()> {
    let mut tracker = TimeTracker::open(dir).await?;
    let now = Local::now();
    let today = now.date_naive();
    match command {
        TrackCommand::Start { name, category } => {
            let activity = tracker.start(name, category, now).await?;
            println!(
                "Started {} [{}] at {}",
                activity.name,
                activity.category,
                now.format("%H:%M:%S")
            );
        }
        TrackCommand::Stop => {
            let name = tracker.current().map(|v| v.name.clone());
            let duration = tracker.stop(now).await?;
            match name {
                Some(name) => println!("Stopped {name} after {}", format_clock_duration(duration)),
                None => println!("No activity is running"),
            }
        }
        TrackCommand::Status => match tracker.current() {
            Some(current) => {
                let started = from_epoch_seconds(current.start_time);
                let elapsed = started
                    .map(|v| (now - v).num_milliseconds() as f64 / 1000.)
                    .unwrap_or_default();
                println!(
                    "{} [{}] running for {}",
                    current.name,
                    current.category,
                    format_clock_duration(elapsed)
                );
            }
            None => println!("No activity is running"),
        },
        TrackCommand::Today { min_percentage } => {
            let summary = tracker.daily_summary(today);
            println!(
                "{}: {} tracked",
                summary.date,
                format_clock_duration(summary.total)
            );
            for activity in &summary.activities {
                println!(
                    "  {} [{}] {}",
                    activity.name,
                    activity.category,
                    format_clock_duration(activity.duration)
                );
            }
            println!("Categories:");
            print_categories(&summary.categories, min_percentage);
        }
        TrackCommand::Week { min_percentage } => {
            let summary = tracker.weekly_summary(today);
            println!(
                "Week of {}: {} tracked",
                summary.week_start,
                format_clock_duration(summary.total)
            );
            for (day, seconds) in &summary.days {
                println!("  {} {}", day.format("%a %Y-%m-%d"), format_clock_duration(*seconds));
            }
            println!("Categories:");
            print_categories(&summary.categories, min_percentage);
        }
        TrackCommand::Report { days } => {
            let report = tracker.report(days, today);
            println!(
                "Report {} to {}: {:.2} hours",
                report.start, report.end, report.total_hours
            );
            println!("By category:");
            for (category, hours) in &report.category_hours {
                println!("  {category:<20} {hours:.2}h");
            }
            println!("By day:");
            for (day, hours) in &report.daily_hours {
                println!("  {day} {hours:.2}h");
            }
        }
        TrackCommand::Categories => {
            for category in tracker.categories() {
                println!("{category}");
            }
        }
    }
    Ok(())
}
