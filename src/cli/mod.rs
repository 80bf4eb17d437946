pub mod age;
pub mod config;
pub mod crypt;
pub mod daemon;
pub mod data;
pub mod expense;
pub mod files;
pub mod password;
pub mod pomodoro;
pub mod process;
pub mod remind;
pub mod todo;
pub mod track;
pub mod units;

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{
    config::Config,
    productivity::dashboard::Dashboard,
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "daybook", version, long_about = None)]
#[command(about = "Personal productivity toolkit: todos, reminders, time tracking, pomodoro, files and passwords", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Manage the todo list")]
    Todo {
        #[command(subcommand)]
        command: todo::TodoCommand,
    },
    #[command(about = "Schedule reminders and watch for them")]
    Remind {
        #[command(subcommand)]
        command: remind::RemindCommand,
    },
    #[command(about = "Track time spent on activities")]
    Track {
        #[command(subcommand)]
        command: track::TrackCommand,
    },
    #[command(about = "Run pomodoro sessions")]
    Pomodoro {
        #[command(subcommand)]
        command: pomodoro::PomodoroCommand,
    },
    #[command(about = "Record and summarize expenses")]
    Expense {
        #[command(subcommand)]
        command: expense::ExpenseCommand,
    },
    #[command(about = "Encrypt and decrypt files")]
    Crypt {
        #[command(subcommand)]
        command: crypt::CryptCommand,
    },
    #[command(about = "Check and generate passwords")]
    Password {
        #[command(subcommand)]
        command: password::PasswordCommand,
    },
    #[command(about = "Organize, rename, monitor and back up files")]
    Files {
        #[command(subcommand)]
        command: files::FilesCommand,
    },
    #[command(about = "Convert, validate, compare and preview CSV, JSON and TXT files")]
    Data {
        #[command(subcommand)]
        command: data::DataCommand,
    },
    #[command(about = "Convert between units of length, weight, temperature and more")]
    Units {
        #[command(subcommand)]
        command: units::UnitsCommand,
    },
    #[command(about = "Calculate ages, birthdays, milestones and zodiac signs")]
    Age {
        #[command(subcommand)]
        command: age::AgeCommand,
    },
    #[command(about = "Show an overview of todos, reminders, tracking, pomodoro and expenses")]
    Dashboard {},
    #[command(about = "Create or show the configuration")]
    Config {
        #[command(subcommand)]
        command: config::ConfigCommand,
    },
    #[command(about = "Control the background daemon")]
    Daemon {
        #[command(subcommand)]
        command: daemon::DaemonCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = resolve_application_path(args.dir.as_deref())?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;
    let config = Config::load(&dir).await?;

    match args.commands {
        Commands::Todo { command } => todo::process_todo_command(command, &dir).await,
        Commands::Remind { command } => remind::process_remind_command(command, &dir, &config).await,
        Commands::Track { command } => track::process_track_command(command, &dir).await,
        Commands::Pomodoro { command } => {
            pomodoro::process_pomodoro_command(command, &dir, &config).await
        }
        Commands::Expense { command } => expense::process_expense_command(command, &dir).await,
        Commands::Crypt { command } => crypt::process_crypt_command(command, &dir, &config).await,
        Commands::Password { command } => {
            password::process_password_command(command, &config).await
        }
        Commands::Files { command } => files::process_files_command(command, &config).await,
        Commands::Data { command } => data::process_data_command(command).await,
        Commands::Units { command } => units::process_units_command(command).await,
        Commands::Age { command } => age::process_age_command(command).await,
        Commands::Dashboard {} => {
            println!("{}", Dashboard::collect(&dir, Local::now()).await);
            Ok(())
        }
        Commands::Config { command } => config::process_config_command(command, &dir, &config).await,
        Commands::Daemon { command } => daemon::process_daemon_command(command, &dir, &config).await,
    }
}
