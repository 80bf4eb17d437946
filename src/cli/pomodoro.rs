use std::{io::Write, path::Path};

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    config::Config,
    productivity::pomodoro::{
        PomodoroStats, PomodoroTimer, SessionControl, SessionKind, SessionOutcome,
        POMODORO_STATS_FILE_NAME,
    },
    utils::{clock::DefaultClock, time::format_countdown},
};

#[derive(Debug, Subcommand)]
pub enum PomodoroCommand {
    #[command(about = "Run a work session. Type p and Enter to pause or resume, s to stop")]
    Work,
    #[command(about = "Run a short or long break depending on today's sessions")]
    Break,
    #[command(about = "Sessions completed today")]
    Stats,
    #[command(about = "Forget today's sessions")]
    Reset,
}

/// Reads `p` (pause or resume) and `s` (stop) lines from stdin while a session runs.
async fn listen_for_input(shutdown: CancellationToken, paused: watch::Sender<bool>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            line = lines.next_line() => match line {
                Ok(Some(line)) => match line.trim() {
                    "p" => {
                        paused.send_modify(|v| *v = !*v);
                        println!("{}", if *paused.borrow() { "Paused" } else { "Resumed" });
                    }
                    "s" => {
                        shutdown.cancel();
                        return;
                    }
                    other => debug!("Ignoring input {other:?}"),
                },
                _ => return,
            }
        }
    }
}

async fn run_session(timer: PomodoroTimer, kind: SessionKind, stats: &mut PomodoroStats) -> Result<()> {
    let shutdown = CancellationToken::new();
    let (paused_sender, paused) = watch::channel(false);
    let input = tokio::spawn(listen_for_input(shutdown.clone(), paused_sender));
    let interrupt = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        })
    };

    println!("🍅 {kind} session for {} minutes", timer.minutes(kind));
    let outcome = timer
        .run_session(
            kind,
            &DefaultClock,
            SessionControl {
                shutdown: shutdown.clone(),
                paused,
            },
            |remaining| {
                print!("\r{kind}: {}  ", format_countdown(remaining));
                let _ = std::io::stdout().flush();
            },
        )
        .await;
    shutdown.cancel();
    input.abort();
    interrupt.abort();
    println!();

    match outcome {
        SessionOutcome::Completed => {
            stats.record(kind, timer.minutes(kind), Local::now()).await?;
            // BEL
            println!("✅ {kind} session completed\x07");
        }
        SessionOutcome::Stopped { remaining_secs } => {
            println!(
                "⏹️ {kind} session stopped with {} left",
                format_countdown(remaining_secs)
            );
        }
    }
    Ok(())
}

pub async fn process_pomodoro_command(
    command: PomodoroCommand,
    dir: &Path,
    config: &Config,
) -> Result<()> {
    let timer = PomodoroTimer::from(&config.pomodoro);
    let mut stats = PomodoroStats::open(dir.join(POMODORO_STATS_FILE_NAME)).await?;
    let today = Local::now().date_naive();
    match command {
        PomodoroCommand::Work => run_session(timer, SessionKind::Work, &mut stats).await?,
        PomodoroCommand::Break => {
            let kind = timer.next_break(stats.completed_work(today));
            run_session(timer, kind, &mut stats).await?
        }
        PomodoroCommand::Stats => {
            println!(
                "Today: {} work sessions, {} minutes of focus",
                stats.completed_work(today),
                stats.total_work_minutes(today)
            );
            for session in stats.today(today) {
                println!(
                    "  {} {} ({} min)",
                    session.completed_at.format("%H:%M"),
                    session.kind,
                    session.minutes
                );
            }
        }
        PomodoroCommand::Reset => {
            let removed = stats.reset(today).await?;
            println!("Removed {removed} sessions of today");
        }
    }
    Ok(())
}
