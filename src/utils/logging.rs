use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";
pub const DAEMON_PREFIX: &str = "daemon";

const LOGS_DIR_NAME: &str = "logs";
const KEPT_LOG_FILES: usize = 5;
const DEFAULT_LEVEL: &str = "debug";

pub fn logs_dir(application_dir: &Path) -> PathBuf {
    application_dir.join(LOGS_DIR_NAME)
}

/// Builds the filter directive for this crate. A `RUST_LOG` holding full directives
/// (`daybook=info,tokio=warn`) is used as is, a bare level applies to daybook only.
fn filter_directive(log_level: Option<LevelFilter>, rust_log: Option<String>) -> String {
    let crate_name = env!("CARGO_PKG_NAME").replace('-', "_");
    match (log_level, rust_log) {
        (Some(level), _) => format!("{crate_name}={level}"),
        (None, Some(directives)) if directives.contains('=') => directives,
        (None, Some(level)) => format!("{crate_name}={level}"),
        (None, None) => format!("{crate_name}={DEFAULT_LEVEL}"),
    }
}

/// Installs the global subscriber. Logs always go into `<application dir>/logs` with daily
/// rotation; stdout gets a copy only when `show_std` is set, so regular command output stays
/// clean.
pub fn enable_logging(
    prefix: &str,
    application_dir: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let directory = logs_dir(application_dir);
    let appender = Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(prefix)
        .build(&directory)
        .with_context(|| format!("Failed to open log directory {directory:?}"))?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);
    let directive = filter_directive(log_level, std::env::var("RUST_LOG").ok());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .pretty()
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    // Other test binaries in the same process may have installed one already.
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});
