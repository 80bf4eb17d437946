use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "daybook-daemon", version, about = "Background reminder and backup runner")]
pub struct DaemonArgs {
    /// Run in the current process instead of detaching.
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tracing::level_filters::LevelFilter;

    use super::DaemonArgs;

    #[test]
    fn parses_forwarded_arguments() {
        let args = DaemonArgs::parse_from([
            "daybook-daemon",
            "--force",
            "--dir",
            "/tmp/daybook",
            "--log-filter",
            "info",
        ]);
        assert!(args.force);
        assert!(!args.log_console);
        assert_eq!(args.dir.as_deref(), Some(std::path::Path::new("/tmp/daybook")));
        assert_eq!(args.log, Some(LevelFilter::INFO));
    }
}
