use std::process::ExitCode;

use daybook::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

fn main() -> ExitCode {
    let runtime = match single_thread_runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run_cli());
    // Stdin readers may still be parked on the blocking pool.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error running cli {e:?}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
